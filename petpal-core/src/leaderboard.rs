//! Leaderboard: ranks pets by `(level, xp)`, highest first.
//!
//! Read-only; ties beyond the `(level, xp)` key come out in unspecified order.

use std::cmp::Reverse;

use crate::types::{OwnerId, PetRecord};

/// Default number of entries shown.
pub const DEFAULT_LIMIT: usize = 10;

fn rank_key(record: &PetRecord) -> Reverse<(u32, u64)> {
    Reverse((record.level, record.xp))
}

/// The `limit` best pets among `records`.
#[must_use]
pub fn top(mut records: Vec<(OwnerId, PetRecord)>, limit: usize) -> Vec<(OwnerId, PetRecord)> {
    records.sort_unstable_by_key(|(_, record)| rank_key(record));
    records.truncate(limit);
    records
}

/// 1-based position of `owner` in the full ranking, if they have a pet.
///
/// Pets tied with `owner` on `(level, xp)` share their best position.
#[must_use]
pub fn rank_of(records: &[(OwnerId, PetRecord)], owner: &OwnerId) -> Option<usize> {
    let (_, mine) = records.iter().find(|(id, _)| id == owner)?;
    let key = (mine.level, mine.xp);
    let ahead = records
        .iter()
        .filter(|(_, other)| (other.level, other.xp) > key)
        .count();
    Some(ahead + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use chrono::Utc;

    fn entry(id: &str, level: u32, xp: u64) -> (OwnerId, PetRecord) {
        let mut pet = PetRecord::new(Species::Hampter, Utc::now());
        pet.level = level;
        pet.xp = xp;
        (OwnerId::from(id), pet)
    }

    #[test]
    fn xp_breaks_level_ties() {
        let ranked = top(vec![entry("low", 3, 10), entry("high", 3, 50)], DEFAULT_LIMIT);
        assert_eq!(ranked[0].0, OwnerId::from("high"));
        assert_eq!(ranked[1].0, OwnerId::from("low"));
    }

    #[test]
    fn level_dominates_xp() {
        let ranked = top(vec![entry("a", 2, 190), entry("b", 3, 0)], DEFAULT_LIMIT);
        assert_eq!(ranked[0].0, OwnerId::from("b"));
    }

    #[test]
    fn limit_truncates() {
        let records = (0..25).map(|i| entry(&i.to_string(), i, 0)).collect();
        let ranked = top(records, DEFAULT_LIMIT);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].1.level, 24);
        assert_eq!(ranked[9].1.level, 15);
    }

    #[test]
    fn empty_board() {
        assert!(top(Vec::new(), DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn rank_of_owner() {
        let records = vec![entry("a", 1, 0), entry("b", 5, 0), entry("c", 3, 0)];
        assert_eq!(rank_of(&records, &OwnerId::from("b")), Some(1));
        assert_eq!(rank_of(&records, &OwnerId::from("a")), Some(3));
        assert_eq!(rank_of(&records, &OwnerId::from("zed")), None);
    }
}
