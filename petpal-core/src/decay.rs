//! Passive stat decay, applied once per tick to every pet.
//!
//! Per tick:
//!   hunger    += 5                    (cap 100)
//!   happiness -= 10 if neglected,     (floor 0)
//!   happiness -= 2  otherwise
//!
//! A pet is *neglected* when, after the hunger increase, hunger > 80 or
//! energy < 20. Decay never touches XP, level or coins.

use chrono::{DateTime, Utc};

use crate::types::{lower, raise, OwnerId, PetRecord};

/// Hunger added per tick.
pub const HUNGER_PER_TICK: u8 = 5;

/// Happiness lost per tick by a neglected pet.
pub const NEGLECTED_HAPPINESS_LOSS: u8 = 10;

/// Happiness lost per tick otherwise.
pub const BASE_HAPPINESS_LOSS: u8 = 2;

/// Hunger above which a pet counts as neglected.
pub const STARVING_HUNGER: u8 = 80;

/// Energy below which a pet counts as neglected.
pub const EXHAUSTED_ENERGY: u8 = 20;

/// Whether a pet's current state counts as neglect.
#[must_use]
pub fn is_neglected(record: &PetRecord) -> bool {
    record.hunger > STARVING_HUNGER || record.energy < EXHAUSTED_ENERGY
}

/// Apply one tick of decay to a single record.
pub fn decay_record(record: &mut PetRecord, now: DateTime<Utc>) {
    record.hunger = raise(record.hunger, HUNGER_PER_TICK);

    let loss = if is_neglected(record) {
        NEGLECTED_HAPPINESS_LOSS
    } else {
        BASE_HAPPINESS_LOSS
    };
    record.happiness = lower(record.happiness, loss);
    record.last_update = now;
}

/// Apply one tick of decay to every record. Returns how many were updated.
pub fn decay_all(records: &mut [(OwnerId, PetRecord)], now: DateTime<Utc>) -> usize {
    for (_, record) in records.iter_mut() {
        decay_record(record, now);
    }
    records.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use chrono::Duration;

    fn pet(hunger: u8, happiness: u8, energy: u8) -> PetRecord {
        let mut pet = PetRecord::new(Species::Car, Utc::now());
        pet.hunger = hunger;
        pet.happiness = happiness;
        pet.energy = energy;
        pet
    }

    #[test]
    fn starving_and_tired_pet_loses_ten() {
        let mut pet = pet(85, 50, 10);
        decay_record(&mut pet, Utc::now());
        assert_eq!(pet.hunger, 90);
        assert_eq!(pet.happiness, 40);
    }

    #[test]
    fn healthy_pet_loses_two() {
        let mut pet = pet(50, 80, 100);
        decay_record(&mut pet, Utc::now());
        assert_eq!(pet.hunger, 55);
        assert_eq!(pet.happiness, 78);
    }

    #[test]
    fn neglect_uses_hunger_after_increase() {
        // 78 + 5 = 83 > 80
        let mut pet = pet(78, 50, 100);
        decay_record(&mut pet, Utc::now());
        assert_eq!(pet.happiness, 40);
    }

    #[test]
    fn low_energy_alone_is_neglect() {
        let mut pet = pet(0, 50, 19);
        decay_record(&mut pet, Utc::now());
        assert_eq!(pet.hunger, 5);
        assert_eq!(pet.happiness, 40);
    }

    #[test]
    fn stats_stay_bounded_over_many_ticks() {
        let mut pet = pet(99, 3, 0);
        for _ in 0..50 {
            decay_record(&mut pet, Utc::now());
        }
        assert_eq!(pet.hunger, 100);
        assert_eq!(pet.happiness, 0);
    }

    #[test]
    fn decay_leaves_progression_alone() {
        let mut pet = pet(50, 50, 50);
        pet.level = 7;
        pet.xp = 42;
        pet.coins = 9;
        decay_record(&mut pet, Utc::now());
        assert_eq!((pet.level, pet.xp, pet.coins), (7, 42, 9));
    }

    #[test]
    fn decay_all_stamps_every_record() {
        let tick = Utc::now() + Duration::hours(1);
        let mut records = vec![
            (OwnerId::from("a"), pet(10, 10, 10)),
            (OwnerId::from("b"), pet(90, 90, 90)),
        ];
        assert_eq!(decay_all(&mut records, tick), 2);
        assert!(records.iter().all(|(_, r)| r.last_update == tick));
    }
}
