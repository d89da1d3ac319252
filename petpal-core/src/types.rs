//! Core type definitions for PetPal.
//!
//! All types are serializable; a [`PetRecord`] is the flat per-owner value
//! that store backends persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::species::{self, Species};

/// Upper bound for hunger, happiness and energy.
pub const MAX_STAT: u8 = 100;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identity of the chat user who owns a pet.
///
/// Opaque to the core; chat platforms typically use a numeric snowflake.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    /// Create an owner ID from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for OwnerId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Raise a bounded stat, capping at [`MAX_STAT`].
#[must_use]
pub fn raise(value: u8, by: u8) -> u8 {
    value.saturating_add(by).min(MAX_STAT)
}

/// Lower a bounded stat, flooring at zero.
#[must_use]
pub fn lower(value: u8, by: u8) -> u8 {
    value.saturating_sub(by).min(MAX_STAT)
}

/// Snapshot of the three bounded stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// 0 = full, 100 = starving.
    pub hunger: u8,
    /// 0 = miserable, 100 = ecstatic.
    pub happiness: u8,
    /// 0 = exhausted, 100 = fully rested.
    pub energy: u8,
}

/// Signed change of each bounded stat between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    /// Change in hunger.
    pub hunger: i16,
    /// Change in happiness.
    pub happiness: i16,
    /// Change in energy.
    pub energy: i16,
}

impl StatDelta {
    /// Difference `after - before`, reflecting clamping.
    #[must_use]
    pub fn between(before: Stats, after: Stats) -> Self {
        Self {
            hunger: i16::from(after.hunger) - i16::from(before.hunger),
            happiness: i16::from(after.happiness) - i16::from(before.happiness),
            energy: i16::from(after.energy) - i16::from(before.energy),
        }
    }
}

// ---------------------------------------------------------------------------
// PetRecord
// ---------------------------------------------------------------------------

/// One owner's pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetRecord {
    /// Display name, at most 20 characters by default.
    pub name: String,
    /// Species family, fixed at adoption.
    pub species: Species,
    /// Name of the current evolution form.
    pub current_form: String,
    /// Level, starting at 1.
    pub level: u32,
    /// Progress towards the next level.
    pub xp: u64,
    /// Hunger in `[0, 100]`.
    pub hunger: u8,
    /// Happiness in `[0, 100]`.
    pub happiness: u8,
    /// Energy in `[0, 100]`.
    pub energy: u8,
    /// Evolution stage, one of 0, 1, 2.
    pub evolution_stage: u8,
    /// Coins earned from play.
    pub coins: u64,
    /// Last time decay was applied (adoption time for a fresh pet).
    pub last_update: DateTime<Utc>,
}

impl PetRecord {
    /// A freshly adopted pet of `species`.
    #[must_use]
    pub fn new(species: Species, now: DateTime<Utc>) -> Self {
        let form = species.form(0);
        Self {
            name: form.to_string(),
            species,
            current_form: form.to_string(),
            level: 1,
            xp: 0,
            hunger: 50,
            happiness: 80,
            energy: 100,
            evolution_stage: 0,
            coins: 0,
            last_update: now,
        }
    }

    /// Current bounded stats.
    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats {
            hunger: self.hunger,
            happiness: self.happiness,
            energy: self.energy,
        }
    }

    /// Emoji for the current form.
    #[must_use]
    pub fn emoji(&self) -> &'static str {
        species::form_emoji(&self.current_form)
    }
}
