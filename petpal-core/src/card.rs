//! Pet card data: everything a renderer needs to draw a stats card.
//!
//! Only the numbers; drawing is up to the chat layer.

use serde::Serialize;

use crate::progression::xp_needed;
use crate::types::{PetRecord, Stats};

/// Flattened, display-ready view of a pet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PetCard {
    /// Emoji for the current form.
    pub emoji: &'static str,
    /// Pet name.
    pub name: String,
    /// Current form name.
    pub form: String,
    /// Level.
    pub level: u32,
    /// XP into the current level.
    pub xp: u64,
    /// XP needed to leave the current level.
    pub xp_needed: u64,
    /// `xp / xp_needed`, in `[0, 1)`.
    pub xp_fraction: f64,
    /// Bounded stats.
    pub stats: Stats,
    /// Coins earned.
    pub coins: u64,
}

impl From<&PetRecord> for PetCard {
    #[allow(clippy::cast_precision_loss)]
    fn from(record: &PetRecord) -> Self {
        let needed = xp_needed(record.level);
        Self {
            emoji: record.emoji(),
            name: record.name.clone(),
            form: record.current_form.clone(),
            level: record.level,
            xp: record.xp,
            xp_needed: needed,
            xp_fraction: (record.xp as f64 / needed as f64).clamp(0.0, 1.0),
            stats: record.stats(),
            coins: record.coins,
        }
    }
}
