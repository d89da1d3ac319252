//! Action Processor — feed, play and sleep.
//!
//! | Action | Requires      | Effect                                      | XP  |
//! |--------|---------------|---------------------------------------------|-----|
//! | feed   | hunger > 10   | hunger −30, happiness +10                   | +5  |
//! | play   | energy ≥ 20   | energy −20, happiness +20, coins +1..=5     | +10 |
//! | sleep  | energy < 90   | energy +40, hunger +10                      | +3  |
//!
//! A failed requirement is a [`Rejection`], not an error, and leaves the
//! record untouched.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PetpalError, Result};
use crate::progression::{self, Progress};
use crate::types::{lower, raise, PetRecord, StatDelta};

/// Things a pet can do while playing. Cosmetic only.
pub const PLAY_ACTIVITIES: [&str; 4] = ["fetch", "tug-of-war", "hide and seek", "catch the toy"];

/// A user-triggered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Lower hunger.
    Feed,
    /// Spend energy for happiness and coins.
    Play,
    /// Restore energy.
    Sleep,
}

impl Action {
    /// Every action.
    pub const ALL: [Self; 3] = [Self::Feed, Self::Play, Self::Sleep];

    /// Lowercase command name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Play => "play",
            Self::Sleep => "sleep",
        }
    }

    /// XP awarded on success.
    #[must_use]
    pub fn xp_reward(self) -> u64 {
        match self {
            Self::Feed => 5,
            Self::Play => 10,
            Self::Sleep => 3,
        }
    }

    /// Check the gameplay requirement against `record`.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] describing the unmet requirement.
    pub fn check(self, record: &PetRecord) -> std::result::Result<(), Rejection> {
        match self {
            Self::Feed if record.hunger <= 10 => Err(Rejection::NotHungry),
            Self::Play if record.energy < 20 => Err(Rejection::TooTired),
            Self::Sleep if record.energy >= 90 => Err(Rejection::TooEnergetic),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = PetpalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PetpalError::UnknownAction(s.to_string()))
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rejection {
    /// Feed while hunger ≤ 10.
    NotHungry,
    /// Play while energy < 20.
    TooTired,
    /// Sleep while energy ≥ 90.
    TooEnergetic,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotHungry => "pet is already full",
            Self::TooTired => "pet is too tired to play",
            Self::TooEnergetic => "pet is too full of energy to sleep",
        };
        f.write_str(reason)
    }
}

/// Summary of a successful action, for the caller to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// Which action ran.
    pub action: Action,
    /// Applied stat changes, after clamping.
    pub delta: StatDelta,
    /// Coins earned (play only).
    pub coins_earned: u64,
    /// Level/evolution changes.
    pub progress: Progress,
    /// Play activity flavor text (play only).
    pub activity: Option<&'static str>,
    /// The record after the action.
    pub record: PetRecord,
}

/// Result of running an action against a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    /// The action ran.
    Applied(Box<ActionOutcome>),
    /// The requirement was not met; the record is unchanged.
    Rejected(Rejection),
}

/// Apply `action` to `record`.
///
/// # Errors
///
/// Only fails if XP resolution hits its internal step cap, in which case the
/// record is restored to its prior state.
pub fn apply(record: &mut PetRecord, action: Action, rng: &mut dyn RngCore) -> Result<ActionResult> {
    if let Err(rejection) = action.check(record) {
        debug!(%action, ?rejection, "Action rejected");
        return Ok(ActionResult::Rejected(rejection));
    }

    let snapshot = record.clone();
    let before = record.stats();
    let mut coins_earned = 0;
    let mut activity = None;

    match action {
        Action::Feed => {
            record.hunger = lower(record.hunger, 30);
            record.happiness = raise(record.happiness, 10);
        }
        Action::Play => {
            record.energy = lower(record.energy, 20);
            record.happiness = raise(record.happiness, 20);
            coins_earned = rng.gen_range(1..=5);
            record.coins = record.coins.saturating_add(coins_earned);
            activity = PLAY_ACTIVITIES.choose(rng).copied();
        }
        Action::Sleep => {
            record.energy = raise(record.energy, 40);
            record.hunger = raise(record.hunger, 10);
        }
    }

    let progress = match progression::apply_xp(record, action.xp_reward()) {
        Ok(progress) => progress,
        Err(err) => {
            *record = snapshot;
            return Err(err);
        }
    };

    let delta = StatDelta::between(before, record.stats());
    debug!(
        %action,
        ?delta,
        coins_earned,
        level = record.level,
        xp = record.xp,
        "Action applied"
    );

    Ok(ActionResult::Applied(Box::new(ActionOutcome {
        action,
        delta,
        coins_earned,
        progress,
        activity,
        record: record.clone(),
    })))
}
