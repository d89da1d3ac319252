//! Progression — XP thresholds, level-ups and evolution.
//!
//! The threshold to leave level `L` is `100 + 50·L`. Evolution is a step
//! function of level:
//!
//! | Level    | Stage |
//! |----------|-------|
//! | 1–4      | 0     |
//! | 5–9      | 1     |
//! | 10+      | 2     |

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PetpalError, Result};
use crate::types::PetRecord;

/// Upper bound on level-ups resolved by a single [`apply_xp`] call.
///
/// Per-action gains are single digits, so hitting this means the record was
/// corrupt or the caller passed an absurd gain.
pub const MAX_LEVEL_STEPS: u32 = 10_000;

/// Level at which a pet reaches stage 1.
pub const STAGE_1_LEVEL: u32 = 5;

/// Level at which a pet reaches stage 2.
pub const STAGE_2_LEVEL: u32 = 10;

/// XP required to advance from `level` to `level + 1`.
#[must_use]
pub fn xp_needed(level: u32) -> u64 {
    100 + u64::from(level) * 50
}

/// Evolution stage implied by `level`.
#[must_use]
pub fn evolution_stage(level: u32) -> u8 {
    if level < STAGE_1_LEVEL {
        0
    } else if level < STAGE_2_LEVEL {
        1
    } else {
        2
    }
}

/// Evolution reached during an [`apply_xp`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolution {
    /// Stage the pet moved to.
    pub stage: u8,
    /// Form name before evolving.
    pub from_form: String,
    /// Form name after evolving.
    pub to_form: String,
}

/// What an [`apply_xp`] call did to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// XP added.
    pub xp_gained: u64,
    /// Number of levels crossed (0 if none).
    pub levels_gained: u32,
    /// Level after the call.
    pub level: u32,
    /// Set when the stage increased. Multi-stage jumps report the final stage.
    pub evolution: Option<Evolution>,
}

impl Progress {
    /// Whether at least one level was gained.
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }

    /// Whether the pet evolved.
    #[must_use]
    pub fn evolved(&self) -> bool {
        self.evolution.is_some()
    }
}

/// Add `gained` XP to `record`, resolving every level-up it triggers.
///
/// Afterwards `record.xp < xp_needed(record.level)` and the evolution stage
/// is at least the stage implied by the new level. The stage never goes down.
///
/// # Errors
///
/// Returns [`PetpalError::Internal`] if more than [`MAX_LEVEL_STEPS`]
/// level-ups would be needed. The record is left unchanged in that case.
pub fn apply_xp(record: &mut PetRecord, gained: u64) -> Result<Progress> {
    let mut xp = record.xp.checked_add(gained).ok_or_else(|| {
        PetpalError::Internal(format!("xp overflow: {} + {gained}", record.xp))
    })?;
    let mut level = record.level.max(1);
    let mut steps = 0_u32;

    // xp only shrinks inside the loop while the threshold grows with level.
    while xp >= xp_needed(level) {
        if steps == MAX_LEVEL_STEPS {
            return Err(PetpalError::Internal(format!(
                "level resolution exceeded {MAX_LEVEL_STEPS} steps (level {level}, xp {xp})"
            )));
        }
        xp -= xp_needed(level);
        level = level
            .checked_add(1)
            .ok_or_else(|| PetpalError::Internal(format!("level overflow at {level}")))?;
        steps += 1;
    }

    let from_form = record.current_form.clone();
    let from_stage = record.evolution_stage;
    let levels_gained = level - record.level.max(1);
    record.xp = xp;
    record.level = level;

    let stage = evolution_stage(level);
    let evolution = if stage > from_stage {
        record.evolution_stage = stage;
        record.current_form = record.species.form(stage).to_string();
        info!(
            from = %from_form,
            to = %record.current_form,
            level,
            "Pet evolved"
        );
        Some(Evolution {
            stage,
            from_form,
            to_form: record.current_form.clone(),
        })
    } else {
        None
    };

    Ok(Progress {
        xp_gained: gained,
        levels_gained,
        level,
        evolution,
    })
}
