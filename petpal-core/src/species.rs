//! Static species data: evolution chains and form emoji.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Emoji shown for a form that has no entry in the table.
pub const FALLBACK_EMOJI: &str = "🐾";

/// A species family, fixed at adoption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    /// car → big car → tiger
    Car,
    /// dawg → big dawg → wolf
    Dawg,
    /// baby dragon → dragon → elder dragon
    Dragon,
    /// hampter → guinea pig → capybara
    Hampter,
    /// chick → parrot → phoenix
    Bird,
}

impl Species {
    /// Every species, in adoption-table order.
    pub const ALL: [Self; 5] = [Self::Car, Self::Dawg, Self::Dragon, Self::Hampter, Self::Bird];

    /// Lowercase identifier, as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Dawg => "dawg",
            Self::Dragon => "dragon",
            Self::Hampter => "hampter",
            Self::Bird => "bird",
        }
    }

    /// The three form names of this species, indexed by evolution stage.
    #[must_use]
    pub fn forms(self) -> [&'static str; 3] {
        match self {
            Self::Car => ["car", "big car", "tiger"],
            Self::Dawg => ["dawg", "big dawg", "wolf"],
            Self::Dragon => ["baby dragon", "dragon", "elder dragon"],
            Self::Hampter => ["hampter", "guinea pig", "capybara"],
            Self::Bird => ["chick", "parrot", "phoenix"],
        }
    }

    /// Form name at `stage`. Stages above 2 resolve to the final form.
    #[must_use]
    pub fn form(self, stage: u8) -> &'static str {
        let forms = self.forms();
        forms[usize::from(stage).min(forms.len() - 1)]
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|species| species.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown species: {s}"))
    }
}

/// Display emoji for a form name.
#[must_use]
pub fn form_emoji(form: &str) -> &'static str {
    match form {
        "car" => "😺",
        "big car" => "🐈‍⬛",
        "tiger" => "🐯",
        "dawg" => "🐶",
        "big dawg" => "🐕",
        "wolf" => "🐺",
        "baby dragon" => "🦎",
        "dragon" => "🐉",
        "elder dragon" => "🐲",
        "hampter" | "guinea pig" => "🐹",
        "capybara" => "🦫",
        "chick" => "🐤",
        "parrot" => "🦜",
        "phoenix" => "🔥",
        _ => FALLBACK_EMOJI,
    }
}
