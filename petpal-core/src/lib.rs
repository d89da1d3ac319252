//! # PetPal Core Library
//!
//! Platform-agnostic core for a chat-bot virtual pet. Each chat user (an
//! *owner*) can hold one [`PetRecord`] and raise it by feeding, playing and
//! letting it sleep. Pets level up, evolve through three forms, and slowly
//! get hungry and grumpy on a timer.
//!
//! ## Layers
//!
//! - [`progression`] — XP thresholds, level-ups, evolution stages
//! - [`actions`] — feed / play / sleep rules
//! - [`decay`] — passive hourly stat decay
//! - [`leaderboard`] — `(level, xp)` ranking
//! - [`store`] — the [`RecordStore`](store::RecordStore) seam plus memory, JSON and SQLite backends
//! - [`service`] — [`PetService`], the locked load/modify/save facade the chat layer calls
//! - [`scheduler`] — [`DecayScheduler`], deciding when a decay tick runs
//!
//! The core performs no I/O of its own: storage, time and randomness are
//! injected, so everything can be driven deterministically in tests.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod card;
pub mod clock;
pub mod config;
pub mod decay;
pub mod error;
pub mod leaderboard;
pub mod progression;
pub mod scheduler;
pub mod service;
pub mod species;
pub mod store;
pub mod types;

pub use actions::{Action, ActionOutcome, Rejection};
pub use config::PetpalConfig;
pub use error::{PetpalError, StoreError};
pub use scheduler::{DecayScheduler, TickOutcome};
pub use service::PetService;
pub use species::Species;
pub use types::*;
