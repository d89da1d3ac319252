//! # petpal-runtime — Host Runtime for PetPal
//!
//! `petpal-core` is synchronous and performs no I/O of its own. This crate
//! supplies the parts a long-running host needs around it:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │             petpal (binary)              │
//! │  ┌────────────────────────────────────┐  │
//! │  │          PetpalRuntime             │  │
//! │  │  ┌───────────┐  ┌───────────────┐  │  │
//! │  │  │  logging  │  │  decay_task   │  │  │
//! │  │  └───────────┘  └───────┬───────┘  │  │
//! │  │                         ▼          │  │
//! │  │  ┌──────────────────────────────┐  │  │
//! │  │  │ petpal-core: PetService,     │  │  │
//! │  │  │ DecayScheduler, RecordStore  │  │  │
//! │  │  └──────────────────────────────┘  │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `logging` — `tracing-subscriber` setup from `[general]` config
//! - `clock` — a [`Clock`](petpal_core::clock::Clock) that follows tokio time
//! - `decay_task` — tokio interval that polls the decay scheduler
//! - `runtime` — [`PetpalRuntime`], wiring config → store → service → task

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod decay_task;
pub mod logging;
pub mod runtime;

pub use decay_task::DecayTaskHandle;
pub use runtime::PetpalRuntime;
