//! `brain-core` — shared types, error classification, and config loading for
//! the Brain Runtime Core crates.
//!
//! # Overview
//!
//! Every other `brain-*` crate depends on this one for its domain vocabulary
//! (`Message`, `Memory`, `Task`, `BrainSession`, ...) and its error
//! classification (`ErrorKind`). Nothing here talks to a provider, a device,
//! or a database directly.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{BrainError, ErrorKind, Result};
