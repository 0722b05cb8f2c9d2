// src/config/mod.rs

//! Executor configuration.
//!
//! - [`model`] holds the runtime types (`ExecConfig`, `Timeout`,
//!   `SuccessCodes`) and the raw TOML shape.
//! - [`duration`] parses human duration strings (`"3s"`, `"infinite"`).
//! - [`loader`] reads a TOML file from disk.
//! - [`validate`] turns the raw file into a checked `ExecConfig`.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::{parse_duration, parse_timeout};
pub use loader::{load_and_validate, load_from_path};
pub use model::{ExecConfig, RawConfigFile, RawExecSection, SuccessCodes, Timeout};
