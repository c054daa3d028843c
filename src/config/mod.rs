// src/config/mod.rs

//! Command descriptor configuration (TOML).
//!
//! - [`model`] — serde structs mirroring the config file.
//! - [`loader`] — file loading and deserialization.
//! - [`validate`] — semantic validation (command shape, URL syntax).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{CommandConfig, ConfigFile, DefaultSection};
