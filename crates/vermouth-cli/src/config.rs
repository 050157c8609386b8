//! Run configuration for the `map` command.
//!
//! Values are layered from lowest to highest precedence: built-in defaults,
//! the optional TOML file, `-S key=value` overrides and finally the dedicated
//! command-line flags.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

pub use builder::build_config;
pub use models::{AppConfig, SecondaryStructureSource};
