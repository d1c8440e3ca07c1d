//! Agent configuration builder.
//!
//! Merges configuration fragments from defaults, files, directories, literal
//! overrides and command line flags into one validated runtime configuration.

pub mod cli;
pub mod config;
pub mod error;

pub use config::{LoadOpts, LoadResult, RuntimeConfig, load};
pub use error::{ConfigError, Result};
