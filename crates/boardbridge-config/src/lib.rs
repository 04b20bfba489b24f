//! Configuration system for boardbridge.
//!
//! Settings are resolved in layers, highest priority first:
//!
//! 1. Environment variables (`MIRO_*`, `BOARDBRIDGE_*`)
//! 2. Optional TOML file at `<data_dir>/config.toml`
//! 3. Built-in defaults
//!
//! The data directory (`~/.boardbridge`, or `BOARDBRIDGE_HOME`) also holds the
//! two persisted documents: the OAuth token set and the rate-limit state.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{data_dir, load_file_config, CONFIG_FILE, DATA_DIR_ENV, RATE_LIMIT_FILE, TOKEN_FILE};
pub use error::{ConfigError, Result};
pub use types::*;
