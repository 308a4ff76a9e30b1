//! Environment helpers shared by the configuration types.

pub mod env;

pub use env::{get_env_parsed, get_env_with_prefix};
