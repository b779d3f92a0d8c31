//! Storage infrastructure: configuration and identity persistence.
//!
//! - **`config`** reads the TOML configuration file from the
//!   platform-appropriate directory and provides defaults on first run.
//! - **`identity`** writes the confirmed touchscreen identity back into
//!   that file without disturbing the other sections.

pub mod config;
pub mod identity;
