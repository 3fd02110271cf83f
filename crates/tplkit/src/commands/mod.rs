//! Command implementations for the tplkit CLI
//!
//! Each command module handles the CLI interface and delegates to the
//! tplkit-transform and tplkit-pandoc crates.

pub mod convert;
pub mod deps;
