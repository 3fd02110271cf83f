/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Markup conversion through an external `pandoc` binary.
//!
//! The converter locates the binary once (an explicit option, then the
//! `TPLKIT_PANDOC` environment variable, then `PATH`), probes its version
//! once, and pipes content through it with `--mathjax`, adding `--citeproc`
//! when the version supports it. A missing binary is not an error: content
//! is returned unrendered with a warning.

pub mod converter;
pub mod error;
pub mod runner;
pub mod version;

pub use converter::{DocumentContext, PANDOC_BINARY, PANDOC_ENV_VAR, PandocConverter, PandocOptions};
pub use error::{ConvertError, ConvertResult};
pub use runner::{CommandOutput, CommandRunner, NativeRunner};
pub use version::{MIN_CITATIONS_VERSION, PandocVersion};
