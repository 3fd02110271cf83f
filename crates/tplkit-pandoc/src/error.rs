/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors from probing or running the converter binary.
///
/// Cloneable so a failed version probe can be cached and reported again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The binary is not on `PATH` and no override was configured.
    #[error("{name} not found in PATH")]
    BinaryNotFound { name: String },

    /// The process could not be started or its pipes failed.
    #[error("failed to run {}: {message}", .program.display())]
    Spawn { program: PathBuf, message: String },

    /// The process exited with a non-zero status.
    #[error("{program} failed to convert {document:?} (exit {code}): {stderr}")]
    Process {
        program: String,
        document: String,
        code: i32,
        stderr: String,
    },

    /// `--version` output did not start with `<name> <major>.<minor>`.
    #[error("cannot parse version from {output:?}")]
    VersionParse { output: String },
}

pub type ConvertResult<T> = Result<T, ConvertError>;
