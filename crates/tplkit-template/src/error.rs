/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template parsing and execution.

use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Error parsing the template syntax.
    #[error("{template}: parse error at offset {offset}: {message}")]
    ParseError {
        template: String,
        offset: usize,
        message: String,
    },

    /// Error executing the template.
    #[error("{template}: execution error: {message}")]
    ExecError { template: String, message: String },

    /// A template invoked by name is not registered.
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// Unknown function name in a command.
    #[error("function {name:?} not defined")]
    UnknownFunction { name: String },

    /// Template invocations nested deeper than the executor allows.
    #[error("maximum template call depth exceeded ({max_depth}) calling {name}")]
    RecursionLimit { name: String, max_depth: usize },
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
