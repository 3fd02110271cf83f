/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for the transformation pass.
//!
//! Unresolved dependency and sub-template names are not errors; they are
//! deferred on the [`TransformContext`](crate::TransformContext) and retried
//! by [`TemplateTransformer::resolve_deferred`](crate::TemplateTransformer::resolve_deferred).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// The template to transform is not registered. Fatal for the call.
    #[error("expected template, but none provided: no template named {name:?}")]
    InvalidArgument { name: String },

    /// A shortcode's leading config literal could not be decoded.
    ///
    /// Only config extraction is abandoned; the rest of the pass runs.
    #[error("failed to decode {variable} in template {template:?}: {source}")]
    ConfigDecode {
        template: String,
        variable: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type TransformResult<T> = Result<T, TransformError>;
