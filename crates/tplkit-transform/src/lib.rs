/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Post-parse transformation pass for tplkit templates.
//!
//! Run once per template after registration and before rendering, the pass:
//!
//! - records which partials a template calls, so dependents can be
//!   invalidated when a partial changes;
//! - rewrites partials that end in `{{ return expr }}` so they can be called
//!   as functions;
//! - decodes a shortcode's leading `$_hugo_config` literal;
//! - notes whether a shortcode uses `.Inner`.
//!
//! Names that do not resolve yet are deferred rather than reported. Use
//! [`TemplateTransformer`] to transform templates as they are registered and
//! [`TemplateTransformer::resolve_deferred`] once all of them are known.
//!
//! # Example
//!
//! ```ignore
//! use tplkit_template::TemplateSet;
//! use tplkit_transform::TemplateTransformer;
//!
//! let mut set = TemplateSet::new();
//! set.add_template("page.html", r#"{{ partial "card" . }}"#)?;
//!
//! let mut transformer = TemplateTransformer::default();
//! transformer.transform_all(&mut set);
//!
//! set.add_template("partials/card.html", "<div>{{ .Title }}</div>")?;
//! let report = transformer.resolve_deferred(&mut set)?;
//! assert!(report.is_complete());
//! ```

pub mod config;
pub mod context;
pub mod dependencies;
pub mod driver;
pub mod error;
mod inner;
pub mod options;
pub mod resolve;
pub mod returns;

pub use config::decode_config;
pub use context::TransformContext;
pub use dependencies::{is_partial_call, partial_target};
pub use driver::apply_template_transformers;
pub use error::{TransformError, TransformResult};
pub use options::TransformOptions;
pub use resolve::{DeferredReport, TemplateTransformer};
pub use returns::wrap_in_partial_return_wrapper;
