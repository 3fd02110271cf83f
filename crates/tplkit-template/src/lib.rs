/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template syntax trees, registry and executor for tplkit.
//!
//! The language is a small Go-template-like dialect:
//!
//! - Text and actions: `Hello, {{ .Title }}`
//! - Pipelines and declarations: `{{ $x := .Params.x | len }}`
//! - Control flow: `{{ if }}`, `{{ with }}`, `{{ range }}` with `{{ else }}`
//! - Sub-templates: `{{ define "name" }}...{{ end }}`, `{{ template "name" . }}`
//! - Partials called as functions: `{{ partial "card" . }}`
//!
//! # Architecture
//!
//! Templates are parsed into [`ListNode`] trees and registered in a
//! [`TemplateSet`], an arena addressed by [`TemplateId`]. Analysis passes
//! (see the `tplkit-transform` crate) take a tree out of its template,
//! rewrite it, and put it back; the [`Executor`] then runs the result.
//!
//! # Example
//!
//! ```ignore
//! use tplkit_template::{Executor, TemplateSet, TemplateValue};
//!
//! let mut set = TemplateSet::new();
//! set.add_template("page.html", "Hello, {{ .name }}!")?;
//!
//! let data = TemplateValue::from(serde_json::json!({ "name": "World" }));
//! let output = Executor::new(&set).execute("page.html", &data)?;
//! assert_eq!(output, "Hello, World!");
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
mod lexer;
pub mod parser;
pub mod template;

// Re-export main types at crate root
pub use ast::{
    ActionNode, Arg, BranchNode, ChainNode, CommandNode, CommentNode, FieldNode, ListNode, Node,
    Number, NumberNode, PipeNode, StringNode, TemplateNode, TextNode, VariableNode,
};
pub use context::{Carrier, TemplateValue};
pub use error::{TemplateError, TemplateResult};
pub use evaluator::Executor;
pub use parser::{ParsedTemplate, parse};
pub use template::{
    DEFAULT_PARTIAL_EXTENSION, DEFAULT_PARTIAL_NAMESPACE, ParseInfo, Template, TemplateConfig,
    TemplateId, TemplateKind, TemplateSet, qualify_partial_name,
};
