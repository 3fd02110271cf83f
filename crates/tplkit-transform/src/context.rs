/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Per-call state of the transformation pass.

use crate::error::TransformError;
use std::collections::{BTreeSet, HashSet};
use tplkit_template::{CommandNode, TemplateId, TemplateKind, TemplateSet};

/// State for one top-level transform call.
///
/// Created fresh for each call and handed back to the caller afterwards, so
/// the deferred sets can drive the second resolution phase.
#[derive(Debug)]
pub struct TransformContext {
    template: TemplateId,
    kind: TemplateKind,

    /// Sub-template names already expanded during this call.
    visited: HashSet<String>,
    /// Sub-templates invoked but not registered (yet).
    templates_not_found: BTreeSet<String>,
    /// Qualified partial names called but not registered (yet).
    dependencies_not_found: BTreeSet<String>,

    /// The first error encountered.
    err: Option<TransformError>,

    /// Set once the first pipeline has been offered to the config extractor.
    pub(crate) config_checked: bool,

    /// The captured return expression of a partial.
    pub(crate) return_node: Option<CommandNode>,
}

impl TransformContext {
    pub(crate) fn new(template: TemplateId, kind: TemplateKind) -> Self {
        Self {
            template,
            kind,
            visited: HashSet::new(),
            templates_not_found: BTreeSet::new(),
            dependencies_not_found: BTreeSet::new(),
            err: None,
            config_checked: false,
            return_node: None,
        }
    }

    /// Context for walking, on behalf of `template`, a sub-template that was
    /// registered only after `template` was transformed.
    ///
    /// The config literal and the return statement belong to the first walk,
    /// so both are treated as already seen. `visited` carries the names the
    /// earlier walks of `template` expanded.
    pub(crate) fn resumed(
        template: TemplateId,
        kind: TemplateKind,
        visited: HashSet<String>,
    ) -> Self {
        Self {
            visited,
            config_checked: true,
            return_node: Some(CommandNode::default()),
            ..Self::new(template, kind)
        }
    }

    /// The template being transformed.
    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Sub-template names that could not be resolved during the walk.
    pub fn templates_not_found(&self) -> &BTreeSet<String> {
        &self.templates_not_found
    }

    /// Partial names (qualified) that could not be resolved during the walk.
    pub fn dependencies_not_found(&self) -> &BTreeSet<String> {
        &self.dependencies_not_found
    }

    /// The first non-fatal error recorded during the walk.
    pub fn error(&self) -> Option<&TransformError> {
        self.err.as_ref()
    }

    pub fn take_error(&mut self) -> Option<TransformError> {
        self.err.take()
    }

    /// Whether `name` was expanded as a sub-template during this call.
    pub fn visited(&self, name: &str) -> bool {
        self.visited.contains(name)
    }

    pub(crate) fn visited_names(&self) -> &HashSet<String> {
        &self.visited
    }

    pub(crate) fn record_error(&mut self, err: TransformError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    pub(crate) fn defer_dependency(&mut self, name: String) {
        self.dependencies_not_found.insert(name);
    }

    /// Resolve a sub-template for expansion, at most once per call.
    ///
    /// Returns `None` if the name was already visited (no re-expansion, no
    /// error) or is not registered; in the latter case the name is deferred.
    pub(crate) fn get_if_not_visited(
        &mut self,
        name: &str,
        templates: &TemplateSet,
    ) -> Option<TemplateId> {
        if !self.visited.insert(name.to_string()) {
            return None;
        }
        let found = templates.lookup(name);
        if found.is_none() {
            // May be defined in a file that is not registered yet.
            self.templates_not_found.insert(name.to_string());
        }
        found
    }
}
