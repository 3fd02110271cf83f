/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Two-phase resolution.
//!
//! Templates are registered in no particular order, so a template may call a
//! partial (or invoke a sub-template) that is not registered when it is
//! transformed. [`TemplateTransformer`] remembers those names across
//! transform calls and attaches them in [`TemplateTransformer::resolve_deferred`],
//! once the caller has registered everything.

use crate::context::TransformContext;
use crate::driver::{apply_template_transformers, expand_late_template, transform_template};
use crate::error::{TransformError, TransformResult};
use crate::options::TransformOptions;
use indexmap::IndexSet;
use std::collections::{BTreeMap, HashMap, HashSet};
use tplkit_template::{TemplateId, TemplateSet};
use tracing::{debug, trace};

/// Runs the pass over a [`TemplateSet`] and tracks what it could not resolve.
#[derive(Debug, Default)]
pub struct TemplateTransformer {
    options: TransformOptions,
    /// Qualified partial name -> templates that call it.
    pending_dependencies: BTreeMap<String, IndexSet<TemplateId>>,
    /// Sub-template name -> templates that invoked it before it was registered.
    pending_templates: BTreeMap<String, IndexSet<TemplateId>>,
    transformed: HashSet<TemplateId>,
    /// Sub-template names each template has expanded so far.
    visited: HashMap<TemplateId, HashSet<String>>,
}

/// Outcome of [`TemplateTransformer::resolve_deferred`].
#[derive(Debug, Default)]
pub struct DeferredReport {
    /// Late templates that were transformed in their own right.
    pub transformed: Vec<TemplateId>,
    /// Dependency edges attached, as (dependent, dependency).
    pub edges_added: Vec<(TemplateId, TemplateId)>,
    /// Partial names that still do not resolve.
    pub unresolved_dependencies: Vec<String>,
    /// Sub-template names that still do not resolve.
    pub unresolved_templates: Vec<String>,
    /// Errors recorded while transforming late templates.
    pub errors: Vec<TransformError>,
}

impl DeferredReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved_dependencies.is_empty() && self.unresolved_templates.is_empty()
    }
}

impl TemplateTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transform the template registered as `name` and remember whatever it
    /// left unresolved.
    pub fn transform(
        &mut self,
        templates: &mut TemplateSet,
        name: &str,
    ) -> TransformResult<TransformContext> {
        let ctx = apply_template_transformers(templates, name, &self.options)?;
        self.remember(&ctx);
        Ok(ctx)
    }

    /// Transform every registered template that has not been transformed by
    /// this transformer yet, in registration order.
    pub fn transform_all(&mut self, templates: &mut TemplateSet) -> Vec<TransformContext> {
        let ids: Vec<TemplateId> = templates
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !self.transformed.contains(id))
            .collect();
        ids.into_iter()
            .map(|id| {
                let ctx = transform_template(templates, id, &self.options);
                self.remember(&ctx);
                ctx
            })
            .collect()
    }

    /// Whether `id` has been transformed by this transformer.
    pub fn is_transformed(&self, id: TemplateId) -> bool {
        self.transformed.contains(&id)
    }

    /// Second phase: retry everything remembered so far.
    ///
    /// A sub-template that now resolves is walked again on behalf of every
    /// template that invoked it, so the partials it calls become dependencies
    /// of those templates. It is also transformed in its own right if it has
    /// not been yet. Either walk may defer further names; those are retried
    /// in the same call. Partial names that now resolve become dependency
    /// edges of every template that called them. Names that still do not
    /// resolve stay pending for a later call.
    pub fn resolve_deferred(
        &mut self,
        templates: &mut TemplateSet,
    ) -> TransformResult<DeferredReport> {
        let mut report = DeferredReport::default();

        // Each pass removes the names it resolves; a name comes back only for
        // a referrer that has not visited it, so this terminates.
        loop {
            let ready: Vec<(String, TemplateId)> = self
                .pending_templates
                .keys()
                .filter_map(|name| templates.lookup(name).map(|id| (name.clone(), id)))
                .collect();
            if ready.is_empty() {
                break;
            }
            for (name, id) in ready {
                let referrers = self.pending_templates.remove(&name).unwrap_or_default();

                if !self.transformed.contains(&id) {
                    let mut ctx = transform_template(templates, id, &self.options);
                    self.remember(&ctx);
                    if let Some(err) = ctx.take_error() {
                        report.errors.push(err);
                    }
                    report.transformed.push(id);
                }

                for referrer in referrers {
                    let before = templates.get(referrer).dependencies().clone();
                    let visited = self.visited.remove(&referrer).unwrap_or_default();
                    let mut ctx =
                        expand_late_template(templates, referrer, &name, visited, &self.options);
                    self.remember(&ctx);
                    if let Some(err) = ctx.take_error() {
                        report.errors.push(err);
                    }
                    for &dependency in templates.get(referrer).dependencies() {
                        if !before.contains(&dependency) {
                            report.edges_added.push((referrer, dependency));
                        }
                    }
                }
            }
        }

        let pending = std::mem::take(&mut self.pending_dependencies);
        for (name, dependents) in pending {
            let Some(dependency) = templates.lookup(&name) else {
                self.pending_dependencies.insert(name, dependents);
                continue;
            };
            for dependent in dependents {
                if templates.get_mut(dependent).add_dependency(dependency) {
                    trace!(
                        template = templates.get(dependent).name(),
                        dependency = %name,
                        "attached deferred dependency"
                    );
                    report.edges_added.push((dependent, dependency));
                }
            }
        }

        report.unresolved_dependencies = self.pending_dependencies.keys().cloned().collect();
        report.unresolved_templates = self.pending_templates.keys().cloned().collect();

        debug!(
            transformed = report.transformed.len(),
            edges_added = report.edges_added.len(),
            unresolved_dependencies = report.unresolved_dependencies.len(),
            unresolved_templates = report.unresolved_templates.len(),
            "Resolved deferred names"
        );
        Ok(report)
    }

    /// Partial names still waiting to be registered, with the templates that
    /// call them.
    pub fn pending_dependencies(&self) -> &BTreeMap<String, IndexSet<TemplateId>> {
        &self.pending_dependencies
    }

    /// Sub-template names still waiting to be registered, with the templates
    /// that invoke them.
    pub fn pending_templates(&self) -> &BTreeMap<String, IndexSet<TemplateId>> {
        &self.pending_templates
    }

    fn remember(&mut self, ctx: &TransformContext) {
        self.transformed.insert(ctx.template());
        for name in ctx.dependencies_not_found() {
            self.pending_dependencies
                .entry(name.clone())
                .or_default()
                .insert(ctx.template());
        }
        for name in ctx.templates_not_found() {
            self.pending_templates
                .entry(name.clone())
                .or_default()
                .insert(ctx.template());
        }
        self.visited
            .entry(ctx.template())
            .or_default()
            .extend(ctx.visited_names().iter().cloned());
    }
}
