/*
 * deps.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `tplkit deps`: load a layouts directory and report the partial
//! dependency graph.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tplkit_template::{ParseInfo, TemplateKind, TemplateSet};
use tplkit_transform::{TemplateTransformer, TransformOptions};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// One template and what the pass found in it.
#[derive(Debug, Serialize)]
pub struct TemplateReport {
    pub name: String,
    pub kind: TemplateKind,
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub parse_info: ParseInfo,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DependencyGraph {
    pub templates: Vec<TemplateReport>,
    /// Partials called somewhere but never found.
    pub unresolved_dependencies: Vec<String>,
    /// Sub-templates invoked somewhere but never found.
    pub unresolved_templates: Vec<String>,
}

impl DependencyGraph {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for template in &self.templates {
            out.push_str(&template.name);
            if template.parse_info.has_return {
                out.push_str(" [return]");
            }
            if template.parse_info.is_inner {
                out.push_str(" [inner]");
            }
            if !template.dependencies.is_empty() {
                out.push_str(" -> ");
                out.push_str(&template.dependencies.join(", "));
            }
            out.push('\n');
        }
        for name in &self.unresolved_dependencies {
            out.push_str(&format!("unresolved partial: {name}\n"));
        }
        for name in &self.unresolved_templates {
            out.push_str(&format!("unresolved template: {name}\n"));
        }
        out
    }
}

pub fn execute(dir: &Path, json: bool, options: TransformOptions) -> Result<()> {
    let graph = build_graph(dir, options)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        print!("{}", graph.render_text());
    }
    Ok(())
}

/// Register every template file under `dir`, transform each one as it is
/// registered, then resolve the names that were only registered later.
pub fn build_graph(dir: &Path, options: TransformOptions) -> Result<DependencyGraph> {
    let files = find_template_files(dir)?;
    info!("Loading {} templates from {}", files.len(), dir.display());

    let mut templates = TemplateSet::new();
    let mut transformer = TemplateTransformer::new(options);

    for path in &files {
        let name = template_name(dir, path)?;
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        templates
            .add_template(&name, &source)
            .with_context(|| format!("Failed to parse {name}"))?;

        let mut ctx = transformer.transform(&mut templates, &name)?;
        if let Some(err) = ctx.take_error() {
            warn!("{}: {}", name, err);
        }
    }

    let report = transformer.resolve_deferred(&mut templates)?;
    for err in &report.errors {
        warn!("{}", err);
    }
    debug!(
        edges_added = report.edges_added.len(),
        "Resolved forward references"
    );

    let graph = DependencyGraph {
        templates: templates
            .iter()
            .map(|(_, template)| TemplateReport {
                name: template.name().to_string(),
                kind: template.kind(),
                dependencies: template
                    .dependencies()
                    .iter()
                    .map(|id| templates.get(*id).name().to_string())
                    .collect(),
                parse_info: template.parse_info.clone(),
            })
            .collect(),
        unresolved_dependencies: report.unresolved_dependencies,
        unresolved_templates: report.unresolved_templates,
    };
    Ok(graph)
}

fn find_template_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.context("Failed to read directory entry")?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Registered name of a file: its path below `dir`, `/`-separated.
fn template_name(dir: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(dir)
        .with_context(|| format!("{} is not under {}", path.display(), dir.display()))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.starts_with('.'))
}
