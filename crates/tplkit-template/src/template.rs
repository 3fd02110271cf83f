/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template registry.
//!
//! [`TemplateSet`] owns every registered [`Template`] in an arena addressed by
//! [`TemplateId`]. Templates refer to each other by id (dependency edges) or
//! by name (invocations in the tree), never by reference, so a pass can
//! rewrite one template's tree while reading or mutating others through the
//! same set.

use crate::ast::ListNode;
use crate::error::TemplateResult;
use crate::parser::parse;
use indexmap::IndexSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Namespace prefix under which partials are registered.
pub const DEFAULT_PARTIAL_NAMESPACE: &str = "partials/";

/// Extension appended to partial names given without one.
pub const DEFAULT_PARTIAL_EXTENSION: &str = ".html";

/// Qualify a partial name as used in a template call (`"foo"`) into the
/// registered template name (`"partials/foo.html"`).
///
/// A name that already contains a `.` keeps its extension.
pub fn qualify_partial_name(name: &str, namespace: &str, default_extension: &str) -> String {
    let mut qualified = String::with_capacity(namespace.len() + name.len() + 5);
    qualified.push_str(namespace);
    qualified.push_str(name);
    if !name.contains('.') {
        qualified.push_str(default_extension);
    }
    qualified
}

/// Stable handle to a template within one [`TemplateSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(usize);

/// What role a template plays in the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    #[default]
    Undefined,
    Shortcode,
    Partial,
}

impl TemplateKind {
    /// Infer the kind from a registered name: anything under `shortcodes/`
    /// is a shortcode, anything under `partials/` is a partial.
    pub fn from_name(name: &str) -> Self {
        if name.contains("shortcodes/") {
            TemplateKind::Shortcode
        } else if name.contains(DEFAULT_PARTIAL_NAMESPACE) {
            TemplateKind::Partial
        } else {
            TemplateKind::Undefined
        }
    }
}

/// Facts about a template discovered by analysing its tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseInfo {
    /// Set for partials with a return statement.
    pub has_return: bool,
    /// Set for shortcodes that reference their enclosed content.
    pub is_inner: bool,
    /// Decoded leading config literal of a shortcode.
    pub config: Option<TemplateConfig>,
}

/// Structured configuration declared at the top of a shortcode.
///
/// `version` is decoded leniently: integers, integral floats, numeric
/// strings and booleans are all accepted. Every other key is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(
        default,
        deserialize_with = "weak_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<i64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TemplateConfig {
    /// The config as a flat key/value map, `version` included.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = self.extra.clone();
        if let Some(version) = self.version {
            map.insert("version".to_string(), version.into());
        }
        map
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        match (key, self.version) {
            ("version", Some(version)) => Some(version.into()),
            _ => self.extra.get(key).cloned(),
        }
    }
}

fn weak_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(i64::from(b))),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                // `i64::MAX as f64` rounds up to 2^63, so the range is half-open.
                n.as_f64()
                    .filter(|f| {
                        f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f)
                    })
                    .map(|f| f as i64)
            })
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("cannot decode {} as an integer", n))),
        Value::String(s) if s.trim().is_empty() => Ok(Some(0)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("cannot parse {:?} as an integer: {}", s, e))),
        other => Err(D::Error::custom(format!(
            "expected an integer, found {}",
            other
        ))),
    }
}

/// A registered template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    kind: TemplateKind,
    root: ListNode,
    /// Analysis results, filled in by the transformation pass.
    pub parse_info: ParseInfo,
    dependencies: IndexSet<TemplateId>,
}

impl Template {
    pub fn new(name: impl Into<String>, kind: TemplateKind, root: ListNode) -> Self {
        Self {
            name: name.into(),
            kind,
            root,
            parse_info: ParseInfo::default(),
            dependencies: IndexSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn root(&self) -> &ListNode {
        &self.root
    }

    /// Move the tree out, leaving an empty list behind.
    ///
    /// Pair with [`Template::replace_root`] to rewrite a tree without holding
    /// a borrow of the template (or its set) during the rewrite.
    pub fn take_root(&mut self) -> ListNode {
        std::mem::take(&mut self.root)
    }

    /// Install a new tree, returning the previous one.
    pub fn replace_root(&mut self, root: ListNode) -> ListNode {
        std::mem::replace(&mut self.root, root)
    }

    /// Templates whose output this template depends on, in discovery order.
    pub fn dependencies(&self) -> &IndexSet<TemplateId> {
        &self.dependencies
    }

    /// Record a dependency edge. Returns `false` if it was already recorded.
    pub fn add_dependency(&mut self, id: TemplateId) -> bool {
        self.dependencies.insert(id)
    }
}

/// Arena of templates with a name index.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<Template>,
    index: HashMap<String, TemplateId>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Parse `source` and register it under `name`, with the kind inferred
    /// from the name. `define` blocks are registered under their own names.
    pub fn add_template(&mut self, name: &str, source: &str) -> TemplateResult<TemplateId> {
        self.add_template_with_kind(name, TemplateKind::from_name(name), source)
    }

    pub fn add_template_with_kind(
        &mut self,
        name: &str,
        kind: TemplateKind,
        source: &str,
    ) -> TemplateResult<TemplateId> {
        let parsed = parse(name, source)?;
        for (define_name, body) in parsed.defines {
            self.insert(Template::new(define_name, TemplateKind::Undefined, body));
        }
        Ok(self.insert(Template::new(name, kind, parsed.root)))
    }

    /// Register a template. A template already registered under the same
    /// name is replaced in place and keeps its id.
    pub fn insert(&mut self, template: Template) -> TemplateId {
        if let Some(&id) = self.index.get(template.name()) {
            self.templates[id.0] = template;
            return id;
        }
        let id = TemplateId(self.templates.len());
        self.index.insert(template.name().to_string(), id);
        self.templates.push(template);
        id
    }

    /// Resolve a template name.
    pub fn lookup(&self, name: &str) -> Option<TemplateId> {
        self.index.get(name).copied()
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this set.
    pub fn get(&self, id: TemplateId) -> &Template {
        &self.templates[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this set.
    pub fn get_mut(&mut self, id: TemplateId) -> &mut Template {
        &mut self.templates[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&Template> {
        self.lookup(name).map(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &Template)> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| (TemplateId(i), t))
    }

    /// Templates that recorded a direct dependency on `id`; these are the
    /// ones to invalidate when `id` changes.
    pub fn dependents(&self, id: TemplateId) -> Vec<TemplateId> {
        self.iter()
            .filter(|(_, t)| t.dependencies.contains(&id))
            .map(|(dependent, _)| dependent)
            .collect()
    }
}
