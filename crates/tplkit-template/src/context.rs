/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template value types.
//!
//! [`TemplateValue`] is what dot, variables and function results hold during
//! execution. [`Carrier`] is the object a value-returning partial receives as
//! dot: it exposes the caller's argument as `.Arg` and accepts the computed
//! value through `.Set`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A value that can be used in template execution.
#[derive(Debug, Clone, Default)]
pub enum TemplateValue {
    /// A null/missing value.
    #[default]
    Null,

    /// A boolean value.
    Bool(bool),

    /// An integer value.
    Int(i64),

    /// A floating point value.
    Float(f64),

    /// A string value.
    String(String),

    /// A list of values.
    List(Vec<TemplateValue>),

    /// A map of string keys to values. Iteration is in key order.
    Map(BTreeMap<String, TemplateValue>),

    /// Result slot for a partial invoked as a function.
    Carrier(Carrier),
}

impl TemplateValue {
    pub fn string(s: impl Into<String>) -> Self {
        TemplateValue::String(s.into())
    }

    /// Check if this value is "truthy" for `if`, `with` and `not`.
    ///
    /// Zero numbers, empty strings, empty collections, `false` and null are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Null => false,
            TemplateValue::Bool(b) => *b,
            TemplateValue::Int(i) => *i != 0,
            TemplateValue::Float(f) => *f != 0.0,
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::List(items) => !items.is_empty(),
            TemplateValue::Map(m) => !m.is_empty(),
            TemplateValue::Carrier(_) => true,
        }
    }

    /// Look up a single field.
    ///
    /// Maps are indexed by key; a carrier exposes its argument as `Arg`.
    pub fn field(&self, name: &str) -> Option<TemplateValue> {
        match self {
            TemplateValue::Map(m) => m.get(name).cloned(),
            TemplateValue::Carrier(c) if name == "Arg" => Some(c.arg().clone()),
            _ => None,
        }
    }

    /// Get a nested field by path.
    pub fn get_path(&self, path: &[&str]) -> Option<TemplateValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self.clone());
        };
        self.field(first).and_then(|v| v.get_path(rest))
    }

    /// Render this value as text for output.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateValue::Null | TemplateValue::Carrier(_) => Ok(()),
            TemplateValue::Bool(b) => write!(f, "{}", b),
            TemplateValue::Int(i) => write!(f, "{}", i),
            TemplateValue::Float(x) => write!(f, "{}", x),
            TemplateValue::String(s) => f.write_str(s),
            TemplateValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            TemplateValue::Map(m) => {
                f.write_str("map[")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl PartialEq for TemplateValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TemplateValue::Null, TemplateValue::Null) => true,
            (TemplateValue::Bool(a), TemplateValue::Bool(b)) => a == b,
            (TemplateValue::Int(a), TemplateValue::Int(b)) => a == b,
            (TemplateValue::Float(a), TemplateValue::Float(b)) => a == b,
            (TemplateValue::Int(a), TemplateValue::Float(b))
            | (TemplateValue::Float(b), TemplateValue::Int(a)) => (*a as f64) == *b,
            (TemplateValue::String(a), TemplateValue::String(b)) => a == b,
            (TemplateValue::List(a), TemplateValue::List(b)) => a == b,
            (TemplateValue::Map(a), TemplateValue::Map(b)) => a == b,
            (TemplateValue::Carrier(a), TemplateValue::Carrier(b)) => a.same(b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => TemplateValue::Int(i),
                None => TemplateValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.into_iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(map) => TemplateValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, TemplateValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Carrier object handed to a partial that returns a value.
///
/// Clones share the same result slot, so the caller keeps a handle while the
/// executing partial writes through its copy.
#[derive(Debug, Clone)]
pub struct Carrier {
    inner: Rc<CarrierInner>,
}

#[derive(Debug)]
struct CarrierInner {
    arg: TemplateValue,
    result: RefCell<Option<TemplateValue>>,
}

impl Carrier {
    pub fn new(arg: TemplateValue) -> Self {
        Self {
            inner: Rc::new(CarrierInner {
                arg,
                result: RefCell::new(None),
            }),
        }
    }

    /// The argument the partial was invoked with.
    pub fn arg(&self) -> &TemplateValue {
        &self.inner.arg
    }

    /// Store the partial's return value. The last call wins.
    pub fn set(&self, value: TemplateValue) {
        *self.inner.result.borrow_mut() = Some(value);
    }

    /// The stored return value, if `set` was called.
    pub fn result(&self) -> Option<TemplateValue> {
        self.inner.result.borrow().clone()
    }

    fn same(&self, other: &Carrier) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
