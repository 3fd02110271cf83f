/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for tplkit-template using test fixtures.
 */

use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tplkit_template::{Executor, TemplateError, TemplateKind, TemplateSet, TemplateValue};

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

/// Helper to register fixtures under their fixture-relative names
fn load_templates(names: &[&str]) -> TemplateSet {
    let mut set = TemplateSet::new();
    for name in names {
        let source = std::fs::read_to_string(fixture_path(name))
            .unwrap_or_else(|_| panic!("Failed to read fixture: {}", name));
        set.add_template(name, &source)
            .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", name, e));
    }
    set
}

fn render(set: &TemplateSet, name: &str, data: serde_json::Value) -> String {
    Executor::new(set)
        .execute(name, &TemplateValue::from(data))
        .unwrap()
}

#[test]
fn test_simple_interpolation() {
    let set = load_templates(&["simple.html"]);
    assert_eq!(
        render(&set, "simple.html", json!({ "name": "World" })),
        "Hello, World!"
    );
}

#[test]
fn test_conditional_true() {
    let set = load_templates(&["conditional.html"]);
    assert_eq!(
        render(
            &set,
            "conditional.html",
            json!({ "show_greeting": true, "name": "Alice" })
        ),
        "Hi, Alice"
    );
}

#[test]
fn test_conditional_false() {
    let set = load_templates(&["conditional.html"]);
    assert_eq!(
        render(&set, "conditional.html", json!({ "show_greeting": false })),
        "Bye"
    );
}

#[test]
fn test_range_with_index_and_trim_markers() {
    let set = load_templates(&["loop.html"]);
    assert_eq!(
        render(
            &set,
            "loop.html",
            json!({ "items": [{ "title": "A" }, { "title": "B" }] })
        ),
        "\n0: A\n1: B\n"
    );
}

#[test]
fn test_range_else_on_empty_list() {
    let set = load_templates(&["loop.html"]);
    assert_eq!(
        render(&set, "loop.html", json!({ "items": [] })),
        "\nnothing\n"
    );
}

#[test]
fn test_define_and_template_invocation() {
    let set = load_templates(&["list.html"]);
    assert!(set.lookup("row").is_some());
    assert_eq!(
        render(
            &set,
            "list.html",
            json!({ "pages": [{ "title": "a" }, { "title": "b" }] })
        ),
        "<ul><li>a</li><li>b</li></ul>"
    );
}

#[test]
fn test_partial_call() {
    let set = load_templates(&["page.html", "partials/card.html"]);
    assert_eq!(
        set.by_name("partials/card.html").unwrap().kind(),
        TemplateKind::Partial
    );
    assert_eq!(
        render(&set, "page.html", json!({ "page": { "title": "T" } })),
        r#"<main><div class="card">T</div></main>"#
    );
    assert_eq!(
        render(&set, "page.html", json!({})),
        r#"<main><div class="card">untitled</div></main>"#
    );
}

#[test]
fn test_missing_partial_is_an_error() {
    let set = load_templates(&["page.html"]);
    let err = Executor::new(&set)
        .execute("page.html", &TemplateValue::Null)
        .unwrap_err();
    assert!(
        matches!(err, TemplateError::TemplateNotFound { ref name } if name == "partials/card.html"),
        "{}",
        err
    );
}

#[test]
fn test_recursion_limit() {
    let mut set = TemplateSet::new();
    set.add_template("loop.html", r#"{{ template "loop.html" . }}"#)
        .unwrap();
    let err = Executor::new(&set)
        .with_max_depth(8)
        .execute("loop.html", &TemplateValue::Null)
        .unwrap_err();
    assert!(matches!(err, TemplateError::RecursionLimit { max_depth: 8, .. }));
}

#[test]
fn test_reregistering_keeps_id() {
    let mut set = TemplateSet::new();
    let first = set.add_template("partials/a.html", "one").unwrap();
    let second = set.add_template("partials/a.html", "two").unwrap();
    assert_eq!(first, second);
    assert_eq!(set.len(), 1);
    assert_eq!(render(&set, "partials/a.html", json!(null)), "two");
}
