/*
 * pandoc_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Tests against a real pandoc binary. Skipped when pandoc is not installed.
 */

use tplkit_pandoc::{DocumentContext, PandocConverter, PandocOptions};

fn converter() -> Option<PandocConverter> {
    let converter = PandocConverter::new(PandocOptions::default());
    if !converter.supports() {
        eprintln!("pandoc not installed, skipping");
        return None;
    }
    Some(converter)
}

#[test]
fn test_convert() {
    let Some(converter) = converter() else {
        return;
    };
    let output = converter
        .convert(b"testContent", &DocumentContext::named("test.md"))
        .unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "<p>testContent</p>\n");
}

#[test]
fn test_version_call_twice() {
    let Some(converter) = converter() else {
        return;
    };
    let first = converter.version();
    let second = converter.version();
    assert!(first.is_ok());
    assert_eq!(first, second);
}

#[test]
fn test_citeproc_with_metadata_only() {
    let Some(converter) = converter() else {
        return;
    };
    if !converter.supports_citations() {
        eprintln!("pandoc does not support citations, skipping");
        return;
    }
    let content = "\n---\ntitle: Test\npublished: 2022-05-30\n---\ntestContent\n";
    let output = converter
        .convert(content.as_bytes(), &DocumentContext::named("meta.md"))
        .unwrap();
    let html = String::from_utf8(output).unwrap();
    assert!(html.contains("testContent"), "{}", html);
    assert!(!html.contains("2022"), "{}", html);
}
