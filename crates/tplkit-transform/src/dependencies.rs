/*
 * dependencies.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Partial dependency collection.
//!
//! A command of the form `partial "name" ...` (or `partialCached`,
//! `partials.Include`, `partials.IncludeCached`) makes the current template
//! depend on the partial registered as `partials/name.html`.

use crate::context::TransformContext;
use crate::options::TransformOptions;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tplkit_template::{Arg, CommandNode, TemplateSet, qualify_partial_name};
use tracing::trace;

/// Rendered names of the functions that invoke a partial.
static PARTIAL_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^partial(Cached)?$|^partials\.Include(Cached)?$").unwrap());

/// Whether `callee` (an identifier or a printed chain) invokes a partial.
pub fn is_partial_call(callee: &str) -> bool {
    PARTIAL_CALL.is_match(callee)
}

/// The registered name of the partial a command invokes, if it is a partial
/// call with a literal target.
pub fn partial_target(cmd: &CommandNode, options: &TransformOptions) -> Option<String> {
    let [first, second, ..] = cmd.args.as_slice() else {
        return None;
    };

    let callee = match first {
        Arg::Identifier(name) => Cow::Borrowed(name.as_str()),
        Arg::Chain(_) => Cow::Owned(first.to_string()),
        _ => return None,
    };
    if !is_partial_call(&callee) {
        return None;
    }

    match second {
        Arg::String(target) => Some(qualify_partial_name(
            &target.text,
            &options.partial_namespace,
            &options.default_extension,
        )),
        other => {
            trace!(callee = %callee, target = %other, "partial target is not a literal");
            None
        }
    }
}

/// Record the dependency a partial call introduces, or defer it when the
/// partial is not registered yet.
pub(crate) fn collect_partial_info(
    cmd: &CommandNode,
    ctx: &mut TransformContext,
    templates: &mut TemplateSet,
    options: &TransformOptions,
) {
    let Some(name) = partial_target(cmd, options) else {
        return;
    };

    match templates.lookup(&name) {
        Some(id) => {
            if templates.get_mut(ctx.template()).add_dependency(id) {
                trace!(dependency = %name, "recorded dependency");
            }
        }
        None => {
            trace!(dependency = %name, "dependency not registered yet, deferring");
            ctx.defer_dependency(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tplkit_template::parse;

    fn first_cmd(source: &str) -> CommandNode {
        let parsed = parse("t", source).unwrap();
        match parsed.root.nodes.into_iter().next() {
            Some(tplkit_template::Node::Action(action)) => {
                action.pipe.cmds.into_iter().next().unwrap()
            }
            other => panic!("expected an action, got {:?}", other),
        }
    }

    // ============================================================================
    // Call pattern
    // ============================================================================

    #[test]
    fn test_partial_call_pattern() {
        assert!(is_partial_call("partial"));
        assert!(is_partial_call("partialCached"));
        assert!(is_partial_call("partials.Include"));
        assert!(is_partial_call("partials.IncludeCached"));

        assert!(!is_partial_call("partials"));
        assert!(!is_partial_call("partialCachedX"));
        assert!(!is_partial_call("mypartial"));
        assert!(!is_partial_call("partials.IncludeX"));
    }

    // ============================================================================
    // Target resolution
    // ============================================================================

    #[test]
    fn test_target_gets_namespace_and_extension() {
        let options = TransformOptions::default();
        assert_eq!(
            partial_target(&first_cmd(r#"{{ partial "foo" . }}"#), &options).as_deref(),
            Some("partials/foo.html")
        );
        assert_eq!(
            partial_target(&first_cmd(r#"{{ partialCached "foo.xml" . }}"#), &options).as_deref(),
            Some("partials/foo.xml")
        );
        assert_eq!(
            partial_target(&first_cmd(r#"{{ partials.Include "nav/menu" . }}"#), &options)
                .as_deref(),
            Some("partials/nav/menu.html")
        );
    }

    #[test]
    fn test_target_uses_configured_naming() {
        let options = TransformOptions {
            partial_namespace: "_partials/".to_string(),
            default_extension: ".txt".to_string(),
            ..TransformOptions::default()
        };
        assert_eq!(
            partial_target(&first_cmd(r#"{{ partial "foo" }}"#), &options).as_deref(),
            Some("_partials/foo.txt")
        );
    }

    #[test]
    fn test_non_partial_calls_are_ignored() {
        let options = TransformOptions::default();
        assert_eq!(partial_target(&first_cmd(r#"{{ print "foo" . }}"#), &options), None);
        assert_eq!(partial_target(&first_cmd(r#"{{ partial }}"#), &options), None);
        assert_eq!(partial_target(&first_cmd(r#"{{ .partial "foo" }}"#), &options), None);
    }

    #[test]
    fn test_non_literal_target_is_skipped() {
        let options = TransformOptions::default();
        assert_eq!(partial_target(&first_cmd(r#"{{ partial .Name . }}"#), &options), None);
        assert_eq!(partial_target(&first_cmd(r#"{{ partial $name . }}"#), &options), None);
    }

    // ============================================================================
    // Recording
    // ============================================================================

    #[test]
    fn test_found_partial_is_recorded_once() {
        let mut set = TemplateSet::new();
        let foo = set.add_template("partials/foo.html", "foo").unwrap();
        let page = set.add_template("page.html", "").unwrap();
        let mut ctx = TransformContext::new(page, set.get(page).kind());
        let options = TransformOptions::default();

        let cmd = first_cmd(r#"{{ partial "foo" . }}"#);
        collect_partial_info(&cmd, &mut ctx, &mut set, &options);
        collect_partial_info(&cmd, &mut ctx, &mut set, &options);

        assert_eq!(set.get(page).dependencies().iter().copied().collect::<Vec<_>>(), vec![foo]);
        assert!(ctx.dependencies_not_found().is_empty());
    }

    #[test]
    fn test_missing_partial_is_deferred() {
        let mut set = TemplateSet::new();
        let page = set.add_template("page.html", "").unwrap();
        let mut ctx = TransformContext::new(page, set.get(page).kind());

        let cmd = first_cmd(r#"{{ partials.IncludeCached "later" . }}"#);
        collect_partial_info(&cmd, &mut ctx, &mut set, &TransformOptions::default());

        assert!(set.get(page).dependencies().is_empty());
        assert!(ctx.dependencies_not_found().contains("partials/later.html"));
    }
}
