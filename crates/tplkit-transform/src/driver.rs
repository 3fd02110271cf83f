/*
 * driver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The tree walk.
//!
//! One depth-first, left-to-right pass over a template's tree. Each pipeline
//! is offered to the config extractor; each command to the dependency
//! collector, the inner-content detector and the return rewriter, in that
//! order. `{{ template "name" }}` invocations are followed into the invoked
//! template, at most once per name per call.

use crate::config::collect_config;
use crate::context::TransformContext;
use crate::dependencies::collect_partial_info;
use crate::error::{TransformError, TransformResult};
use crate::inner::collect_inner;
use crate::options::TransformOptions;
use crate::returns::{is_return_command, take_return_expression, wrap_in_partial_return_wrapper};
use std::collections::HashSet;
use tplkit_template::{
    Arg, BranchNode, CommandNode, ListNode, Node, PipeNode, TemplateId, TemplateSet,
};
use tracing::{debug, trace};

/// Run the transformation pass over the template registered as `name`.
///
/// Fails only if `name` is not registered. A config decode failure is
/// recorded on the returned context instead; when one was recorded, a
/// captured return statement is not wrapped.
///
/// The tree is rewritten in place. Call once per template: a second call
/// would wrap an already wrapped tree.
pub fn apply_template_transformers(
    templates: &mut TemplateSet,
    name: &str,
    options: &TransformOptions,
) -> TransformResult<TransformContext> {
    let Some(id) = templates.lookup(name) else {
        return Err(TransformError::InvalidArgument {
            name: name.to_string(),
        });
    };
    Ok(transform_template(templates, id, options))
}

pub(crate) fn transform_template(
    templates: &mut TemplateSet,
    id: TemplateId,
    options: &TransformOptions,
) -> TransformContext {
    let template = templates.get(id);
    let kind = template.kind();
    debug!(template = template.name(), ?kind, "Transforming template");

    let mut ctx = TransformContext::new(id, kind);
    let mut root = templates.get_mut(id).take_root();

    Walker {
        ctx: &mut ctx,
        templates,
        options,
    }
    .walk_list(&mut root);

    if ctx.error().is_none() {
        if let Some(return_cmd) = ctx.return_node.take() {
            debug!(
                template = templates.get(id).name(),
                "Wrapping partial with return statement"
            );
            root = wrap_in_partial_return_wrapper(root, return_cmd);
            templates.get_mut(id).parse_info.has_return = true;
        }
    }
    templates.get_mut(id).replace_root(root);

    debug!(
        template = templates.get(id).name(),
        dependencies = templates.get(id).dependencies().len(),
        deferred_dependencies = ctx.dependencies_not_found().len(),
        deferred_templates = ctx.templates_not_found().len(),
        "Transformed template"
    );
    ctx
}

/// Walk the sub-template `name` on behalf of `referrer`, which invoked it
/// before it was registered.
///
/// Partial calls found in the sub-template (and in whatever it invokes in
/// turn) become dependencies of `referrer`. The referrer's tree is not
/// rewritten again.
pub(crate) fn expand_late_template(
    templates: &mut TemplateSet,
    referrer: TemplateId,
    name: &str,
    visited: HashSet<String>,
    options: &TransformOptions,
) -> TransformContext {
    let kind = templates.get(referrer).kind();
    let mut ctx = TransformContext::resumed(referrer, kind, visited);
    let Some(id) = templates.lookup(name) else {
        return ctx;
    };
    trace!(
        template = templates.get(referrer).name(),
        sub_template = name,
        "expanding late sub-template"
    );

    let mut root = templates.get_mut(id).take_root();
    Walker {
        ctx: &mut ctx,
        templates,
        options,
    }
    .walk_list(&mut root);
    templates.get_mut(id).replace_root(root);
    ctx
}

struct Walker<'a> {
    ctx: &'a mut TransformContext,
    templates: &'a mut TemplateSet,
    options: &'a TransformOptions,
}

impl Walker<'_> {
    fn walk_list(&mut self, list: &mut ListNode) {
        list.nodes.retain_mut(|node| self.walk_node(node));
    }

    /// Returns `false` if the node should be removed from its list.
    fn walk_node(&mut self, node: &mut Node) -> bool {
        match node {
            Node::Text(_) | Node::Comment(_) => true,
            Node::Action(action) => {
                self.walk_pipe(&mut action.pipe);
                // An action that held nothing but a return statement is gone.
                !(action.pipe.cmds.is_empty() && action.pipe.decl.is_empty())
            }
            Node::If(branch) | Node::With(branch) | Node::Range(branch) => {
                self.walk_branch(branch);
                true
            }
            Node::Template(invocation) => {
                self.expand(&invocation.name);
                if let Some(pipe) = &mut invocation.pipe {
                    self.walk_pipe(pipe);
                }
                true
            }
        }
    }

    fn walk_branch(&mut self, branch: &mut BranchNode) {
        self.walk_pipe(&mut branch.pipe);
        self.walk_list(&mut branch.list);
        if let Some(else_list) = &mut branch.else_list {
            self.walk_list(else_list);
        }
    }

    fn walk_pipe(&mut self, pipe: &mut PipeNode) {
        collect_config(pipe, self.ctx, self.templates, self.options);
        pipe.cmds.retain_mut(|cmd| self.walk_command(cmd));
    }

    /// Returns `false` if the command was captured as the return statement.
    fn walk_command(&mut self, cmd: &mut CommandNode) -> bool {
        collect_partial_info(cmd, self.ctx, self.templates, self.options);
        collect_inner(cmd, self.ctx, self.templates, self.options);

        if !is_return_command(cmd, self.ctx, self.options) {
            self.walk_nested(cmd);
            return true;
        }

        let mut return_cmd = take_return_expression(cmd);
        // Claim the slot first so that returns nested in the expression stay inert.
        self.ctx.return_node = Some(CommandNode::default());
        self.walk_nested(&mut return_cmd);
        trace!(expression = %return_cmd, "captured return statement");
        self.ctx.return_node = Some(return_cmd);
        false
    }

    fn walk_nested(&mut self, cmd: &mut CommandNode) {
        for arg in &mut cmd.args {
            if let Arg::Pipe(pipe) = arg {
                self.walk_pipe(pipe);
            }
        }
    }

    /// Follow a `{{ template }}` invocation into the invoked tree.
    fn expand(&mut self, name: &str) {
        let Some(id) = self.ctx.get_if_not_visited(name, self.templates) else {
            return;
        };
        trace!(template = name, "expanding sub-template");
        let mut root = self.templates.get_mut(id).take_root();
        self.walk_list(&mut root);
        self.templates.get_mut(id).replace_root(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tplkit_template::TemplateKind;

    fn transform(set: &mut TemplateSet, name: &str) -> TransformContext {
        apply_template_transformers(set, name, &TransformOptions::default()).unwrap()
    }

    // ============================================================================
    // Driver contract
    // ============================================================================

    #[test]
    fn test_unknown_template_is_invalid_argument() {
        let mut set = TemplateSet::new();
        let err = apply_template_transformers(&mut set, "nope.html", &TransformOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidArgument { name } if name == "nope.html"));
    }

    #[test]
    fn test_context_describes_template() {
        let mut set = TemplateSet::new();
        let id = set.add_template("shortcodes/sc.html", "x").unwrap();
        let ctx = transform(&mut set, "shortcodes/sc.html");
        assert_eq!(ctx.template(), id);
        assert_eq!(ctx.kind(), TemplateKind::Shortcode);
        assert!(ctx.error().is_none());
    }

    #[test]
    fn test_partial_without_return_is_untouched() {
        let source = r#"a {{ if .X }}{{ partial "b" . }}{{ else }}{{ .Y | len }}{{ end }}"#;
        let mut set = TemplateSet::new();
        let id = set.add_template("partials/a.html", source).unwrap();
        let before = set.get(id).root().clone();

        transform(&mut set, "partials/a.html");

        assert_eq!(set.get(id).root(), &before);
        assert!(!set.get(id).parse_info.has_return);
    }

    // ============================================================================
    // Return statements
    // ============================================================================

    #[test]
    fn test_return_is_removed_and_wrapped() {
        let mut set = TemplateSet::new();
        let id = set
            .add_template("partials/sum.html", "before {{ return add .A .B }} after")
            .unwrap();

        transform(&mut set, "partials/sum.html");

        let template = set.get(id);
        assert!(template.parse_info.has_return);
        assert_eq!(
            template.root().to_string(),
            "{{$_hugo_dot := $}}{{$ := .Arg}}{{range (slice .Arg)}}before  after{{$_hugo_dot.Set (add .A .B)}}{{end}}"
        );
    }

    #[test]
    fn test_second_return_is_inert() {
        let mut set = TemplateSet::new();
        let id = set
            .add_template("partials/r.html", "{{ return 1 }}{{ return 2 }}")
            .unwrap();

        transform(&mut set, "partials/r.html");

        let printed = set.get(id).root().to_string();
        assert!(printed.contains("{{return 2}}"), "{}", printed);
        assert!(printed.ends_with("{{$_hugo_dot.Set (1)}}{{end}}"), "{}", printed);
    }

    #[test]
    fn test_return_inside_branch() {
        let mut set = TemplateSet::new();
        let id = set
            .add_template(
                "partials/r.html",
                "{{ if .Arg }}{{ return .Arg }}{{ else }}none{{ end }}",
            )
            .unwrap();

        transform(&mut set, "partials/r.html");

        assert_eq!(
            set.get(id).root().to_string(),
            "{{$_hugo_dot := $}}{{$ := .Arg}}{{range (slice .Arg)}}{{if .Arg}}{{else}}none{{end}}{{$_hugo_dot.Set (.Arg)}}{{end}}"
        );
    }

    #[test]
    fn test_return_expression_dependencies_are_collected() {
        let mut set = TemplateSet::new();
        let helper = set.add_template("partials/helper.html", "h").unwrap();
        let id = set
            .add_template("partials/r.html", r#"{{ return (partial "helper" .) }}"#)
            .unwrap();

        transform(&mut set, "partials/r.html");

        assert!(set.get(id).dependencies().contains(&helper));
        assert!(set.get(id).parse_info.has_return);
    }

    #[test]
    fn test_return_in_non_partial_is_kept() {
        let mut set = TemplateSet::new();
        let id = set.add_template("page.html", "{{ return 1 }}").unwrap();
        transform(&mut set, "page.html");
        assert_eq!(set.get(id).root().to_string(), "{{return 1}}");
        assert!(!set.get(id).parse_info.has_return);
    }

    #[test]
    fn test_config_error_does_not_stop_the_pass() {
        let mut set = TemplateSet::new();
        let id = set
            .add_template_with_kind(
                "odd.html",
                TemplateKind::Shortcode,
                r#"{{ $_hugo_config := `{` }}{{ .Inner }}"#,
            )
            .unwrap();

        let ctx = transform(&mut set, "odd.html");

        assert!(matches!(ctx.error(), Some(TransformError::ConfigDecode { .. })));
        // The rest of the pass still ran.
        assert!(set.get(id).parse_info.is_inner);
    }

    // ============================================================================
    // Sub-templates
    // ============================================================================

    #[test]
    fn test_dependencies_found_through_sub_templates() {
        let mut set = TemplateSet::new();
        let card = set.add_template("partials/card.html", "card").unwrap();
        let page = set
            .add_template(
                "page.html",
                r#"{{ define "body" }}{{ partial "card" . }}{{ end }}{{ template "body" . }}"#,
            )
            .unwrap();

        let ctx = transform(&mut set, "page.html");

        assert!(ctx.visited("body"));
        assert!(set.get(page).dependencies().contains(&card));
        // The invoked tree is handed back.
        assert_eq!(set.by_name("body").unwrap().root().to_string(), r#"{{partial "card" .}}"#);
    }

    #[test]
    fn test_missing_sub_template_is_deferred() {
        let mut set = TemplateSet::new();
        set.add_template("page.html", r#"{{ template "later" }}"#).unwrap();
        let ctx = transform(&mut set, "page.html");
        assert!(ctx.templates_not_found().contains("later"));
    }

    #[test]
    fn test_self_invocation_terminates() {
        let mut set = TemplateSet::new();
        let id = set
            .add_template("loop.html", r#"x{{ template "loop.html" . }}"#)
            .unwrap();
        transform(&mut set, "loop.html");
        assert_eq!(set.get(id).root().to_string(), r#"x{{template "loop.html" .}}"#);
    }
}
