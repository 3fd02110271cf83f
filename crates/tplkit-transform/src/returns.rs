/*
 * returns.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Partial return statements.
//!
//! A partial may end its work with `{{ return expr }}`. The engine only
//! renders text, so the pass removes the return command and wraps the body
//! in a construct that stores the value of `expr` on the carrier the caller
//! passes as dot:
//!
//! ```text
//! {{ $_hugo_dot := $ }}{{ $ := .Arg }}{{ range (slice .Arg) }}BODY{{ $_hugo_dot.Set (expr) }}{{ end }}
//! ```
//!
//! `range` over a one-element slice rebinds dot to the partial's argument for
//! exactly one iteration, even when the argument is falsy.

use crate::context::TransformContext;
use crate::options::TransformOptions;
use once_cell::sync::Lazy;
use tplkit_template::{
    ActionNode, Arg, BranchNode, CommandNode, ListNode, Node, PipeNode, TemplateKind, parse,
};

const PARTIAL_RETURN_WRAPPER_NAME: &str = "_internal/partial-return-wrapper";

const PARTIAL_RETURN_WRAPPER: &str = r#"{{ $_hugo_dot := $ }}{{ $ := .Arg }}{{ range (slice .Arg) }}{{ $_hugo_dot.Set ("PLACEHOLDER") }}{{ end }}"#;

/// The wrapper template taken apart into the pieces a wrapped tree is
/// assembled from. Built on first use, read-only afterwards.
static RETURN_WRAPPER: Lazy<ReturnWrapper> = Lazy::new(|| {
    let parsed = parse(PARTIAL_RETURN_WRAPPER_NAME, PARTIAL_RETURN_WRAPPER)
        .expect("Invalid partial return wrapper template - this is a bug in tplkit");
    ReturnWrapper::from_tree(parsed.root)
        .expect("Unexpected partial return wrapper shape - this is a bug in tplkit")
});

struct ReturnWrapper {
    /// `$_hugo_dot := $` and `$ := .Arg`
    prelude: Vec<Node>,
    /// `(slice .Arg)`
    range_pipe: PipeNode,
    /// `$_hugo_dot.Set`
    set_target: Arg,
}

impl ReturnWrapper {
    fn from_tree(root: ListNode) -> Option<Self> {
        let mut nodes = root.nodes.into_iter();
        let save_dot = nodes.next()?;
        let rebind_root = nodes.next()?;
        let Some(Node::Range(range)) = nodes.next() else {
            return None;
        };
        let Some(Node::Action(set)) = range.list.nodes.into_iter().next() else {
            return None;
        };
        let set_target = set.pipe.cmds.into_iter().next()?.args.into_iter().next()?;

        Some(Self {
            prelude: vec![save_dot, rebind_root],
            range_pipe: range.pipe,
            set_target,
        })
    }

    fn wrap(&self, body: ListNode, return_cmd: CommandNode) -> ListNode {
        let set = Node::Action(ActionNode {
            pipe: PipeNode::from_command(CommandNode::new(vec![
                self.set_target.clone(),
                Arg::Pipe(PipeNode::from_command(return_cmd)),
            ])),
        });

        let mut range_body = body.nodes;
        range_body.push(set);

        let mut nodes = self.prelude.clone();
        nodes.push(Node::Range(BranchNode {
            pipe: self.range_pipe.clone(),
            list: ListNode::new(range_body),
            else_list: None,
        }));
        ListNode::new(nodes)
    }
}

/// Wrap a partial's body so that executing it stores the value of
/// `return_cmd` on the carrier passed as dot.
pub fn wrap_in_partial_return_wrapper(body: ListNode, return_cmd: CommandNode) -> ListNode {
    RETURN_WRAPPER.wrap(body, return_cmd)
}

/// Whether `cmd` is a return statement the pass should capture.
///
/// Only the first one in a partial counts; `cmd` must have the return keyword
/// followed by at least one argument.
pub(crate) fn is_return_command(
    cmd: &CommandNode,
    ctx: &TransformContext,
    options: &TransformOptions,
) -> bool {
    if ctx.kind() != TemplateKind::Partial || ctx.return_node.is_some() {
        return false;
    }
    matches!(
        cmd.args.as_slice(),
        [Arg::Identifier(keyword), _, ..] if *keyword == options.return_keyword
    )
}

/// Take a return command out of the tree, leaving an empty command in its
/// place, and strip the keyword. The caller drops the empty command.
pub(crate) fn take_return_expression(cmd: &mut CommandNode) -> CommandNode {
    let mut captured = std::mem::take(cmd);
    captured.args.remove(0);
    captured
}
