/*
 * inner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Detect shortcodes that use their enclosed content (`.Inner`).

use crate::context::TransformContext;
use crate::options::TransformOptions;
use tplkit_template::{Arg, CommandNode, TemplateKind, TemplateSet};
use tracing::trace;

pub(crate) fn collect_inner(
    cmd: &CommandNode,
    ctx: &TransformContext,
    templates: &mut TemplateSet,
    options: &TransformOptions,
) {
    if ctx.kind() != TemplateKind::Shortcode {
        return;
    }
    let template = templates.get_mut(ctx.template());
    if template.parse_info.is_inner {
        return;
    }

    let references_inner = cmd.args.iter().any(|arg| {
        let idents = match arg {
            Arg::Field(field) => &field.ident,
            Arg::Variable(var) => &var.ident,
            _ => return false,
        };
        idents.iter().any(|ident| *ident == options.inner_identifier)
    });

    if references_inner {
        trace!(template = template.name(), "shortcode uses its inner content");
        template.parse_info.is_inner = true;
    }
}
