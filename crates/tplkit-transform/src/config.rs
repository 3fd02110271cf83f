/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Shortcode config literals.
//!
//! A shortcode may open with a declaration of structured config:
//!
//! ```text
//! {{ $_hugo_config := `{ "version": 1 }` }}
//! ```
//!
//! Only the first pipeline of the template is considered, and only once.

use crate::context::TransformContext;
use crate::error::TransformError;
use crate::options::TransformOptions;
use tplkit_template::{Arg, PipeNode, TemplateConfig, TemplateKind, TemplateSet};
use tracing::{trace, warn};

/// Decode the text of a config literal.
///
/// The text must be a JSON object; `version` is coerced to an integer.
pub fn decode_config(text: &str) -> Result<TemplateConfig, serde_json::Error> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;
    serde_json::from_value(serde_json::Value::Object(map))
}

/// Offer a pipeline to the config extractor.
///
/// The first call for a shortcode marks the check as done whatever the
/// outcome; later calls return immediately.
pub(crate) fn collect_config(
    pipe: &PipeNode,
    ctx: &mut TransformContext,
    templates: &mut TemplateSet,
    options: &TransformOptions,
) {
    if ctx.kind() != TemplateKind::Shortcode || ctx.config_checked {
        return;
    }
    ctx.config_checked = true;

    let ([var], [cmd]) = (pipe.decl.as_slice(), pipe.cmds.as_slice()) else {
        return;
    };
    if var.ident.first() != Some(&options.config_variable) {
        return;
    }
    let [Arg::String(literal)] = cmd.args.as_slice() else {
        return;
    };

    let template = templates.get_mut(ctx.template());
    match decode_config(&literal.text) {
        Ok(config) => {
            trace!(template = template.name(), ?config, "decoded config literal");
            template.parse_info.config = Some(config);
        }
        Err(source) => {
            warn!(template = template.name(), error = %source, "failed to decode config literal");
            let err = TransformError::ConfigDecode {
                template: template.name().to_string(),
                variable: options.config_variable.clone(),
                source,
            };
            ctx.record_error(err);
        }
    }
}
