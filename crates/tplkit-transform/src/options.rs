/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Configuration for the transformation pass.

use serde::{Deserialize, Serialize};
use tplkit_template::{DEFAULT_PARTIAL_EXTENSION, DEFAULT_PARTIAL_NAMESPACE};

/// Reserved names and naming rules used by the pass.
///
/// Every field has a default, so an empty config document yields
/// [`TransformOptions::default`]. Keys are kebab-case:
///
/// ```yaml
/// partial-namespace: "partials/"
/// default-extension: ".html"
/// return-keyword: "return"
/// config-variable: "$_hugo_config"
/// inner-identifier: "Inner"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransformOptions {
    /// Prefix under which partials are registered.
    pub partial_namespace: String,
    /// Appended to partial names given without an extension.
    pub default_extension: String,
    /// Leading identifier of a partial's return command.
    pub return_keyword: String,
    /// Variable a shortcode declares its config literal into.
    pub config_variable: String,
    /// Field that denotes a shortcode's enclosed content.
    pub inner_identifier: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            partial_namespace: DEFAULT_PARTIAL_NAMESPACE.to_string(),
            default_extension: DEFAULT_PARTIAL_EXTENSION.to_string(),
            return_keyword: "return".to_string(),
            config_variable: "$_hugo_config".to_string(),
            inner_identifier: "Inner".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_fills_defaults() {
        let options: TransformOptions =
            serde_json::from_value(serde_json::json!({"default-extension": ".txt"})).unwrap();
        assert_eq!(options.default_extension, ".txt");
        assert_eq!(options.partial_namespace, "partials/");
        assert_eq!(options.return_keyword, "return");
    }

    #[test]
    fn test_empty_document_is_default() {
        let options: TransformOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(options, TransformOptions::default());
    }
}
