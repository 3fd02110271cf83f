/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The `--config` file.
//!
//! ```yaml
//! transform:
//!   default-extension: ".html"
//! pandoc:
//!   extra-args: ["--wrap=none"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tplkit_pandoc::PandocOptions;
use tplkit_transform::TransformOptions;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TplkitConfig {
    pub transform: TransformOptions,
    pub pandoc: PandocOptions,
}

impl TplkitConfig {
    /// Load the config file, or the defaults when no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_is_default() {
        let config = TplkitConfig::parse("  \n").unwrap();
        assert_eq!(config.transform, TransformOptions::default());
        assert_eq!(config.pandoc, PandocOptions::default());
    }

    #[test]
    fn test_sections() {
        let config = TplkitConfig::parse(
            "transform:\n  default-extension: .txt\npandoc:\n  extra-args: [\"--wrap=none\"]\n",
        )
        .unwrap();
        assert_eq!(config.transform.default_extension, ".txt");
        assert_eq!(config.transform.return_keyword, "return");
        assert_eq!(config.pandoc.extra_args, vec!["--wrap=none".to_string()]);
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(TplkitConfig::parse("render: {}\n").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TplkitConfig::load(Some(&dir.path().join("nope.yml"))).unwrap_err();
        assert!(err.to_string().contains("nope.yml"));
    }
}
