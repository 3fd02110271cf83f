/*
 * converter.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Content conversion through an external `pandoc` binary.

use crate::error::{ConvertError, ConvertResult};
use crate::runner::{CommandRunner, NativeRunner};
use crate::version::{MIN_CITATIONS_VERSION, PandocVersion};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the converter binary looked up on `PATH`.
pub const PANDOC_BINARY: &str = "pandoc";

/// Environment variable that may point at the binary.
pub const PANDOC_ENV_VAR: &str = "TPLKIT_PANDOC";

/// Converter configuration.
///
/// ```yaml
/// binary: /opt/pandoc/bin/pandoc
/// extra-args: ["--wrap=none"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PandocOptions {
    /// Explicit binary path. Overrides the environment and `PATH`.
    pub binary: Option<PathBuf>,
    /// Appended after the built-in arguments.
    pub extra_args: Vec<String>,
}

/// The document a piece of content belongs to. Used in diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContext {
    pub document_id: String,
    pub document_name: String,
    pub filename: Option<PathBuf>,
}

impl DocumentContext {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            document_name: name.into(),
            ..Self::default()
        }
    }
}

/// Converts markup to HTML with `pandoc`.
///
/// The binary location and its version are probed once and cached for the
/// lifetime of the converter.
pub struct PandocConverter<R: CommandRunner = NativeRunner> {
    runner: R,
    options: PandocOptions,
    binary: OnceCell<Option<PathBuf>>,
    version: OnceCell<ConvertResult<PandocVersion>>,
}

impl PandocConverter<NativeRunner> {
    pub fn new(options: PandocOptions) -> Self {
        Self::with_runner(NativeRunner, options)
    }
}

impl<R: CommandRunner> PandocConverter<R> {
    pub fn with_runner(runner: R, options: PandocOptions) -> Self {
        Self {
            runner,
            options,
            binary: OnceCell::new(),
            version: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &PandocOptions {
        &self.options
    }

    /// Path of the binary, if one is available.
    pub fn binary(&self) -> Option<&Path> {
        self.binary
            .get_or_init(|| match &self.options.binary {
                Some(path) => Some(path.clone()),
                None => self.runner.find_binary(PANDOC_BINARY, PANDOC_ENV_VAR),
            })
            .as_deref()
    }

    /// Whether the binary is available at all.
    pub fn supports(&self) -> bool {
        self.binary().is_some()
    }

    /// The binary's version. Probed on first call; later calls return the
    /// same value or error.
    pub fn version(&self) -> ConvertResult<PandocVersion> {
        self.version.get_or_init(|| self.probe_version()).clone()
    }

    fn probe_version(&self) -> ConvertResult<PandocVersion> {
        let binary = self.binary().ok_or_else(|| ConvertError::BinaryNotFound {
            name: PANDOC_BINARY.to_string(),
        })?;
        let output = self
            .runner
            .run(binary, &["--version"], None)
            .map_err(|e| ConvertError::Spawn {
                program: binary.to_path_buf(),
                message: e.to_string(),
            })?;
        if !output.success() {
            return Err(ConvertError::Process {
                program: binary.display().to_string(),
                document: "--version".to_string(),
                code: output.code,
                stderr: output.stderr_string(),
            });
        }
        let version = PandocVersion::parse_version_output(&output.stdout_string())?;
        debug!(%version, binary = %binary.display(), "Detected pandoc");
        Ok(version)
    }

    /// Whether `--citeproc` can be passed: the binary exists and is at least
    /// version 2.11.
    pub fn supports_citations(&self) -> bool {
        if !self.supports() {
            return false;
        }
        match self.version() {
            Ok(version) => version.greater_than_or_equal(MIN_CITATIONS_VERSION),
            Err(err) => {
                warn!(error = %err, "Could not determine pandoc version");
                false
            }
        }
    }

    /// Arguments for a conversion run.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["--mathjax".to_string()];
        if self.supports_citations() {
            args.push("--citeproc".to_string());
        }
        args.extend(self.options.extra_args.iter().cloned());
        args
    }

    /// Convert `src` to HTML.
    ///
    /// Without a binary the source is returned unchanged, with a warning.
    pub fn convert(&self, src: &[u8], ctx: &DocumentContext) -> ConvertResult<Vec<u8>> {
        let Some(binary) = self.binary() else {
            warn!(
                document = %ctx.document_name,
                "pandoc not found in $PATH: Please install. Leaving pandoc content unrendered."
            );
            return Ok(src.to_vec());
        };

        let args = self.args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!(document = %ctx.document_name, args = ?args, "Running pandoc");

        let output = self
            .runner
            .run(binary, &arg_refs, Some(src))
            .map_err(|e| ConvertError::Spawn {
                program: binary.to_path_buf(),
                message: e.to_string(),
            })?;
        if !output.success() {
            return Err(ConvertError::Process {
                program: binary.display().to_string(),
                document: ctx.document_name.clone(),
                code: output.code,
                stderr: output.stderr_string().trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
