/*
 * convert.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `tplkit convert`: run one content file through pandoc.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tplkit_pandoc::{CommandRunner, DocumentContext, PandocConverter, PandocOptions};
use tracing::info;

pub fn execute(input: &Path, output: Option<&Path>, options: PandocOptions) -> Result<()> {
    let converter = PandocConverter::new(options);
    let html = convert_file(&converter, input)?;

    match output {
        Some(path) => {
            std::fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&html)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub fn convert_file<R: CommandRunner>(
    converter: &PandocConverter<R>,
    input: &Path,
) -> Result<Vec<u8>> {
    let source =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let name = input.file_name().map_or_else(
        || input.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    );
    let ctx = DocumentContext {
        filename: Some(input.to_path_buf()),
        ..DocumentContext::named(name)
    };

    converter
        .convert(&source, &ctx)
        .with_context(|| format!("Failed to convert {}", input.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::path::PathBuf;
    use tplkit_pandoc::CommandOutput;

    /// Runner with no pandoc installed.
    struct NoPandoc;

    impl CommandRunner for NoPandoc {
        fn find_binary(&self, _name: &str, _env_var: &str) -> Option<PathBuf> {
            None
        }

        fn run(
            &self,
            _program: &Path,
            _args: &[&str],
            _stdin: Option<&[u8]>,
        ) -> io::Result<CommandOutput> {
            Err(io::Error::other("should not run"))
        }
    }

    #[test]
    fn test_missing_pandoc_returns_source() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("post.md");
        std::fs::write(&input, "# Title\n").unwrap();

        let converter = PandocConverter::with_runner(NoPandoc, PandocOptions::default());
        let output = convert_file(&converter, &input).unwrap();

        assert_eq!(output, b"# Title\n".to_vec());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter = PandocConverter::with_runner(NoPandoc, PandocOptions::default());

        let err = convert_file(&converter, &dir.path().join("gone.md")).unwrap_err();
        assert!(err.to_string().contains("gone.md"));
    }
}
