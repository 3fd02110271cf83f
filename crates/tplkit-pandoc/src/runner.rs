/*
 * runner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Process execution seam.
//!
//! The converter never spawns processes directly; it goes through a
//! [`CommandRunner`] so tests can substitute a scripted one.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Output from a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 if killed by a signal)
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Lossy UTF-8 view of stdout.
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Lossy UTF-8 view of stderr.
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

pub trait CommandRunner {
    /// Find a binary by checking an environment variable first, then `PATH`.
    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf>;

    /// Run `program` to completion, feeding `stdin` if given.
    fn run(&self, program: &Path, args: &[&str], stdin: Option<&[u8]>)
    -> io::Result<CommandOutput>;
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl CommandRunner for NativeRunner {
    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        if let Ok(value) = std::env::var(env_var) {
            let path = PathBuf::from(value);
            if path.is_file() {
                return Some(path);
            }
        }
        which::which(name).ok()
    }

    fn run(
        &self,
        program: &Path,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> io::Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
            // Dropping the pipe closes it so the child sees EOF.
        }

        let output = child.wait_with_output()?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_helpers() {
        let output = CommandOutput {
            code: 0,
            stdout: b"hello".to_vec(),
            stderr: b"warn".to_vec(),
        };
        assert!(output.success());
        assert_eq!(output.stdout_string(), "hello");
        assert_eq!(output.stderr_string(), "warn");
    }

    #[test]
    fn test_command_output_failure() {
        let output = CommandOutput {
            code: 2,
            ..CommandOutput::default()
        };
        assert!(!output.success());
    }

    #[test]
    fn test_env_override_must_be_a_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory is not a usable binary; falls through to PATH lookup.
        let var = "TPLKIT_TEST_MISSING_TOOL";
        // SAFETY: test-local variable name, not read by other tests.
        unsafe { std::env::set_var(var, dir.path()) };
        assert_eq!(
            NativeRunner.find_binary("tplkit-no-such-binary", var),
            None
        );

        let bin = dir.path().join("tool");
        std::fs::write(&bin, "").unwrap();
        unsafe { std::env::set_var(var, &bin) };
        assert_eq!(
            NativeRunner.find_binary("tplkit-no-such-binary", var),
            Some(bin)
        );
        unsafe { std::env::remove_var(var) };
    }
}
