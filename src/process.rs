//! External tool invocation
//!
//! Every collaborator process (sadf, last, gnuplot, optipng, free, sendmail)
//! is run through the single [`ToolRunner`] capability: feed optional stdin,
//! capture stdout, fail on nonzero exit. The pipeline logic above never
//! touches `std::process` directly, which keeps it testable with a fake
//! runner.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Errors from running an external tool
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool could not be started at all
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// I/O on the tool's pipes failed
    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },

    /// The tool ran but exited with a nonzero status
    #[error("{program} exited with {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Run an external tool, feed it text, capture its stdout, fail on nonzero exit
pub trait ToolRunner {
    fn run(&self, program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>, ToolError>;
}

/// [`ToolRunner`] backed by `std::process::Command`, blocking until exit
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>, ToolError> {
        tracing::debug!("Running {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if let Some(input) = stdin {
            let mut pipe = child.stdin.take().expect("stdin was requested piped");
            pipe.write_all(input).map_err(|source| ToolError::Io {
                program: program.to_string(),
                source,
            })?;
            // Dropping the pipe closes it so the child sees EOF.
        }

        let output = child.wait_with_output().map_err(|source| ToolError::Io {
            program: program.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(ToolError::NonZeroExit {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Locate an executable on `PATH`, like `which`
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_runner_captures_stdout() {
        let output = SystemRunner.run("echo", &["hello"], None).unwrap();
        assert_eq!(String::from_utf8(output).unwrap().trim(), "hello");
    }

    #[test]
    fn test_system_runner_feeds_stdin() {
        let output = SystemRunner.run("cat", &[], Some(b"piped in")).unwrap();
        assert_eq!(output, b"piped in");
    }

    #[test]
    fn test_system_runner_nonzero_exit_is_an_error() {
        let err = SystemRunner.run("false", &[], None).unwrap_err();
        assert!(matches!(err, ToolError::NonZeroExit { .. }));
    }

    #[test]
    fn test_system_runner_missing_program_is_spawn_error() {
        let err = SystemRunner
            .run("definitely-not-a-real-tool", &[], None)
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[test]
    fn test_find_in_path_locates_sh() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("definitely-not-a-real-tool").is_none());
    }

    #[test]
    fn test_fake_runner_records_and_replays() {
        let runner = testing::FakeRunner::new();
        runner.respond("sadf", b"row1\nrow2\n".to_vec());

        let out = runner.run("sadf", &["-d", "-U"], None).unwrap();
        assert_eq!(out, b"row1\nrow2\n");

        let out = runner.run("sadf", &[], None).unwrap();
        assert!(out.is_empty());

        assert_eq!(runner.programs_run(), vec!["sadf", "sadf"]);
        assert_eq!(runner.calls.borrow()[0].args, vec!["-d", "-U"]);
    }
}
