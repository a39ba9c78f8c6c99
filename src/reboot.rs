//! Reboot marker collection
//!
//! Machine restarts are drawn as vertical reference lines on every chart.
//! They come from the login-accounting logs: the rotated generation first
//! (oldest data), then the current one, each filtered to boot events via the
//! login-history reader.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

use crate::process::{ToolError, ToolRunner};

/// Current login-accounting log; the previous generation carries a `.1` suffix
pub const WTMP_PATH: &str = "/var/log/wtmp";

#[derive(Debug, Error)]
pub enum RebootError {
    #[error("login-history reader failed on {path:?}: {source}")]
    Reader {
        path: PathBuf,
        source: ToolError,
    },

    #[error("unparseable boot line: {line:?}")]
    Parse { line: String },
}

/// Collect boot timestamps from the rotated and current logs, oldest log
/// first. A missing log file is skipped, not an error.
///
/// The boot-line format omits the year, so every timestamp is assumed to be
/// in `year` (the caller passes the current one). A reboot that actually
/// happened in a different year is silently mis-dated; this is a documented
/// limitation of the source format.
pub fn collect(
    runner: &dyn ToolRunner,
    wtmp: &Path,
    year: i32,
) -> Result<Vec<NaiveDateTime>, RebootError> {
    let boot_line = Regex::new(r".*boot\s*(.*) - .*$").expect("pattern is valid");
    let mut markers = Vec::new();

    for generation in (0..=1).rev() {
        let path = if generation == 0 {
            wtmp.to_path_buf()
        } else {
            let mut rotated = wtmp.as_os_str().to_os_string();
            rotated.push(format!(".{}", generation));
            PathBuf::from(rotated)
        };
        if !path.is_file() {
            tracing::debug!("No login log at {:?}, skipping", path);
            continue;
        }

        let path_arg = path.to_string_lossy();
        let output = runner
            .run("last", &["-R", "reboot", "-f", &path_arg], None)
            .map_err(|source| RebootError::Reader {
                path: path.clone(),
                source,
            })?;
        let text = String::from_utf8_lossy(&output);

        // The reader ends with a 2-line summary footer.
        let lines: Vec<&str> = text.lines().collect();
        let body = &lines[..lines.len().saturating_sub(2)];
        for line in body {
            let captured = boot_line
                .captures(line)
                .and_then(|caps| caps.get(1))
                .ok_or_else(|| RebootError::Parse {
                    line: line.to_string(),
                })?
                .as_str();
            markers.push(parse_boot_timestamp(captured, year)?);
        }
    }

    tracing::info!("Found {} reboot markers", markers.len());
    Ok(markers)
}

/// Parse the timestamp portion of a boot line.
///
/// The last three fields are always `<month> <day> <HH:MM>`; everything
/// before them (weekday, and on some systems a kernel version column) is
/// ignored rather than validated, so a wrong year assumption mis-dates the
/// marker instead of failing the run.
fn parse_boot_timestamp(captured: &str, year: i32) -> Result<NaiveDateTime, RebootError> {
    let fields: Vec<&str> = captured.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(RebootError::Parse {
            line: captured.to_string(),
        });
    }
    let stamp = format!(
        "{} {} {} {}",
        fields[fields.len() - 3],
        fields[fields.len() - 2],
        fields[fields.len() - 1],
        year
    );
    NaiveDateTime::parse_from_str(&stamp, "%b %d %H:%M %Y").map_err(|_| RebootError::Parse {
        line: captured.to_string(),
    })
}
