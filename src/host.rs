//! Host properties feeding chart display policies
//!
//! Two probes run once per report: total RAM in MB (upper bound of the
//! memory chart) and the fastest non-loopback link speed in Mb/s (soft upper
//! bound of the network chart).

use std::path::Path;

use thiserror::Error;

use crate::process::{ToolError, ToolRunner};

/// Default sysfs tree holding per-interface speed files
pub const SYS_NET_DIR: &str = "/sys/class/net";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("memory probe failed: {0}")]
    MemoryProbe(#[from] ToolError),

    #[error("could not parse `free` output: {0:?}")]
    MemoryFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No interface under the sysfs tree reported a usable speed
    #[error("no network interface speed readable under {0}")]
    NoInterfaceSpeed(String),
}

/// Host values consumed by the display policies
#[derive(Debug, Clone, Copy)]
pub struct HostInfo {
    pub total_memory_mb: u64,
    pub max_link_speed_mbps: u64,
}

/// Run both probes
pub fn probe(runner: &dyn ToolRunner, sys_net_dir: &Path) -> Result<HostInfo, HostError> {
    Ok(HostInfo {
        total_memory_mb: total_memory_mb(runner)?,
        max_link_speed_mbps: max_link_speed_mbps(sys_net_dir)?,
    })
}

/// Total system RAM in MB, from the second field of `free -m`'s `Mem:` line
pub fn total_memory_mb(runner: &dyn ToolRunner) -> Result<u64, HostError> {
    let output = runner.run("free", &["-m"], None)?;
    let text = String::from_utf8_lossy(&output);
    let mem_line = text
        .lines()
        .find(|line| line.starts_with("Mem:"))
        .ok_or_else(|| HostError::MemoryFormat(text.to_string()))?;
    let total = mem_line
        .split_whitespace()
        .nth(1)
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| HostError::MemoryFormat(mem_line.to_string()))?;
    tracing::info!("Total amount of memory: {} MB", total);
    Ok(total)
}

/// Maximum non-loopback interface speed in Mb/s.
///
/// Interfaces whose speed file is missing or unreadable (links that are down
/// report EINVAL) are skipped; only an empty result is an error.
pub fn max_link_speed_mbps(sys_net_dir: &Path) -> Result<u64, HostError> {
    let mut max_speed: Option<u64> = None;
    for entry in std::fs::read_dir(sys_net_dir)? {
        let entry = entry?;
        if entry.file_name() == "lo" {
            continue;
        }
        let speed_file = entry.path().join("speed");
        let speed = match std::fs::read_to_string(&speed_file) {
            Ok(contents) => match contents.trim().parse::<i64>() {
                Ok(speed) if speed > 0 => speed as u64,
                _ => continue,
            },
            Err(_) => continue,
        };
        tracing::debug!(
            "Speed of interface {}: {} Mb/s",
            entry.file_name().to_string_lossy(),
            speed
        );
        max_speed = Some(max_speed.map_or(speed, |current| current.max(speed)));
    }
    let max_speed = max_speed
        .ok_or_else(|| HostError::NoInterfaceSpeed(sys_net_dir.display().to_string()))?;
    tracing::info!("Maximum interface speed: {} Mb/s", max_speed);
    Ok(max_speed)
}
