//! Metric extraction from accounting segments
//!
//! Invokes the accounting reader (`sadf`) once per segment per family and
//! concatenates the delimited output into a single table in window order.
//! Network tables are additionally partitioned into one sub-table per
//! interface so each interface can be plotted as its own pair of series.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::metrics::MetricFamily;
use crate::process::{ToolError, ToolRunner};
use crate::segments::SegmentRef;

/// Field separator of the accounting reader's `-d` output
const FIELD_SEPARATOR: char = ';';

/// 0-based position of the interface name after splitting a network row
const INTERFACE_FIELD: usize = 3;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The accounting reader failed on a segment; fatal for the family
    #[error("accounting reader failed on {segment:?}: {source}")]
    Reader {
        segment: PathBuf,
        source: ToolError,
    },

    /// A network row did not carry an interface name field
    #[error("malformed network row: {line:?}")]
    MalformedRow { line: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The concatenated table for one metric family
#[derive(Debug)]
pub struct ExtractedTable {
    pub family: MetricFamily,
    pub path: PathBuf,
    /// Interface name → sub-table path in first-seen order; empty for every
    /// family except network
    pub partitions: Vec<(String, PathBuf)>,
}

/// Extract one family's data across all segments into `output`
pub fn extract(
    runner: &dyn ToolRunner,
    family: MetricFamily,
    segments: &[SegmentRef],
    output: &Path,
) -> Result<ExtractedTable, ExtractError> {
    let mut table = OpenOptions::new().create(true).append(true).open(output)?;

    for segment in segments {
        let segment_path = segment.path.to_string_lossy();
        let mut args: Vec<&str> = vec!["-d", "-U", "--"];
        args.extend_from_slice(family.selector_args());
        args.push(&*segment_path);

        let rows = runner
            .run("sadf", &args, None)
            .map_err(|source| ExtractError::Reader {
                segment: segment.path.clone(),
                source,
            })?;
        table.write_all(&rows)?;
    }
    table.flush()?;

    let partitions = if family.split_per_interface() {
        partition_by_interface(output)?
    } else {
        Vec::new()
    };

    Ok(ExtractedTable {
        family,
        path: output.to_path_buf(),
        partitions,
    })
}

/// Split a concatenated network table into one sub-table per interface.
///
/// Rows arrive in contiguous runs per interface. The first time a name is
/// seen its sub-table is created; rows are routed verbatim until a name that
/// already finished its run reappears, which means the underlying log wrapped
/// to a new reporting interval. Partitioning stops there and the remaining
/// rows are dropped — a defined cutoff matching upstream log rotation, not an
/// error.
fn partition_by_interface(table: &Path) -> Result<Vec<(String, PathBuf)>, ExtractError> {
    let reader = BufReader::new(File::open(table)?);
    let mut writers: Vec<(String, BufWriter<File>)> = Vec::new();
    let mut current: Option<usize> = None;

    for line in reader.lines() {
        let line = line?;
        // The reader emits one header per invocation; all start with '#'.
        if line.starts_with('#') {
            continue;
        }
        let interface = line
            .splitn(INTERFACE_FIELD + 2, FIELD_SEPARATOR)
            .nth(INTERFACE_FIELD)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ExtractError::MalformedRow { line: line.clone() })?;

        match current {
            Some(idx) if writers[idx].0 == interface => {
                writeln!(writers[idx].1, "{}", line)?;
            }
            _ => {
                if writers.iter().any(|(name, _)| name == interface) {
                    // Wrap-around: this interface's run already ended.
                    tracing::debug!("Log wrap detected at interface {}, stopping split", interface);
                    break;
                }
                let path = partition_path(table, interface);
                let mut writer = BufWriter::new(File::create(&path)?);
                writeln!(writer, "{}", line)?;
                current = Some(writers.len());
                writers.push((interface.to_string(), writer));
            }
        }
    }

    let mut partitions = Vec::with_capacity(writers.len());
    for (name, mut writer) in writers {
        writer.flush()?;
        partitions.push((name.clone(), partition_path(table, &name)));
    }
    tracing::debug!(
        "Found {} network interfaces: {}",
        partitions.len(),
        partitions
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(partitions)
}

/// Sub-table path for an interface: `network.csv` → `network_eth0.csv`
fn partition_path(table: &Path, interface: &str) -> PathBuf {
    let stem = table
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match table.extension() {
        Some(ext) => format!("{}_{}.{}", stem, interface, ext.to_string_lossy()),
        None => format!("{}_{}", stem, interface),
    };
    table.with_file_name(name)
}
