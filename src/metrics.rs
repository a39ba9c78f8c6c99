//! Metric families and their display policies
//!
//! Each family of accounting metrics (CPU, memory, swap, network, block I/O)
//! carries a fixed contract with the accounting reader: the selector flags
//! passed to `sadf`, the positions of the timestamp and series fields in its
//! delimited output, and how the values are labelled, ranged and
//! unit-converted on charts. The column numbers are the 1-based field
//! numbers used verbatim in the plotting engine's `using` clauses; they are
//! a versioned external contract and must never be inferred from the data.

use crate::host::HostInfo;

/// A closed set: the five metric families every report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    Cpu,
    Memory,
    Swap,
    Network,
    Io,
}

/// One plotted series: its field number and legend name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesColumn {
    /// 1-based field number in the accounting reader's delimited output
    pub column: usize,
    pub name: &'static str,
}

/// Fixed column contract of a family's selector output
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    /// 1-based field number of the epoch timestamp
    pub timestamp: usize,
    pub series: &'static [SeriesColumn],
}

/// Y-axis range policy for a family's charts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YRange {
    /// Both bounds fixed
    Fixed(u64, u64),
    /// Lower bound fixed, upper bound autoscaled
    OpenUpper(u64),
    /// Lower bound fixed, upper bound at least the given value but allowed
    /// to grow (`N<*` in the chart script)
    AtLeast(u64, u64),
}

const fn series(column: usize, name: &'static str) -> SeriesColumn {
    SeriesColumn { column, name }
}

const CPU_SERIES: &[SeriesColumn] = &[
    series(5, "user"),
    series(6, "nice"),
    series(7, "system"),
    series(8, "iowait"),
    series(9, "steal"),
    series(10, "idle"),
];

const MEMORY_SERIES: &[SeriesColumn] = &[
    series(5, "used"),
    series(7, "buffers"),
    series(8, "cached"),
    series(9, "commit"),
    series(11, "active"),
    series(13, "dirty"),
];

const SWAP_SERIES: &[SeriesColumn] = &[series(6, "swpused")];

const NETWORK_SERIES: &[SeriesColumn] = &[series(7, "rx"), series(8, "tx")];

const IO_SERIES: &[SeriesColumn] = &[series(7, "read"), series(8, "written")];

impl MetricFamily {
    /// All families, in report order
    pub fn all() -> &'static [MetricFamily] {
        &[
            MetricFamily::Cpu,
            MetricFamily::Memory,
            MetricFamily::Swap,
            MetricFamily::Network,
            MetricFamily::Io,
        ]
    }

    /// Lowercase name used for scratch artifact filenames
    pub fn slug(&self) -> &'static str {
        match self {
            MetricFamily::Cpu => "cpu",
            MetricFamily::Memory => "memory",
            MetricFamily::Swap => "swap",
            MetricFamily::Network => "network",
            MetricFamily::Io => "io",
        }
    }

    /// Selector flags passed to the accounting reader for this family
    pub fn selector_args(&self) -> &'static [&'static str] {
        match self {
            MetricFamily::Cpu => &["-u"],
            MetricFamily::Memory => &["-r"],
            MetricFamily::Swap => &["-S"],
            MetricFamily::Network => &["-n", "DEV"],
            MetricFamily::Io => &["-b"],
        }
    }

    /// The family's fixed column contract
    pub fn layout(&self) -> ColumnLayout {
        let series = match self {
            MetricFamily::Cpu => CPU_SERIES,
            MetricFamily::Memory => MEMORY_SERIES,
            MetricFamily::Swap => SWAP_SERIES,
            MetricFamily::Network => NETWORK_SERIES,
            MetricFamily::Io => IO_SERIES,
        };
        ColumnLayout {
            timestamp: 3,
            series,
        }
    }

    /// Whether the selector output is partitioned per network interface
    pub fn split_per_interface(&self) -> bool {
        matches!(self, MetricFamily::Network)
    }

    pub fn title(&self) -> &'static str {
        match self {
            MetricFamily::Cpu => "CPU",
            MetricFamily::Memory => "Memory",
            MetricFamily::Swap => "Swap",
            MetricFamily::Network => "Network",
            MetricFamily::Io => "IO",
        }
    }

    pub fn y_label(&self) -> &'static str {
        match self {
            MetricFamily::Cpu => "CPU usage (%)",
            MetricFamily::Memory => "Memory used (MB)",
            MetricFamily::Swap => "Swap usage (%)",
            MetricFamily::Network => "Bandwidth (Mb/s)",
            MetricFamily::Io => "Activity (MB/s)",
        }
    }

    /// Y-axis range, derived from host properties where the family needs them
    pub fn y_range(&self, host: &HostInfo) -> YRange {
        match self {
            MetricFamily::Cpu | MetricFamily::Swap => YRange::Fixed(0, 100),
            MetricFamily::Memory => YRange::Fixed(0, host.total_memory_mb),
            MetricFamily::Network => YRange::AtLeast(0, host.max_link_speed_mbps),
            MetricFamily::Io => YRange::OpenUpper(0),
        }
    }

    /// Plot value expression for a series field, with the family's unit
    /// conversion applied (KB→MB, KB/s→Mb/s, blocks/s→MB/s)
    pub fn value_expr(&self, column: usize) -> String {
        match self {
            MetricFamily::Memory => format!("(${}/1000)", column),
            MetricFamily::Network => format!("(${}/125)", column),
            MetricFamily::Io => format!("(${}*512/1000000)", column),
            MetricFamily::Cpu | MetricFamily::Swap => column.to_string(),
        }
    }
}

impl std::fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}
