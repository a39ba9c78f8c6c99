//! # sysstat-report
//!
//! Generates periodic (daily/weekly/monthly) system-performance reports from
//! the on-disk sysstat accounting logs and delivers them as a multipart
//! email with inline gnuplot charts and fixed-width text alternatives.
//!
//! ## Pipeline
//!
//! - [`window`]: resolve which calendar dates the report covers
//! - [`segments`]: locate each day's accounting segment, decompressing
//!   archives into scratch storage
//! - [`extract`]: run the accounting reader per segment per metric family
//!   and concatenate the delimited output (network tables split per
//!   interface)
//! - [`reboot`]: collect machine-restart timestamps from the login logs
//! - [`chart`]: build and render one gnuplot script per family and output
//!   kind
//! - [`mail`]: assemble the multipart message and hand it to sendmail
//! - [`report`]: sequential orchestration of the above
//!
//! External tools (`sadf`, `last`, `gnuplot`, `optipng`, `free`, `sendmail`)
//! are all invoked through the [`process::ToolRunner`] capability so the
//! pipeline stays testable without any of them installed.

pub mod chart;
pub mod extract;
pub mod host;
pub mod mail;
pub mod metrics;
pub mod process;
pub mod reboot;
pub mod report;
pub mod segments;
pub mod window;

pub use chart::{ChartError, ChartInput, OutputKind, Plotter};
pub use extract::{ExtractError, ExtractedTable};
pub use host::{HostError, HostInfo};
pub use mail::MailError;
pub use metrics::{ColumnLayout, MetricFamily, SeriesColumn, YRange};
pub use process::{SystemRunner, ToolError, ToolRunner};
pub use reboot::RebootError;
pub use report::{ReportError, ReportOptions};
pub use segments::{SegmentError, SegmentRef, SegmentStore};
pub use window::{ReportKind, ReportWindow};
