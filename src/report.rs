//! Report assembly
//!
//! Orchestrates one full run: resolve the window, materialize segments,
//! probe the host, collect reboot markers, then extract and chart every
//! metric family before handing the artifacts to the mailer. Everything is
//! sequential and fatal-on-first-error: a partial report is never sent.
//!
//! All intermediate files live in a single scratch directory acquired here;
//! its `Drop` guarantees recursive deletion on every exit path.

use std::path::PathBuf;

use chrono::{Datelike, Local};
use thiserror::Error;

use crate::chart::{ChartError, ChartInput, OutputKind, Plotter};
use crate::extract::{self, ExtractError};
use crate::host::{self, HostError};
use crate::mail::{self, MailError};
use crate::metrics::MetricFamily;
use crate::process::ToolRunner;
use crate::reboot::{self, RebootError};
use crate::segments::{SegmentError, SegmentStore};
use crate::window::{ReportKind, ReportWindow};

/// Default accounting log tree
pub const LOG_DIR: &str = "/var/log/sysstat";

/// Any fatal condition aborting a report run
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Reboot(#[from] RebootError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inputs of one report run
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub kind: ReportKind,
    pub mail_from: String,
    pub mail_to: String,
    pub log_dir: PathBuf,
    pub wtmp_path: PathBuf,
    pub sys_net_dir: PathBuf,
    /// Losslessly recompress PNGs; callers disable this when the optimizer
    /// is not installed
    pub optimize_png: bool,
}

impl ReportOptions {
    pub fn new(kind: ReportKind, mail_from: impl Into<String>, mail_to: impl Into<String>) -> Self {
        Self {
            kind,
            mail_from: mail_from.into(),
            mail_to: mail_to.into(),
            log_dir: PathBuf::from(LOG_DIR),
            wtmp_path: PathBuf::from(reboot::WTMP_PATH),
            sys_net_dir: PathBuf::from(host::SYS_NET_DIR),
            optimize_png: false,
        }
    }
}

/// Generate the report and send it
pub fn run(options: &ReportOptions, runner: &dyn ToolRunner) -> Result<(), ReportError> {
    let scratch = tempfile::Builder::new()
        .prefix("sysstat-report_")
        .tempdir()?;
    let today = Local::now().date_naive();

    let window = ReportWindow::resolve(options.kind, today);
    tracing::info!(
        "Generating {} report over {} day(s)",
        options.kind,
        window.dates.len()
    );

    let store = SegmentStore::new(&options.log_dir, scratch.path());
    let mut segments = Vec::with_capacity(window.dates.len());
    for date in &window.dates {
        segments.push(store.locate(options.kind, *date)?);
    }

    let host = host::probe(runner, &options.sys_net_dir)?;
    let reboots = reboot::collect(runner, &options.wtmp_path, today.year())?;

    let utc_offset = i64::from(Local::now().offset().local_minus_utc());
    let plotter = Plotter::new(runner, &window, utc_offset, options.optimize_png);

    let mut images = Vec::new();
    let mut texts = Vec::new();
    for &family in MetricFamily::all() {
        tracing::info!("Extracting {} data...", family);
        let table_path = scratch.path().join(format!("{}.csv", family.slug()));
        let table = extract::extract(runner, family, &segments, &table_path)?;
        let tables: Vec<(String, PathBuf)> = if table.partitions.is_empty() {
            vec![(String::new(), table.path.clone())]
        } else {
            table.partitions.clone()
        };

        tracing::info!("Generating {} PNG chart...", family);
        let image = scratch.path().join(format!("{}.png", family.slug()));
        plotter.render(
            OutputKind::Raster,
            &ChartInput {
                family,
                tables: &tables,
                reboots: &reboots,
                y_range: family.y_range(&host),
                output: &image,
            },
        )?;

        tracing::info!("Generating {} text chart...", family);
        let text = scratch.path().join(format!("{}.txt", family.slug()));
        plotter.render(
            OutputKind::Text,
            &ChartInput {
                family,
                tables: &tables,
                reboots: &reboots,
                y_range: family.y_range(&host),
                output: &text,
            },
        )?;

        images.push(image);
        texts.push(text);
    }

    tracing::info!("Formatting email...");
    let subject = format!("Sysstat {} report", options.kind);
    let message = mail::format_message(
        &options.mail_from,
        &options.mail_to,
        &subject,
        &images,
        &texts,
    )?;

    let envelope_from = mail::envelope_address(&options.mail_from);
    let envelope_to = mail::envelope_address(&options.mail_to);
    tracing::info!("Sending email from {} to {}...", envelope_from, envelope_to);
    mail::send(runner, envelope_from, envelope_to, &message)?;

    Ok(())
}
