//! Chart script building and rendering
//!
//! Translates a metric family's tables, column layout, range policy and
//! reboot markers into a complete gnuplot batch program, then drives the
//! engine to a PNG or a fixed-width text rendering. The script builder is a
//! pure function of its inputs so identical runs produce byte-identical
//! scripts.
//!
//! Time handling: the accounting reader emits UTC epoch seconds, while axis
//! ranges are expressed as local wall-clock midnights. Everything is kept in
//! "local wall-clock seconds": range endpoints and reboot markers use the
//! naive local datetime's epoch value, and each plotted data timestamp gets
//! the local UTC offset added in its `using` clause.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::metrics::{MetricFamily, YRange};
use crate::process::{ToolError, ToolRunner};
use crate::window::{ReportKind, ReportWindow};

/// Seconds between major x ticks on monthly charts (2 days)
const MONTHLY_XTICS_SECS: u64 = 60 * 60 * 24 * 2;

/// Output produced by one rendering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// 780x400 PNG image
    Raster,
    /// 110x25 character grid for the plain-text mail body
    Text,
}

#[derive(Debug, Error)]
pub enum ChartError {
    /// The plotting engine rejected the script or failed to run
    #[error("plotting engine failed: {0}")]
    Engine(ToolError),

    /// The PNG optimizer was found at startup but failed when invoked
    #[error("PNG optimizer failed: {0}")]
    Optimizer(ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a single chart needs beyond the report-wide state
#[derive(Debug)]
pub struct ChartInput<'a> {
    pub family: MetricFamily,
    /// `(nickname, table path)` pairs; the nickname is empty when the family
    /// has a single table and an interface name for network sub-tables
    pub tables: &'a [(String, PathBuf)],
    pub reboots: &'a [NaiveDateTime],
    pub y_range: YRange,
    pub output: &'a Path,
}

/// Builds chart scripts and drives the plotting engine for one report run
pub struct Plotter<'a> {
    runner: &'a dyn ToolRunner,
    window: &'a ReportWindow,
    utc_offset_secs: i64,
    optimize_png: bool,
}

impl<'a> Plotter<'a> {
    pub fn new(
        runner: &'a dyn ToolRunner,
        window: &'a ReportWindow,
        utc_offset_secs: i64,
        optimize_png: bool,
    ) -> Self {
        Self {
            runner,
            window,
            utc_offset_secs,
            optimize_png,
        }
    }

    /// Render one chart: build the script, run the engine, post-process
    pub fn render(&self, kind: OutputKind, input: &ChartInput) -> Result<(), ChartError> {
        let script = self.build_script(kind, input);
        self.runner
            .run("gnuplot", &[], Some(script.as_bytes()))
            .map_err(ChartError::Engine)?;

        match kind {
            OutputKind::Raster => {
                if self.optimize_png {
                    tracing::debug!("Crunching {:?}", input.output);
                    let output = input.output.to_string_lossy();
                    self.runner
                        .run("optipng", &["-quiet", "-o", "7", &output], None)
                        .map_err(ChartError::Optimizer)?;
                }
            }
            OutputKind::Text => trim_leading_control_bytes(input.output)?,
        }
        Ok(())
    }

    /// Assemble the complete gnuplot batch program for one chart
    pub fn build_script(&self, kind: OutputKind, input: &ChartInput) -> String {
        let mut lines: Vec<String> = Vec::new();

        match kind {
            OutputKind::Text => lines.push("set terminal dumb 110,25".to_string()),
            OutputKind::Raster => {
                lines.push("set terminal png size 780,400 font 'Liberation,9'".to_string())
            }
        }
        lines.push(format!("set output '{}'", input.output.display()));

        lines.push("set timefmt '%s'".to_string());
        lines.push("set datafile separator ';'".to_string());

        lines.push(format!("set title '{}'", input.family.title()));
        lines.push("set key outside right samplen 3 spacing 1.75".to_string());

        lines.push("set xdata time".to_string());
        lines.push("set xlabel 'Time'".to_string());
        if self.window.kind == ReportKind::Monthly {
            lines.push(format!("set xtics {}", MONTHLY_XTICS_SECS));
        }
        let (start, end) = self.window.chart_range();
        let (from, to) = (local_epoch(start), local_epoch(end));
        lines.push(format!("set xrange[\"{}\":\"{}\"]", from, to));
        lines.push(format!("set format x '{}'", self.window.kind.time_format()));

        lines.push(format!("set ylabel '{}'", input.family.y_label()));
        lines.push(match input.y_range {
            YRange::Fixed(low, high) => format!("set yrange [{}:{}]", low, high),
            YRange::OpenUpper(low) => format!("set yrange [{}:*]", low),
            YRange::AtLeast(low, floor) => format!("set yrange [{}:{}<*]", low, floor),
        });

        for reboot in input.reboots {
            let at = local_epoch(*reboot);
            if (from..=to).contains(&at) {
                lines.push(format!(
                    "set arrow from \"{}\",graph 0 to \"{}\",graph 1 lt 0 nohead",
                    at, at
                ));
            }
        }

        let layout = input.family.layout();
        let smooth = if self.window.kind.smooth() {
            "smooth csplines "
        } else {
            ""
        };
        let mut plots: Vec<String> = Vec::new();
        for (nickname, table) in input.tables {
            for series in layout.series {
                let legend = if nickname.is_empty() {
                    series.name.to_string()
                } else {
                    format!("{}_{}", nickname, series.name)
                };
                plots.push(format!(
                    "'{}' using (${}{:+}):{} {}with lines title '{}'",
                    table.display(),
                    layout.timestamp,
                    self.utc_offset_secs,
                    input.family.value_expr(series.column),
                    smooth,
                    legend
                ));
            }
        }
        lines.push(format!("plot {}", plots.join(", ")));

        lines.join(";\n") + ";"
    }
}

/// Local wall-clock epoch value of a naive datetime
fn local_epoch(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp()
}

/// The dumb terminal starts its output with a 2-byte control sequence that
/// breaks plain-text mail rendering; strip it in place.
fn trim_leading_control_bytes(path: &Path) -> Result<(), ChartError> {
    let contents = std::fs::read(path)?;
    if contents.len() >= 2 {
        std::fs::write(path, &contents[2..])?;
    }
    Ok(())
}
