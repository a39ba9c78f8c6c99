//! sysstat-report CLI
//!
//! Thin entry point: parse arguments, set up logging, detect the optional
//! PNG optimizer, then run the report pipeline. Any fatal error propagates
//! out and exits nonzero.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sysstat_report::process::{find_in_path, SystemRunner};
use sysstat_report::report::{self, ReportOptions};
use sysstat_report::window::ReportKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Verbosity {
    Warning,
    Normal,
    Debug,
}

impl Verbosity {
    fn filter(&self) -> &'static str {
        match self {
            Verbosity::Warning => "warn",
            Verbosity::Normal => "info",
            Verbosity::Debug => "debug",
        }
    }
}

#[derive(Parser)]
#[command(name = "sysstat-report")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate and send a sysstat mail report")]
struct Cli {
    /// Type of report
    #[arg(value_enum)]
    report_kind: ReportKind,

    /// Mail sender
    mail_from: String,

    /// Mail destination
    mail_to: String,

    /// Level of output to display
    #[arg(short, long, value_enum, default_value = "normal")]
    verbosity: Verbosity,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(cli.verbosity.filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let optimize_png = find_in_path("optipng").is_some();
    if !optimize_png {
        tracing::warn!("optipng could not be found, PNG crunching will be disabled");
    }

    let mut options = ReportOptions::new(cli.report_kind, cli.mail_from, cli.mail_to);
    options.optimize_png = optimize_png;

    report::run(&options, &SystemRunner)?;
    Ok(())
}
