// Entry point and CLI.
//
// `analyze` (the default) runs the whole pipeline once, prints the summary
// and insight tables and writes the timestamped Excel report. `dashboard`
// runs the pipeline once and then serves an interactive menu over the
// result.
mod config;
mod dashboard;
mod error;
mod export;
mod insights;
mod join;
mod loader;
mod mapping;
mod metrics;
mod pipeline;
mod table;
mod types;
mod util;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use config::{AnalysisConfig, DEFAULT_DATA_ROOT, DEFAULT_OUTPUT_DIR};
use dashboard::{ConsolePresenter, Dashboard, JsonPresenter, Presenter, View};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ads_report")]
#[command(about = "Amazon Sponsored Products campaign analysis")]
struct Cli {
    /// Directory holding mappings/, campaign_reports/, search_terms/ and products/.
    #[arg(long, global = true, default_value = DEFAULT_DATA_ROOT)]
    data_root: PathBuf,

    /// Where timestamped reports are written.
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the analysis and write the Excel report.
    Analyze,
    /// Run the analysis and browse it interactively.
    Dashboard {
        #[arg(long, value_enum, default_value_t = PresenterKind::Console)]
        presenter: PresenterKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresenterKind {
    Console,
    Json,
}

impl PresenterKind {
    fn build(self) -> Box<dyn Presenter> {
        match self {
            PresenterKind::Console => Box::new(ConsolePresenter::new()),
            PresenterKind::Json => Box::new(JsonPresenter),
        }
    }
}

fn analyze(config: &AnalysisConfig) -> anyhow::Result<()> {
    println!("Processing campaign data from {}...", config.data_root.display());
    let analysis = pipeline::run(config).context("analysis failed")?;
    info!(summary = %dashboard::headline(&analysis), "analysis finished");

    let console = ConsolePresenter::new();
    let mut out = io::stdout().lock();
    console.render(View::Summary, &analysis, &mut out)?;
    console.render(View::Insights, &analysis, &mut out)?;

    let target = config.report_path(Local::now().naive_local());
    let path = export::export_report(&analysis, &target)
        .with_context(|| format!("could not write report to {}", target.display()))?;
    println!("Report saved to {}", path.display());
    Ok(())
}

fn run_dashboard(config: AnalysisConfig, presenter: PresenterKind) -> anyhow::Result<()> {
    println!("Loading campaign data from {}...", config.data_root.display());
    let dashboard = Dashboard::open(config, presenter.build()).context("analysis failed")?;
    dashboard.run(io::stdin().lock(), io::stdout())?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AnalysisConfig::new(cli.data_root, cli.output_dir);
    match cli.command.unwrap_or(Commands::Analyze) {
        Commands::Analyze => analyze(&config),
        Commands::Dashboard { presenter } => run_dashboard(config, presenter),
    }
}
