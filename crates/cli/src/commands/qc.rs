//! `trendsite qc` - browser QC runs

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::info;

use trendsite_qc::runner::CaseStatus;
use trendsite_qc::{
    Browser, PlaywrightConfig, PlaywrightDriver, QcCase, QcResult, QcRunner, RunStatus,
    RunnerConfig, SiteContract,
};

use crate::config::TrendsiteConfig;
use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum QcCommands {
    /// Run the QC suite and record a report
    Run(QcRunArgs),

    /// List the cases a run would execute
    Plan(QcPlanArgs),
}

#[derive(Args)]
pub struct QcRunArgs {
    /// Base URL of the site under test
    #[arg(long, env = "TRENDSITE_BASE_URL")]
    pub base_url: Option<String>,

    /// YAML site contract
    #[arg(long)]
    pub contract: Option<PathBuf>,

    /// Root directory for dated reports
    #[arg(long)]
    pub report_root: Option<PathBuf>,

    /// Only run cases whose name starts with this prefix
    #[arg(long)]
    pub only: Option<String>,

    /// Overwrite visual baselines with this run's screenshots
    #[arg(long)]
    pub update_baselines: bool,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Skip the reachability check before the run
    #[arg(long)]
    pub skip_reachability: bool,
}

#[derive(Args)]
pub struct QcPlanArgs {
    /// YAML site contract
    #[arg(long)]
    pub contract: Option<PathBuf>,

    /// Only list cases whose name starts with this prefix
    #[arg(long)]
    pub only: Option<String>,
}

#[derive(Serialize)]
struct PlannedCase {
    name: String,
    checks: String,
}

impl TableDisplay for PlannedCase {
    fn headers() -> Vec<&'static str> {
        vec!["Case", "Checks"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.checks.clone()]
    }
}

struct ResultRow<'a>(&'a QcResult);

impl Serialize for ResultRow<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl TableDisplay for ResultRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Case", "Status", "Duration", "Notes"]
    }

    fn row(&self) -> Vec<String> {
        let r = self.0;
        let status = match r.status {
            CaseStatus::Pass if r.warnings.is_empty() => "✓ pass".to_string(),
            CaseStatus::Pass => format!("✓ pass ({} warning(s))", r.warnings.len()),
            CaseStatus::Fail => "✗ fail".to_string(),
        };
        let notes = r
            .error
            .iter()
            .chain(r.warnings.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        vec![r.name.clone(), status, format!("{} ms", r.duration_ms), notes]
    }
}

fn load_contract(path: Option<&PathBuf>) -> anyhow::Result<SiteContract> {
    match path {
        Some(path) => SiteContract::from_file(path)
            .with_context(|| format!("loading site contract {}", path.display())),
        None => Ok(SiteContract::default()),
    }
}

pub async fn execute(cmd: QcCommands, config: &TrendsiteConfig, format: OutputFormat) -> anyhow::Result<i32> {
    match cmd {
        QcCommands::Run(args) => run(args, config, format).await,
        QcCommands::Plan(args) => plan(args, config, format),
    }
}

fn plan(args: QcPlanArgs, config: &TrendsiteConfig, format: OutputFormat) -> anyhow::Result<i32> {
    let contract = load_contract(args.contract.as_ref().or(config.qc.contract.as_ref()))?;
    let cases: Vec<PlannedCase> = QcCase::plan(&contract)
        .iter()
        .filter(|c| args.only.as_deref().map_or(true, |p| c.name().starts_with(p)))
        .map(|c| PlannedCase {
            name: c.name(),
            checks: c.description(),
        })
        .collect();

    output::print_list(&cases, format);
    Ok(0)
}

async fn run(args: QcRunArgs, config: &TrendsiteConfig, format: OutputFormat) -> anyhow::Result<i32> {
    let qc = &config.qc;
    let base_url = args.base_url.unwrap_or_else(|| qc.base_url.clone());
    let contract = load_contract(args.contract.as_ref().or(qc.contract.as_ref()))?;

    let mut visual = config.visual.clone();
    if args.update_baselines {
        visual.enabled = true;
        visual.update_baselines = true;
    }

    let driver = PlaywrightDriver::new(PlaywrightConfig {
        base_url: base_url.clone(),
        browser: args.browser.unwrap_or(qc.browser),
        headless: qc.headless && !args.headed,
        operation_timeout_ms: qc.operation_timeout_ms,
        node_project_dir: qc.node_project_dir.clone(),
        ..Default::default()
    })
    .await?;

    let runner = QcRunner::new(
        driver,
        RunnerConfig {
            base_url: base_url.clone(),
            contract,
            visual,
            report_root: args.report_root.unwrap_or_else(|| config.report.root.clone()),
            artifact_dir: Some(qc.output_dir.clone()),
            only: args.only,
            reachability_timeout: (!args.skip_reachability)
                .then(|| Duration::from_millis(qc.reachability_timeout_ms)),
            ..Default::default()
        },
    )?;

    info!("Starting QC run against {}", base_url);
    let suite = runner.run().await?;

    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        output::print_structured(&suite, format);
    } else {
        let rows: Vec<ResultRow> = suite.results.iter().map(ResultRow).collect();
        output::print_list(&rows, format);
        println!(
            "{} passed, {} failed, {} warning(s), {} critical console error(s)",
            suite.summary.passed,
            suite.summary.failed,
            suite.summary.warnings,
            suite.summary.critical_errors
        );
        output::print_info(&format!("Report: {}", suite.report_dir.display()));
        match suite.status {
            RunStatus::Healthy => output::print_success("Site is healthy"),
            RunStatus::NeedsAttention => output::print_warning("Site needs attention"),
            RunStatus::Critical => output::print_error("Critical QC failures"),
        }
    }

    Ok(exit_code(suite.status))
}

/// 0 unless the run is critical
fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::Healthy | RunStatus::NeedsAttention => 0,
        RunStatus::Critical => 1,
    }
}
