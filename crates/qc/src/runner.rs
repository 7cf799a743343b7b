//! Runner that executes the planned cases and records every outcome

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cases::{CaseContext, CaseOutcome, QcCase};
use crate::console::ConsoleFilter;
use crate::driver::PageDriver;
use crate::error::{QcError, Result};
use crate::motion::MotionPolicy;
use crate::report::{ReportWriter, RunInfo};
use crate::site::SiteContract;
use crate::target::wait_until_reachable;
use crate::visual::{VisualConfig, VisualTester};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pass,
    Fail,
}

/// Outcome of one case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcResult {
    pub name: String,
    pub status: CaseStatus,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Console errors that were not filtered as benign
    #[serde(default)]
    pub critical_errors: usize,
}

impl QcResult {
    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Pass
    }

    fn from_outcome(name: String, timestamp: DateTime<Utc>, duration_ms: u64, outcome: CaseOutcome) -> Self {
        let (status, error, error_kind) = match &outcome.failure {
            Some(e) => (CaseStatus::Fail, Some(e.to_string()), Some(e.kind().to_string())),
            None => (CaseStatus::Pass, None, None),
        };
        Self {
            name,
            status,
            timestamp,
            duration_ms,
            artifacts: outcome
                .artifacts
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            error,
            error_kind,
            warnings: outcome.warnings,
            critical_errors: outcome.critical_console,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Healthy,
    NeedsAttention,
    Critical,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Healthy => write!(f, "healthy"),
            RunStatus::NeedsAttention => write!(f, "needs_attention"),
            RunStatus::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub critical_errors: usize,
}

impl SuiteSummary {
    pub fn from_results(results: &[QcResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed()).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            warnings: results.iter().map(|r| r.warnings.len()).sum(),
            critical_errors: results.iter().map(|r| r.critical_errors).sum(),
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.failed > 0 || self.critical_errors > 0 {
            RunStatus::Critical
        } else if self.warnings > 0 {
            RunStatus::NeedsAttention
        } else {
            RunStatus::Healthy
        }
    }
}

/// Result of one `qc run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcSuiteResult {
    pub run_id: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub summary: SuiteSummary,
    pub results: Vec<QcResult>,
    /// Directory holding this date's report
    pub report_dir: PathBuf,
}

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub base_url: String,
    pub contract: SiteContract,
    pub motion: MotionPolicy,
    pub visual: VisualConfig,
    pub report_root: PathBuf,
    /// Raw screenshots land here before the report copies them; a
    /// temporary directory when unset
    pub artifact_dir: Option<PathBuf>,
    /// Only run cases whose name starts with this prefix
    pub only: Option<String>,
    /// Wait for the site before running; `None` skips the check
    pub reachability_timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trendsite.example.com".to_string(),
            contract: SiteContract::default(),
            motion: MotionPolicy::default(),
            visual: VisualConfig::default(),
            report_root: PathBuf::from("qc-reports"),
            artifact_dir: None,
            only: None,
            reachability_timeout: Some(Duration::from_secs(30)),
        }
    }
}

pub struct QcRunner<D: PageDriver> {
    driver: D,
    config: RunnerConfig,
    console: ConsoleFilter,
}

impl<D: PageDriver> QcRunner<D> {
    pub fn new(driver: D, config: RunnerConfig) -> Result<Self> {
        let console = ConsoleFilter::new(&config.contract.benign_console_patterns)?;
        Ok(Self {
            driver,
            config,
            console,
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Cases this runner will execute, after the `only` filter
    pub fn plan(&self) -> Vec<QcCase> {
        QcCase::plan(&self.config.contract)
            .into_iter()
            .filter(|case| match &self.config.only {
                Some(prefix) => case.name().starts_with(prefix.as_str()),
                None => true,
            })
            .collect()
    }

    /// Run every planned case serially. A failing case never stops the run.
    pub async fn run(&self) -> Result<QcSuiteResult> {
        if let Some(timeout) = self.config.reachability_timeout {
            wait_until_reachable(&self.config.base_url, timeout).await?;
        }

        let cases = self.plan();
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let writer = ReportWriter::new(
            &self.config.report_root,
            RunInfo {
                run_id: run_id.clone(),
                base_url: self.config.base_url.clone(),
                started_at,
            },
        )?;

        let visual = if self.config.visual.enabled {
            Some(VisualTester::new(&self.config.visual)?)
        } else {
            None
        };

        let scratch = tempfile::tempdir()?;
        let artifact_dir = match &self.config.artifact_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => scratch.path().to_path_buf(),
        };

        info!("Running {} QC case(s) against {}", cases.len(), self.config.base_url);

        let ctx = CaseContext {
            driver: &self.driver,
            base_url: &self.config.base_url,
            contract: &self.config.contract,
            motion: &self.config.motion,
            console: &self.console,
            artifact_dir: &artifact_dir,
            visual: visual.as_ref(),
        };

        let mut results = Vec::with_capacity(cases.len());
        let mut unwritten = 0;
        for case in &cases {
            let mut result = self.run_case(case, &ctx).await;
            if let Err(e) = writer.record(&mut result) {
                error!("Could not write {} to the report: {}", result.name, e);
                result.warnings.push(format!("Not written to the report: {}", e));
                unwritten += 1;
            }
            results.push(result);
        }

        let summary = SuiteSummary::from_results(&results);
        let status = summary.status();
        let suite = QcSuiteResult {
            run_id,
            base_url: self.config.base_url.clone(),
            started_at,
            finished_at: Utc::now(),
            status,
            summary,
            results,
            report_dir: writer.run_dir().to_path_buf(),
        };
        if let Err(e) = writer.finish(&suite) {
            error!("Could not finalize the report: {}", e);
            unwritten = unwritten.max(1);
        }

        info!("");
        info!(
            "QC Results: {} passed, {} failed, {} warning(s), status {}",
            suite.summary.passed, suite.summary.failed, suite.summary.warnings, suite.status
        );

        if unwritten > 0 {
            return Err(QcError::ReportIncomplete {
                failed: unwritten,
                total: suite.results.len(),
                path: writer.report_path().display().to_string(),
            });
        }
        Ok(suite)
    }

    async fn run_case(&self, case: &QcCase, ctx: &CaseContext<'_>) -> QcResult {
        let name = case.name();
        let timestamp = Utc::now();
        let start = Instant::now();
        debug!("Running case: {}", name);

        // a leftover file would pass for this run's screenshot
        if let Some(stale) = case.screenshot_path(ctx.artifact_dir) {
            let _ = std::fs::remove_file(stale);
        }

        let outcome = match case.execute(ctx).await {
            Ok(outcome) => outcome,
            Err(e) => harness_failure(case, ctx, e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let result = QcResult::from_outcome(name, timestamp, duration_ms, outcome);

        if result.passed() {
            info!("✓ {} ({} ms)", result.name, result.duration_ms);
            for warning in &result.warnings {
                warn!("  {}", warning);
            }
        } else {
            error!(
                "✗ {} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        result
    }
}

/// Turn an error raised while driving the browser into a failed outcome,
/// keeping any screenshot the probe managed to write
fn harness_failure(case: &QcCase, ctx: &CaseContext<'_>, error: QcError) -> CaseOutcome {
    let artifacts = case
        .screenshot_path(ctx.artifact_dir)
        .filter(|p| p.exists())
        .into_iter()
        .collect();
    CaseOutcome {
        artifacts,
        failure: Some(error),
        ..Default::default()
    }
}
