//! Dated QC report directory
//!
//! ```text
//! <root>/<YYYY-MM-DD>/
//!   ├── screenshots/      copies of case screenshots, prefixed by run time
//!   ├── qc-report.json    every run of the day
//!   └── qc-summary.md     human-readable view of the same data
//! ```
//!
//! The report is rewritten after every case, so an interrupted run still
//! leaves a consistent file behind. Several runs may share a date directory
//! at the same time: each writer only owns its own run entry and merges it
//! into the file on disk under an exclusive lock on `.qc-report.lock`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::runner::{CaseStatus, QcResult, QcSuiteResult, RunStatus, SuiteSummary};

pub const REPORT_FILE: &str = "qc-report.json";
pub const SUMMARY_FILE: &str = "qc-summary.md";
pub const SCREENSHOTS_DIR: &str = "screenshots";
const LOCK_FILE: &str = ".qc-report.lock";

/// All runs recorded on one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: String,
    pub runs: Vec<RunEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEntry {
    pub run_id: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<RunStatus>,
    #[serde(default)]
    pub summary: SuiteSummary,
    #[serde(default)]
    pub results: Vec<QcResult>,
}

/// Identity of the run being recorded
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
}

pub struct ReportWriter {
    run_dir: PathBuf,
    screenshots_dir: PathBuf,
    date: String,
    /// Prepended to copied screenshots
    prefix: String,
    run: Mutex<RunEntry>,
}

impl ReportWriter {
    /// Open (or create) the directory for the run's date and register the run
    pub fn new(root: &Path, run: RunInfo) -> Result<Self> {
        let date = run.started_at.format("%Y-%m-%d").to_string();
        let run_dir = root.join(&date);
        let screenshots_dir = run_dir.join(SCREENSHOTS_DIR);
        std::fs::create_dir_all(&screenshots_dir)?;

        let writer = Self {
            prefix: run.started_at.format("%H%M%S").to_string(),
            run_dir,
            screenshots_dir,
            date,
            run: Mutex::new(RunEntry {
                run_id: run.run_id,
                base_url: run.base_url,
                started_at: run.started_at,
                finished_at: None,
                status: None,
                summary: SuiteSummary::default(),
                results: Vec::new(),
            }),
        };
        writer.persist(&writer.run.lock())?;
        info!("Recording QC report in {}", writer.run_dir.display());
        Ok(writer)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn report_path(&self) -> PathBuf {
        self.run_dir.join(REPORT_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.run_dir.join(SUMMARY_FILE)
    }

    /// Copy the result's screenshots into the report and store the result.
    ///
    /// `result.artifacts` is rewritten to the copied, report-relative paths.
    /// A screenshot that cannot be copied is dropped and noted as a warning
    /// on the result; only a failure to write the report itself is an error.
    pub fn record(&self, result: &mut QcResult) -> Result<()> {
        let mut run = self.run.lock();

        let mut copied = Vec::with_capacity(result.artifacts.len());
        for artifact in std::mem::take(&mut result.artifacts) {
            match self.copy_artifact(Path::new(&artifact)) {
                Ok(path) => copied.push(path),
                Err(e) => {
                    warn!("Could not archive screenshot {}: {}", artifact, e);
                    result
                        .warnings
                        .push(format!("Screenshot {} not archived: {}", artifact, e));
                }
            }
        }
        result.artifacts = copied;

        match run.results.iter_mut().find(|r| r.name == result.name) {
            Some(existing) => *existing = result.clone(),
            None => run.results.push(result.clone()),
        }
        run.summary = SuiteSummary::from_results(&run.results);

        self.persist(&run)
    }

    /// Stamp the run as finished
    pub fn finish(&self, suite: &QcSuiteResult) -> Result<()> {
        let mut run = self.run.lock();
        run.finished_at = Some(suite.finished_at);
        run.status = Some(suite.status);
        run.summary = SuiteSummary::from_results(&run.results);
        self.persist(&run)?;
        info!("QC report written to: {}", self.report_path().display());
        Ok(())
    }

    fn copy_artifact(&self, source: &Path) -> Result<String> {
        if source.starts_with(&self.screenshots_dir) {
            return Ok(self.relative(source));
        }

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "artifact.png".to_string());
        let target = unused_path(&self.screenshots_dir, &format!("{}-{}", self.prefix, file_name));
        std::fs::copy(source, &target)?;
        debug!("Copied {} to {}", source.display(), target.display());
        Ok(self.relative(&target))
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.run_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    /// Merge this run's entry into the day's report on disk
    fn persist(&self, run: &RunEntry) -> Result<()> {
        let _lock = ReportLock::acquire(&self.run_dir.join(LOCK_FILE))?;

        let mut report = self.load()?;
        match report.runs.iter_mut().find(|r| r.run_id == run.run_id) {
            Some(existing) => *existing = run.clone(),
            None => report.runs.push(run.clone()),
        }

        let json = serde_json::to_string_pretty(&report)?;
        write_atomic(&self.report_path(), json.as_bytes())?;
        write_atomic(&self.summary_path(), render_summary(&report).as_bytes())
    }

    fn load(&self) -> Result<DailyReport> {
        let path = self.report_path();
        if !path.exists() {
            return Ok(DailyReport {
                date: self.date.clone(),
                runs: Vec::new(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Exclusive advisory lock held while the report is read, merged and written
struct ReportLock {
    file: File,
}

impl ReportLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for ReportLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `dir/name`, or `dir/stem-N.ext` for the first N that is free
fn unused_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| dir.join(format!("{}-{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Markdown view of a day's runs, newest first
pub fn render_summary(report: &DailyReport) -> String {
    let mut md = format!("# QC summary for {}\n\n", report.date);

    for run in report.runs.iter().rev() {
        let status = run
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "in_progress".to_string());
        md.push_str(&format!("## Run {}\n\n", run.run_id));
        md.push_str(&format!("- Base URL: {}\n", run.base_url));
        md.push_str(&format!("- Started: {}\n", run.started_at.to_rfc3339()));
        if let Some(finished) = run.finished_at {
            md.push_str(&format!("- Finished: {}\n", finished.to_rfc3339()));
        }
        md.push_str(&format!("- Status: **{}**\n", status));
        md.push_str(&format!(
            "- Cases: {} total, {} passed, {} failed, {} warning(s), {} critical console error(s)\n\n",
            run.summary.total,
            run.summary.passed,
            run.summary.failed,
            run.summary.warnings,
            run.summary.critical_errors
        ));

        if run.results.is_empty() {
            continue;
        }

        md.push_str("| Case | Status | Duration | Notes |\n");
        md.push_str("|------|--------|----------|-------|\n");
        for result in &run.results {
            let mark = match result.status {
                CaseStatus::Pass => "✓ pass",
                CaseStatus::Fail => "✗ fail",
            };
            let mut notes: Vec<String> = Vec::new();
            if let Some(error) = &result.error {
                notes.push(error.replace('|', "\\|"));
            }
            notes.extend(result.warnings.iter().map(|w| format!("⚠ {}", w.replace('|', "\\|"))));
            notes.extend(
                result
                    .artifacts
                    .iter()
                    .map(|a| format!("[screenshot]({})", a)),
            );
            md.push_str(&format!(
                "| {} | {} | {} ms | {} |\n",
                result.name,
                mark,
                result.duration_ms,
                notes.join("<br>")
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(run_id: &str) -> RunInfo {
        RunInfo {
            run_id: run_id.to_string(),
            base_url: "https://site.test".to_string(),
            started_at: "2026-03-14T09:26:53Z".parse().unwrap(),
        }
    }

    fn result(name: &str, artifacts: Vec<String>) -> QcResult {
        QcResult {
            name: name.to_string(),
            status: CaseStatus::Pass,
            timestamp: Utc::now(),
            duration_ms: 12,
            artifacts,
            error: None,
            error_kind: None,
            warnings: vec![],
            critical_errors: 0,
        }
    }

    #[test]
    fn test_layout_and_copy() {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let shot = scratch.path().join("navigation-home.png");
        std::fs::write(&shot, b"png").unwrap();

        let writer = ReportWriter::new(root.path(), info("run-1")).unwrap();
        assert_eq!(writer.run_dir(), root.path().join("2026-03-14"));

        let mut r = result("navigation/home", vec![shot.to_string_lossy().to_string()]);
        writer.record(&mut r).unwrap();
        assert_eq!(r.artifacts, vec!["screenshots/092653-navigation-home.png".to_string()]);
        assert!(writer.run_dir().join(&r.artifacts[0]).exists());
        assert!(writer.summary_path().exists());
    }

    #[test]
    fn test_copies_never_overwrite() {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let shot = scratch.path().join("device-pixel-5.png");
        std::fs::write(&shot, b"first").unwrap();

        let first = ReportWriter::new(root.path(), info("run-1")).unwrap();
        let mut a = result("device/pixel-5", vec![shot.to_string_lossy().to_string()]);
        first.record(&mut a).unwrap();

        std::fs::write(&shot, b"second").unwrap();
        let second = ReportWriter::new(root.path(), info("run-2")).unwrap();
        let mut b = result("device/pixel-5", vec![shot.to_string_lossy().to_string()]);
        second.record(&mut b).unwrap();

        assert_ne!(a.artifacts, b.artifacts);
        let day = root.path().join("2026-03-14");
        assert_eq!(std::fs::read(day.join(&a.artifacts[0])).unwrap(), b"first");
        assert_eq!(std::fs::read(day.join(&b.artifacts[0])).unwrap(), b"second");
    }

    #[test]
    fn test_record_upserts_by_name() {
        let root = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(root.path(), info("run-1")).unwrap();
        writer.record(&mut result("ticker/motion", vec![])).unwrap();
        writer.record(&mut result("ticker/motion", vec![])).unwrap();

        let report: DailyReport =
            serde_json::from_str(&std::fs::read_to_string(writer.report_path()).unwrap()).unwrap();
        assert_eq!(report.runs[0].results.len(), 1);
        assert_eq!(report.runs[0].summary.total, 1);
    }

    #[test]
    fn test_interleaved_writers_keep_both_runs() {
        let root = tempfile::tempdir().unwrap();
        let first = ReportWriter::new(root.path(), info("run-a")).unwrap();
        let second = ReportWriter::new(root.path(), info("run-b")).unwrap();

        first.record(&mut result("presence/home-structure", vec![])).unwrap();
        second.record(&mut result("ticker/motion", vec![])).unwrap();
        first.record(&mut result("console/home", vec![])).unwrap();

        let report: DailyReport =
            serde_json::from_str(&std::fs::read_to_string(first.report_path()).unwrap()).unwrap();
        let counts: Vec<(String, usize)> = report
            .runs
            .iter()
            .map(|r| (r.run_id.clone(), r.results.len()))
            .collect();
        assert_eq!(
            counts,
            vec![("run-a".to_string(), 2), ("run-b".to_string(), 1)]
        );
        assert!(std::fs::read_to_string(first.summary_path())
            .unwrap()
            .contains("## Run run-b"));
    }

    #[test]
    fn test_missing_screenshot_becomes_warning() {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let gone = scratch.path().join("responsive-tablet.png");

        let writer = ReportWriter::new(root.path(), info("run-1")).unwrap();
        let mut r = result("responsive/tablet", vec![gone.to_string_lossy().to_string()]);
        writer.record(&mut r).unwrap();

        assert!(r.artifacts.is_empty());
        assert_eq!(r.warnings.len(), 1);
        assert!(r.warnings[0].contains("not archived"));

        let report: DailyReport =
            serde_json::from_str(&std::fs::read_to_string(writer.report_path()).unwrap()).unwrap();
        assert_eq!(report.runs[0].results[0].warnings, r.warnings);
    }

    #[test]
    fn test_summary_escapes_pipes() {
        let mut r = result("console/home", vec![]);
        r.status = CaseStatus::Fail;
        r.error = Some("a | b".to_string());
        let report = DailyReport {
            date: "2026-03-14".to_string(),
            runs: vec![RunEntry {
                run_id: "run-1".to_string(),
                base_url: "https://site.test".to_string(),
                started_at: Utc::now(),
                finished_at: None,
                status: None,
                summary: SuiteSummary::from_results(std::slice::from_ref(&r)),
                results: vec![r],
            }],
        };
        let md = render_summary(&report);
        assert!(md.contains("# QC summary for 2026-03-14"));
        assert!(md.contains("Status: **in_progress**"));
        assert!(md.contains("a \\| b"));
    }
}
