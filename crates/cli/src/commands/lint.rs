//! `trendsite lint` - static checks of a built site

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use trendsite_qc::lint::{LintIssue, Severity};
use trendsite_qc::{LintReport, SiteLinter};

use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct LintArgs {
    /// Site directory to lint
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
struct IssueRow<'a>(&'a LintIssue);

impl TableDisplay for IssueRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Severity", "Category", "Location", "Message"]
    }

    fn row(&self) -> Vec<String> {
        let issue = self.0;
        let severity = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        let location = match issue.line {
            Some(line) => format!("{}:{}", issue.file, line),
            None => issue.file.clone(),
        };
        let category = serde_json::to_value(issue.category)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        let message = match &issue.details {
            Some(details) => format!("{} ({})", issue.message, details),
            None => issue.message.clone(),
        };
        vec![severity.to_string(), category, location, message]
    }
}

pub fn execute(args: LintArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let report = SiteLinter::new(&args.dir)?.run()?;

    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    match format {
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(&report, format),
        _ => print_human(&report, format),
    }

    Ok(if report.passed() { 0 } else { 1 })
}

fn print_human(report: &LintReport, format: OutputFormat) {
    if !report.issues.is_empty() {
        let rows: Vec<IssueRow> = report.issues.iter().map(IssueRow).collect();
        output::print_list(&rows, format);
    }

    println!(
        "{} file(s) scanned: {} error(s), {} warning(s), {} info",
        report.files_scanned, report.errors, report.warnings, report.info
    );
    let score = format!("QC score: {}/100", report.summary.score);
    if report.passed() {
        output::print_success(&score);
    } else {
        output::print_error(&score);
    }
}
