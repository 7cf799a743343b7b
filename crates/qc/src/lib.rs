//! Trendsite QC Harness
//!
//! Browser-driven quality checks for the Trendsite marketing site:
//! - Plans one case per structural check, route and viewport from a YAML
//!   site contract
//! - Drives Playwright through generated Node scripts
//! - Proves the trending ticker actually moves
//! - Records every case into a dated JSON + markdown report
//! - Lints a built site directory without a browser
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    QcRunner<D: PageDriver>                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  wait_until_reachable(base_url)                             │
//! │  QcCase::plan(SiteContract) -> [QcCase]                     │
//! │    ├── presence/<check>                                     │
//! │    ├── ticker/motion          MotionPolicy::evaluate        │
//! │    ├── navigation/<label>     one per route                 │
//! │    ├── console/home           ConsoleFilter::triage         │
//! │    ├── responsive/<name>      one per breakpoint            │
//! │    └── device/<name>          one per device profile        │
//! │        │                                                    │
//! │        ▼ QcResult                                           │
//! │  ReportWriter::record -> <root>/<date>/qc-report.json       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver                                                 │
//! │    └── PlaywrightDriver (node + playwright)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cases;
pub mod console;
pub mod driver;
pub mod error;
pub mod lint;
pub mod motion;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod site;
pub mod target;
pub mod visual;

pub use cases::QcCase;
pub use driver::PageDriver;
pub use error::{QcError, Result};
pub use lint::{LintReport, SiteLinter};
pub use motion::{MotionPolicy, MotionVerdict};
pub use playwright::{Browser, PlaywrightConfig, PlaywrightDriver};
pub use report::ReportWriter;
pub use runner::{QcResult, QcRunner, QcSuiteResult, RunStatus, RunnerConfig, SuiteSummary};
pub use site::SiteContract;
pub use visual::{VisualConfig, VisualTester};
