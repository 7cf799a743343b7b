//! Error types for the QC harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QcError {
    #[error("Element not found within {timeout_ms} ms: {selector}")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Navigation mismatch: expected path ending in '{expected}', got '{actual}'")]
    NavigationMismatch { expected: String, actual: String },

    #[error("{} critical console error(s): {}", .0.len(), .0.join(" | "))]
    CriticalConsoleError(Vec<String>),

    #[error("Horizontal overflow at {viewport}: scrollWidth {scroll_width} > clientWidth {client_width}")]
    LayoutOverflow {
        viewport: String,
        scroll_width: f64,
        client_width: f64,
    },

    #[error("No motion detected: max displacement {max_delta_px:.2}px (threshold {threshold_px:.2}px)")]
    MotionNotDetected { max_delta_px: f64, threshold_px: f64 },

    #[error("Site not reachable at {url} after {attempts} attempts")]
    SiteUnreachable { url: String, attempts: usize },

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Site contract parse error: {0}")]
    ContractParse(String),

    #[error("Report incomplete: {failed} of {total} result(s) could not be written to {path}")]
    ReportIncomplete {
        failed: usize,
        total: usize,
        path: String,
    },

    #[error("Visual regression: {0}")]
    VisualRegression(String),

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),
}

impl QcError {
    /// Stable snake_case name recorded as `error_kind` in reports
    pub fn kind(&self) -> &'static str {
        match self {
            QcError::ElementNotFound { .. } => "element_not_found",
            QcError::Timeout(_) => "timeout",
            QcError::NavigationMismatch { .. } => "navigation_mismatch",
            QcError::CriticalConsoleError(_) => "critical_console_error",
            QcError::LayoutOverflow { .. } => "layout_overflow",
            QcError::MotionNotDetected { .. } => "motion_not_detected",
            QcError::SiteUnreachable { .. } => "site_unreachable",
            QcError::PlaywrightNotFound => "playwright_not_found",
            QcError::Playwright(_) => "playwright",
            QcError::ContractParse(_) => "contract_parse",
            QcError::ReportIncomplete { .. } => "report_incomplete",
            QcError::VisualRegression(_) => "visual_regression",
            QcError::BaselineNotFound(_) => "baseline_not_found",
            QcError::Io(_) => "io",
            QcError::Json(_) => "json",
            QcError::Yaml(_) => "yaml",
            QcError::Http(_) => "http",
            QcError::Image(_) => "image",
            QcError::Regex(_) => "regex",
        }
    }
}

pub type Result<T> = std::result::Result<T, QcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_error_message() {
        let err = QcError::CriticalConsoleError(vec!["a is not defined".into(), "boom".into()]);
        assert_eq!(
            err.to_string(),
            "2 critical console error(s): a is not defined | boom"
        );
        assert_eq!(err.kind(), "critical_console_error");
    }
}
