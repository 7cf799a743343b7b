//! `trendsite.toml` configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trendsite_qc::{Browser, VisualConfig};
use trendsite_ticker::TickerConfig;

pub const DEFAULT_CONFIG_FILE: &str = "trendsite.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsiteConfig {
    pub qc: QcSection,
    pub report: ReportSection,
    pub visual: VisualConfig,
    pub ticker: TickerConfig,
}

/// Browser run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QcSection {
    pub base_url: String,
    pub operation_timeout_ms: u64,
    pub browser: Browser,
    pub headless: bool,
    /// YAML site contract; the built-in reference contract when unset
    pub contract: Option<PathBuf>,
    /// Raw screenshots, kept between runs for debugging
    pub output_dir: PathBuf,
    /// Directory whose `node_modules` provides `playwright`
    pub node_project_dir: PathBuf,
    /// How long to wait for the site before giving up
    pub reachability_timeout_ms: u64,
}

impl Default for QcSection {
    fn default() -> Self {
        Self {
            base_url: "https://trendsite.example.com".to_string(),
            operation_timeout_ms: 30_000,
            browser: Browser::Chromium,
            headless: true,
            contract: None,
            output_dir: PathBuf::from("test-results"),
            node_project_dir: PathBuf::from("."),
            reachability_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub root: PathBuf,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("qc-reports"),
        }
    }
}

impl TrendsiteConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendsite_ticker::LoopStrategy;

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrendsiteConfig::load(&dir.path().join("trendsite.toml")).unwrap();
        assert_eq!(config.qc.base_url, "https://trendsite.example.com");
        assert_eq!(config.qc.operation_timeout_ms, 30_000);
        assert_eq!(config.report.root, PathBuf::from("qc-reports"));
        assert!(!config.visual.enabled);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trendsite.toml");
        std::fs::write(
            &path,
            r#"
[qc]
base_url = "http://localhost:8000"
browser = "firefox"

[visual]
enabled = true
threshold = 1.5

[ticker]
dwell_ms = 1500.0
strategy = "wraparound"
"#,
        )
        .unwrap();

        let config = TrendsiteConfig::load(&path).unwrap();
        assert_eq!(config.qc.base_url, "http://localhost:8000");
        assert_eq!(config.qc.browser, Browser::Firefox);
        assert!(config.qc.headless);
        assert!(config.visual.enabled);
        assert_eq!(config.visual.threshold, 1.5);
        assert_eq!(config.ticker.dwell_ms, 1500.0);
        assert_eq!(config.ticker.strategy, LoopStrategy::Wraparound);
        assert_eq!(config.ticker.speed_px_per_sec, 50.0);
    }
}
