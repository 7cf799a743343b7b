//! Declarative site contract
//!
//! The selectors, routes and viewports the harness relies on. This is the
//! agreement between the page markup and the QC suite: renaming a
//! `data-testid` on the page is a breaking change here.

use serde::{Deserialize, Serialize};
use std::path::Path;

use trendsite_ticker::render::{CONTAINER_TEST_ID, CONTENT_TEST_ID};

use crate::cases::QcCase;
use crate::error::{QcError, Result};

/// `[data-testid="..."]` selector for a test id
pub fn testid(id: &str) -> String {
    format!(r#"[data-testid="{}"]"#, id)
}

/// Everything the harness knows about the site under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteContract {
    /// Shared selectors
    pub selectors: Selectors,

    /// Structural presence checks
    pub presence: Vec<PresenceCheck>,

    /// Ordered navigation walk
    pub routes: Vec<NavRoute>,

    /// Responsive breakpoints, smallest first
    pub breakpoints: Vec<ViewportProfile>,

    /// Named device profiles
    pub devices: Vec<ViewportProfile>,

    /// Case-insensitive regexes for console noise that is not a failure
    pub benign_console_patterns: Vec<String>,

    /// Bounded wait for page markers and the logo
    pub marker_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub logo: String,
    pub nav: String,
    pub ticker_container: String,
    pub ticker_content: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            logo: testid("site-logo"),
            nav: testid("primary-nav"),
            ticker_container: testid(CONTAINER_TEST_ID),
            ticker_content: testid(CONTENT_TEST_ID),
        }
    }
}

/// A set of selectors that must become visible on one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceCheck {
    pub name: String,
    #[serde(default = "default_path")]
    pub path: String,
    pub selectors: Vec<String>,
    #[serde(default = "default_presence_timeout")]
    pub timeout_ms: u64,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_presence_timeout() -> u64 {
    10_000
}

/// One entry of the navigation walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavRoute {
    pub label: String,
    pub path: String,
    /// Selector unique to the destination page
    pub marker: String,
    /// Link to activate; defaults to the nav link whose href ends in `path`
    #[serde(default)]
    pub link: Option<String>,
}

impl NavRoute {
    pub fn link_selector(&self, nav: &str) -> String {
        match &self.link {
            Some(link) => link.clone(),
            None => format!(r#"{} a[href$="{}"]"#, nav, self.path),
        }
    }
}

/// A named viewport, optionally emulating a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale")]
    pub device_scale_factor: f64,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default)]
    pub has_touch: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_scale() -> f64 {
    1.0
}

impl ViewportProfile {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
            user_agent: None,
        }
    }

    fn mobile_device(name: &str, width: u32, height: u32, scale: f64) -> Self {
        Self {
            device_scale_factor: scale,
            is_mobile: true,
            has_touch: true,
            ..Self::new(name, width, height)
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({}x{})", self.name, self.width, self.height)
    }
}

impl Default for ViewportProfile {
    fn default() -> Self {
        Self::new("desktop", 1280, 720)
    }
}

impl Default for SiteContract {
    fn default() -> Self {
        let route = |label: &str, path: &str| NavRoute {
            label: label.to_string(),
            path: path.to_string(),
            marker: testid(&format!("page-{}", label)),
            link: Some(testid(&format!("nav-{}", label))),
        };
        let selectors = Selectors::default();

        Self {
            presence: vec![PresenceCheck {
                name: "home-structure".to_string(),
                path: default_path(),
                selectors: vec![
                    selectors.logo.clone(),
                    selectors.nav.clone(),
                    selectors.ticker_container.clone(),
                ],
                timeout_ms: default_presence_timeout(),
            }],
            routes: vec![
                route("home", "/"),
                route("features", "/features.html"),
                route("pricing", "/pricing.html"),
                route("blog", "/blog/"),
                route("kai-corner", "/kai-corner.html"),
                route("docs", "/docs/"),
                route("about", "/about.html"),
                route("contact", "/contact.html"),
            ],
            breakpoints: vec![
                ViewportProfile::new("mobile-s", 320, 568),
                ViewportProfile::new("mobile-m", 375, 667),
                ViewportProfile::new("mobile-l", 414, 896),
                ViewportProfile::new("tablet", 768, 1024),
                ViewportProfile::new("laptop", 1280, 800),
                ViewportProfile::new("desktop", 1920, 1080),
            ],
            devices: vec![
                ViewportProfile::mobile_device("iphone-12", 390, 844, 3.0),
                ViewportProfile::mobile_device("pixel-5", 393, 851, 2.75),
                ViewportProfile::mobile_device("ipad-mini", 768, 1024, 2.0),
            ],
            benign_console_patterns: vec![
                "favicon".to_string(),
                r"\bfonts?\b|\.woff2?\b|\.ttf\b".to_string(),
                r"\b404\b".to_string(),
                r"file not found|ERR_FILE_NOT_FOUND".to_string(),
            ],
            marker_timeout_ms: 10_000,
            selectors,
        }
    }
}

impl SiteContract {
    /// Parse a contract from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let contract: Self = serde_yaml::from_str(yaml)?;
        contract.validate()?;
        Ok(contract)
    }

    /// Parse a contract from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<()> {
        let mut labels = std::collections::HashSet::new();
        for route in &self.routes {
            if !labels.insert(route.label.as_str()) {
                return Err(QcError::ContractParse(format!(
                    "duplicate route label: {}",
                    route.label
                )));
            }
            if !route.path.starts_with('/') {
                return Err(QcError::ContractParse(format!(
                    "route '{}' path must start with '/': {}",
                    route.label, route.path
                )));
            }
        }

        for profile in self.breakpoints.iter().chain(&self.devices) {
            if profile.width == 0 || profile.height == 0 {
                return Err(QcError::ContractParse(format!(
                    "viewport '{}' has a zero dimension",
                    profile.name
                )));
            }
        }

        for pattern in &self.benign_console_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                QcError::ContractParse(format!("bad console pattern '{}': {}", pattern, e))
            })?;
        }

        // case names key report entries and slugs key screenshot files
        let mut slugs = std::collections::HashMap::new();
        for case in QcCase::plan(self) {
            if let Some(other) = slugs.insert(case.slug(), case.name()) {
                return Err(QcError::ContractParse(format!(
                    "cases '{}' and '{}' would share a report entry",
                    other,
                    case.name()
                )));
            }
        }

        Ok(())
    }
}
