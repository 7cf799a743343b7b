//! QC cases planned from a site contract
//!
//! Every case yields exactly one result. Navigation and viewport checks are
//! planned one case per route and per profile, so a failing route never
//! hides the ones after it.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::console::ConsoleFilter;
use crate::driver::{LayoutRequest, MotionRequest, NavigationRequest, PageDriver, PresenceRequest};
use crate::error::{QcError, Result};
use crate::motion::{MotionPolicy, MotionVerdict};
use crate::site::{NavRoute, PresenceCheck, SiteContract, ViewportProfile};
use crate::visual::VisualTester;

/// Allowed horizontal overflow, absorbing sub-pixel rounding
const OVERFLOW_SLACK_PX: f64 = 1.0;

#[derive(Debug, Clone)]
pub enum QcCase {
    Presence(PresenceCheck),
    Motion,
    Navigation(NavRoute),
    ConsoleErrors { path: String },
    Breakpoint(ViewportProfile),
    Device(ViewportProfile),
}

impl QcCase {
    /// Plan every case the contract describes, in execution order
    pub fn plan(contract: &SiteContract) -> Vec<QcCase> {
        let mut cases: Vec<QcCase> = contract
            .presence
            .iter()
            .cloned()
            .map(QcCase::Presence)
            .collect();
        cases.push(QcCase::Motion);
        cases.extend(contract.routes.iter().cloned().map(QcCase::Navigation));
        cases.push(QcCase::ConsoleErrors {
            path: "/".to_string(),
        });
        cases.extend(contract.breakpoints.iter().cloned().map(QcCase::Breakpoint));
        cases.extend(contract.devices.iter().cloned().map(QcCase::Device));
        cases
    }

    /// Hierarchical case name, e.g. `navigation/pricing`
    pub fn name(&self) -> String {
        match self {
            QcCase::Presence(check) => format!("presence/{}", check.name),
            QcCase::Motion => "ticker/motion".to_string(),
            QcCase::Navigation(route) => format!("navigation/{}", route.label),
            QcCase::ConsoleErrors { path } => {
                let page = path.trim_matches('/');
                format!("console/{}", if page.is_empty() { "home" } else { page })
            }
            QcCase::Breakpoint(profile) => format!("responsive/{}", profile.name),
            QcCase::Device(profile) => format!("device/{}", profile.name),
        }
    }

    /// File-name-safe form of [`QcCase::name`]
    pub fn slug(&self) -> String {
        self.name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect()
    }

    /// Where this case writes its screenshot, if it takes one
    pub fn screenshot_path(&self, artifact_dir: &Path) -> Option<PathBuf> {
        match self {
            QcCase::Navigation(_) | QcCase::Breakpoint(_) | QcCase::Device(_) => {
                Some(artifact_dir.join(format!("{}.png", self.slug())))
            }
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            QcCase::Presence(check) => format!(
                "{} selector(s) visible on {}",
                check.selectors.len(),
                check.path
            ),
            QcCase::Motion => "ticker content moves between samples".to_string(),
            QcCase::Navigation(route) => format!("nav link reaches {}", route.path),
            QcCase::ConsoleErrors { path } => format!("no script errors loading {}", path),
            QcCase::Breakpoint(profile) | QcCase::Device(profile) => {
                format!("no horizontal overflow at {}", profile.label())
            }
        }
    }
}

impl fmt::Display for QcCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything a case needs to execute
pub struct CaseContext<'a> {
    pub driver: &'a dyn PageDriver,
    /// Site root; its path prefix is ignored when matching locations
    pub base_url: &'a str,
    pub contract: &'a SiteContract,
    pub motion: &'a MotionPolicy,
    pub console: &'a ConsoleFilter,
    pub artifact_dir: &'a Path,
    pub visual: Option<&'a VisualTester>,
}

/// What a case observed. `failure` is set when the case did not pass.
#[derive(Debug, Default)]
pub struct CaseOutcome {
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub critical_console: usize,
    pub failure: Option<QcError>,
}

impl CaseOutcome {
    fn fail(mut self, error: QcError) -> Self {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
        self
    }
}

impl QcCase {
    /// Run the case. `Err` means the harness itself failed.
    pub async fn execute(&self, ctx: &CaseContext<'_>) -> Result<CaseOutcome> {
        match self {
            QcCase::Presence(check) => presence(ctx, check).await,
            QcCase::Motion => motion(ctx).await,
            QcCase::Navigation(route) => navigation(ctx, route, self.screenshot_target(ctx)).await,
            QcCase::ConsoleErrors { path } => console_errors(ctx, path).await,
            QcCase::Breakpoint(profile) | QcCase::Device(profile) => {
                layout(ctx, profile, &self.slug(), self.screenshot_target(ctx)).await
            }
        }
    }

    fn screenshot_target(&self, ctx: &CaseContext<'_>) -> PathBuf {
        self.screenshot_path(ctx.artifact_dir)
            .unwrap_or_else(|| ctx.artifact_dir.join(format!("{}.png", self.slug())))
    }
}

async fn presence(ctx: &CaseContext<'_>, check: &PresenceCheck) -> Result<CaseOutcome> {
    let visibility = ctx
        .driver
        .check_visible(&PresenceRequest {
            path: check.path.clone(),
            selectors: check.selectors.clone(),
            timeout_ms: check.timeout_ms,
        })
        .await?;

    let missing: Vec<String> = check
        .selectors
        .iter()
        .filter(|s| !visibility.iter().any(|v| &v.selector == *s && v.visible))
        .cloned()
        .collect();

    let outcome = CaseOutcome::default();
    if missing.is_empty() {
        Ok(outcome)
    } else {
        Ok(outcome.fail(QcError::ElementNotFound {
            selector: missing.join(", "),
            timeout_ms: check.timeout_ms,
        }))
    }
}

async fn motion(ctx: &CaseContext<'_>) -> Result<CaseOutcome> {
    let samples = ctx
        .driver
        .sample_positions(&MotionRequest {
            path: "/".to_string(),
            container: ctx.contract.selectors.ticker_container.clone(),
            content: ctx.contract.selectors.ticker_content.clone(),
            offsets_ms: ctx.motion.sample_offsets(),
            timeout_ms: ctx.contract.marker_timeout_ms,
        })
        .await?;
    debug!("Ticker samples: {:?}", samples);

    let mut outcome = CaseOutcome::default();
    match ctx.motion.evaluate(&samples) {
        MotionVerdict::Moving { delta_px } => {
            debug!("Ticker moved {:.1}px in the primary window", delta_px);
            Ok(outcome)
        }
        MotionVerdict::MovingAfterWidening { delta_px } => {
            outcome.warnings.push(format!(
                "ticker motion only detected after widening the window ({:.1}px)",
                delta_px
            ));
            Ok(outcome)
        }
        MotionVerdict::Stalled { max_delta_px } => Ok(outcome.fail(QcError::MotionNotDetected {
            max_delta_px,
            threshold_px: ctx.motion.threshold_px,
        })),
    }
}

async fn navigation(
    ctx: &CaseContext<'_>,
    route: &NavRoute,
    screenshot: PathBuf,
) -> Result<CaseOutcome> {
    let nav = &ctx.contract.selectors.nav;
    let observation = ctx
        .driver
        .follow_link(&NavigationRequest {
            start_path: "/".to_string(),
            nav: nav.clone(),
            link: route.link_selector(nav),
            marker: route.marker.clone(),
            timeout_ms: ctx.contract.marker_timeout_ms,
            screenshot: screenshot.clone(),
        })
        .await?;

    let mut outcome = CaseOutcome::default();
    if let Some(shot) = observation.screenshot.or(Some(screenshot)).filter(|p| p.exists()) {
        outcome.artifacts.push(shot);
    }

    if !location_matches(&observation.final_url, &route.path, ctx.base_url) {
        return Ok(outcome.fail(QcError::NavigationMismatch {
            expected: route.path.clone(),
            actual: observation.final_url,
        }));
    }
    if !observation.marker_visible {
        return Ok(outcome.fail(QcError::ElementNotFound {
            selector: route.marker.clone(),
            timeout_ms: ctx.contract.marker_timeout_ms,
        }));
    }
    Ok(outcome)
}

async fn console_errors(ctx: &CaseContext<'_>, path: &str) -> Result<CaseOutcome> {
    let messages = ctx.driver.collect_console(path).await?;
    let triage = ctx.console.triage(messages);

    let mut outcome = CaseOutcome::default();
    for message in &triage.benign {
        debug!("Ignoring benign console message: {}", message.text);
        outcome.warnings.push(format!("benign console message: {}", message.text));
    }
    for message in &triage.critical {
        warn!("Critical console message on {}: {}", path, message.text);
    }

    if triage.critical.is_empty() {
        return Ok(outcome);
    }
    outcome.critical_console = triage.critical.len();
    let texts = triage.critical.into_iter().map(|m| m.text).collect();
    Ok(outcome.fail(QcError::CriticalConsoleError(texts)))
}

async fn layout(
    ctx: &CaseContext<'_>,
    profile: &ViewportProfile,
    baseline_name: &str,
    screenshot: PathBuf,
) -> Result<CaseOutcome> {
    let observation = ctx
        .driver
        .measure_layout(&LayoutRequest {
            viewport: profile.clone(),
            path: "/".to_string(),
            logo: ctx.contract.selectors.logo.clone(),
            timeout_ms: ctx.contract.marker_timeout_ms,
            screenshot: screenshot.clone(),
        })
        .await?;

    let mut outcome = CaseOutcome::default();
    let shot = observation.screenshot.clone().unwrap_or(screenshot);
    if shot.exists() {
        outcome.artifacts.push(shot.clone());
        if let Some(visual) = ctx.visual {
            compare_baseline(visual, baseline_name, &shot, &mut outcome);
        }
    }

    if observation.scroll_width - observation.client_width > OVERFLOW_SLACK_PX {
        return Ok(outcome.fail(QcError::LayoutOverflow {
            viewport: profile.label(),
            scroll_width: observation.scroll_width,
            client_width: observation.client_width,
        }));
    }
    if !observation.logo_visible {
        return Ok(outcome.fail(QcError::ElementNotFound {
            selector: ctx.contract.selectors.logo.clone(),
            timeout_ms: ctx.contract.marker_timeout_ms,
        }));
    }
    Ok(outcome)
}

/// Visual differences are reported as warnings, never as failures
fn compare_baseline(visual: &VisualTester, name: &str, shot: &Path, outcome: &mut CaseOutcome) {
    match visual.compare(name, shot) {
        Ok(diff) => {
            if !diff.matches {
                outcome.warnings.push(format!(
                    "visual difference against baseline: {:.2}% pixels differ",
                    diff.diff_percent
                ));
            }
            if let Some(path) = diff.diff_image_path {
                outcome.artifacts.push(path);
            }
        }
        Err(QcError::BaselineNotFound(path)) => {
            outcome
                .warnings
                .push(format!("no visual baseline at {} (run with --update-baselines)", path));
        }
        Err(e) => outcome.warnings.push(format!("visual comparison skipped: {}", e)),
    }
}

/// Path component of a URL, without query or fragment
fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(i) => {
            let after = &url[i + 3..];
            match after.find('/') {
                Some(j) => &after[j..],
                None => "/",
            }
        }
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

fn normalize_path(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    let path = path
        .strip_suffix("/index.html")
        .or_else(|| path.strip_suffix("index.html"))
        .unwrap_or(path);
    path.strip_suffix(".html").unwrap_or(path)
}

/// Whether the browser ended up on `expected_path` of the site at
/// `base_url`. The base URL's own path is stripped first, so a site served
/// under a sub-path matches its home route; other routes compare trailing
/// segments.
pub fn location_matches(final_url: &str, expected_path: &str, base_url: &str) -> bool {
    let mut actual = normalize_path(url_path(final_url));
    let base = url_path(base_url).trim_end_matches('/');
    if !base.is_empty() {
        if let Some(rest) = actual.strip_prefix(base) {
            if rest.is_empty() || rest.starts_with('/') {
                actual = normalize_path(rest);
            }
        }
    }
    let expected = normalize_path(expected_path);

    if expected.is_empty() {
        return actual.is_empty();
    }
    actual.ends_with(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://site.test/", "/", true ; "root")]
    #[test_case("https://site.test/index.html", "/", true ; "root index")]
    #[test_case("https://site.test", "/", true ; "bare host")]
    #[test_case("https://site.test/pricing.html", "/pricing.html", true ; "exact page")]
    #[test_case("https://site.test/pricing", "/pricing.html", true ; "extensionless")]
    #[test_case("https://site.test/blog/index.html", "/blog/", true ; "directory index")]
    #[test_case("https://site.test/blog", "/blog/", true ; "directory without slash")]
    #[test_case("https://site.test/pricing.html?ref=nav#top", "/pricing.html", true ; "query and fragment")]
    #[test_case("https://site.test/", "/pricing.html", false ; "stayed home")]
    #[test_case("https://site.test/mypricing.html", "/pricing.html", false ; "partial segment")]
    #[test_case("https://site.test/about.html", "/", false ; "root expected")]
    fn test_location_matches(url: &str, path: &str, expected: bool) {
        assert_eq!(location_matches(url, path, "https://site.test"), expected);
    }

    #[test_case("https://org.github.io/site/", "/", true ; "home")]
    #[test_case("https://org.github.io/site/index.html", "/", true ; "home index")]
    #[test_case("https://org.github.io/site", "/", true ; "home without slash")]
    #[test_case("https://org.github.io/site/docs/", "/docs/", true ; "docs")]
    #[test_case("https://org.github.io/site/about.html", "/", false ; "left home")]
    #[test_case("https://org.github.io/other/", "/", false ; "outside the site")]
    #[test_case("https://org.github.io/sitemap/", "/", false ; "prefix is not a segment")]
    fn test_location_matches_under_sub_path(url: &str, path: &str, expected: bool) {
        assert_eq!(location_matches(url, path, "https://org.github.io/site/"), expected);
    }

    #[test]
    fn test_plan_reference_contract() {
        let cases = QcCase::plan(&SiteContract::default());
        // 1 presence + motion + 8 routes + console + 6 breakpoints + 3 devices
        assert_eq!(cases.len(), 20);
        assert_eq!(cases[0].name(), "presence/home-structure");
        assert_eq!(cases[1].name(), "ticker/motion");
        assert_eq!(cases[2].name(), "navigation/home");
        assert_eq!(cases[10].name(), "console/home");
        assert_eq!(cases[11].name(), "responsive/mobile-s");
        assert_eq!(cases[19].name(), "device/ipad-mini");
    }

    #[test]
    fn test_screenshot_paths() {
        let dir = Path::new("/tmp/qc");
        let cases = QcCase::plan(&SiteContract::default());
        assert_eq!(
            cases[5].screenshot_path(dir).unwrap(),
            dir.join("navigation-blog.png")
        );
        assert!(cases[1].screenshot_path(dir).is_none());
    }
}
