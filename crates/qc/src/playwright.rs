//! Playwright browser automation
//!
//! Every probe is compiled into a standalone Node script, run with `node`,
//! and reports back through a single marked JSON line on stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::console::ConsoleMessage;
use crate::driver::{
    LayoutObservation, LayoutRequest, MotionRequest, NavigationObservation, NavigationRequest,
    PageDriver, PresenceRequest, Visibility,
};
use crate::error::{QcError, Result};
use crate::motion::PositionSample;
use crate::site::ViewportProfile;

/// Prefix of the stdout line carrying a probe's result
const RESULT_MARKER: &str = "__QC_RESULT__";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    /// Default timeout for every Playwright operation
    pub operation_timeout_ms: u64,
    /// Directory whose `node_modules` provides `playwright`
    pub node_project_dir: PathBuf,
    /// Viewport for probes that do not set their own
    pub default_viewport: ViewportProfile,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trendsite.example.com".to_string(),
            browser: Browser::Chromium,
            headless: true,
            operation_timeout_ms: 30_000,
            node_project_dir: PathBuf::from("."),
            default_viewport: ViewportProfile::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScriptOutcome {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    payload: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PresencePayload {
    selectors: Vec<Visibility>,
}

#[derive(Debug, Deserialize)]
struct MotionPayload {
    samples: Vec<PositionSample>,
}

#[derive(Debug, Deserialize)]
struct ConsolePayload {
    messages: Vec<ConsoleMessage>,
}

/// [`PageDriver`] backed by Playwright
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
}

impl PlaywrightDriver {
    /// Create a driver, verifying that Playwright is installed
    pub async fn new(config: PlaywrightConfig) -> Result<Self> {
        Self::check_playwright_installed().await?;
        Ok(Self::without_check(config))
    }

    /// Create a driver without probing for Playwright
    pub fn without_check(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    async fn check_playwright_installed() -> Result<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(QcError::PlaywrightNotFound),
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Wrap a probe body in browser setup and result reporting
    pub fn build_script(&self, viewport: &ViewportProfile, body: &str) -> String {
        let mut context = serde_json::json!({
            "viewport": { "width": viewport.width, "height": viewport.height },
            "deviceScaleFactor": viewport.device_scale_factor,
            "isMobile": viewport.is_mobile,
            "hasTouch": viewport.has_touch,
        });
        if let Some(ua) = &viewport.user_agent {
            context["userAgent"] = serde_json::Value::String(ua.clone());
        }

        format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({context});
  const page = await context.newPage();
  page.setDefaultTimeout({timeout});
  page.setDefaultNavigationTimeout({timeout});
  const baseUrl = {base_url};
  let result = {{}};

  try {{
{body}
    console.log({marker} + JSON.stringify(Object.assign({{ ok: true }}, result)));
  }} catch (error) {{
    const kind = error && error.name === 'TimeoutError' ? 'timeout' : 'error';
    const message = String((error && error.message) || error);
    console.log({marker} + JSON.stringify({{ ok: false, kind, error: message }}));
    process.exitCode = 1;
  }} finally {{
    await context.close();
    await browser.close();
  }}
}})();
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            context = context,
            timeout = self.config.operation_timeout_ms,
            base_url = js(self.base_url()),
            body = body,
            marker = js(RESULT_MARKER),
        )
    }

    pub fn presence_body(request: &PresenceRequest) -> String {
        format!(
            r#"    await page.goto(baseUrl + {path}, {{ waitUntil: 'load' }});
    const checks = [];
    for (const selector of {selectors}) {{
      let visible = true;
      try {{
        await page.waitForSelector(selector, {{ state: 'visible', timeout: {timeout} }});
      }} catch (e) {{
        visible = false;
      }}
      checks.push({{ selector, visible }});
    }}
    result = {{ selectors: checks }};"#,
            path = js(&request.path),
            selectors = js(&request.selectors),
            timeout = request.timeout_ms,
        )
    }

    pub fn motion_body(request: &MotionRequest) -> String {
        format!(
            r#"    await page.goto(baseUrl + {path}, {{ waitUntil: 'load' }});
    const container = page.locator({container}).first();
    await container.waitFor({{ state: 'visible', timeout: {timeout} }});
    await container.scrollIntoViewIfNeeded();
    const content = page.locator({content}).first();
    await content.waitFor({{ state: 'attached', timeout: {timeout} }});
    const samples = [];
    const start = Date.now();
    for (const at of {offsets}) {{
      const wait = at - (Date.now() - start);
      if (wait > 0) await page.waitForTimeout(wait);
      const x = await content.evaluate(el => el.getBoundingClientRect().left);
      samples.push({{ at_ms: at, x }});
    }}
    result = {{ samples }};"#,
            path = js(&request.path),
            container = js(&request.container),
            content = js(&request.content),
            offsets = js(&request.offsets_ms),
            timeout = request.timeout_ms,
        )
    }

    pub fn navigation_body(request: &NavigationRequest) -> String {
        let shot = request.screenshot.to_string_lossy().to_string();
        format!(
            r#"    await page.goto(baseUrl + {start}, {{ waitUntil: 'load' }});
    await page.waitForSelector({nav}, {{ state: 'visible', timeout: {timeout} }});
    await page.locator({link}).first().click({{ timeout: {timeout} }});
    await page.waitForLoadState('load');
    let marker_visible = true;
    try {{
      await page.waitForSelector({marker}, {{ state: 'visible', timeout: {timeout} }});
    }} catch (e) {{
      marker_visible = false;
    }}
    await page.screenshot({{ path: {shot}, fullPage: true }});
    result = {{ final_url: page.url(), marker_visible, screenshot: {shot} }};"#,
            start = js(&request.start_path),
            nav = js(&request.nav),
            link = js(&request.link),
            marker = js(&request.marker),
            timeout = request.timeout_ms,
            shot = js(&shot),
        )
    }

    pub fn console_body(path: &str) -> String {
        format!(
            r#"    const messages = [];
    page.on('pageerror', err => {{
      messages.push({{ source: 'page_error', text: String((err && err.message) || err), url: null }});
    }});
    page.on('console', msg => {{
      if (msg.type() !== 'error') return;
      const loc = msg.location();
      messages.push({{ source: 'console', text: msg.text(), url: loc && loc.url ? loc.url : null }});
    }});
    await page.goto(baseUrl + {path}, {{ waitUntil: 'networkidle' }});
    result = {{ messages }};"#,
            path = js(path),
        )
    }

    pub fn layout_body(request: &LayoutRequest) -> String {
        let shot = request.screenshot.to_string_lossy().to_string();
        format!(
            r#"    await page.goto(baseUrl + {path}, {{ waitUntil: 'networkidle' }});
    const metrics = await page.evaluate(() => ({{
      scroll_width: document.documentElement.scrollWidth,
      client_width: document.documentElement.clientWidth,
    }}));
    let logo_visible = true;
    try {{
      await page.waitForSelector({logo}, {{ state: 'visible', timeout: {timeout} }});
    }} catch (e) {{
      logo_visible = false;
    }}
    await page.screenshot({{ path: {shot}, fullPage: true }});
    result = Object.assign(metrics, {{ logo_visible, screenshot: {shot} }});"#,
            path = js(&request.path),
            logo = js(&request.logo),
            timeout = request.timeout_ms,
            shot = js(&shot),
        )
    }

    /// Run a script and decode its result payload
    async fn run<T: DeserializeOwned>(&self, script: &str, budget_ms: u64) -> Result<T> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("probe.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright probe: {}", script_path.display());

        let node_modules = self.config.node_project_dir.join("node_modules");
        let child = Command::new("node")
            .arg(&script_path)
            .current_dir(&self.config.node_project_dir)
            .env("NODE_PATH", node_modules)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(Duration::from_millis(budget_ms), child.wait_with_output())
            .await
            .map_err(|_| QcError::Timeout(format!("Playwright probe exceeded {} ms", budget_ms)))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        decode_outcome(&stdout, &stderr)
    }

    /// Wall-clock budget for one probe: navigation plus `waits` bounded waits
    fn budget(&self, waits: u64, extra_ms: u64) -> u64 {
        self.config.operation_timeout_ms * (2 + waits) + extra_ms
    }
}

/// Find the marked result line and turn it into a payload or an error
fn decode_outcome<T: DeserializeOwned>(stdout: &str, stderr: &str) -> Result<T> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|l| l.trim().strip_prefix(RESULT_MARKER))
        .ok_or_else(|| {
            QcError::Playwright(format!(
                "Probe produced no result:\nstdout: {}\nstderr: {}",
                stdout, stderr
            ))
        })?;

    let outcome: ScriptOutcome = serde_json::from_str(line)?;
    if !outcome.ok {
        let message = outcome.error.unwrap_or_else(|| "unknown error".to_string());
        return Err(match outcome.kind.as_deref() {
            Some("timeout") => QcError::Timeout(message),
            _ => QcError::Playwright(message),
        });
    }

    Ok(serde_json::from_value(serde_json::Value::Object(outcome.payload))?)
}

/// Encode a value as a JavaScript literal
fn js<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn check_visible(&self, request: &PresenceRequest) -> Result<Vec<Visibility>> {
        let script = self.build_script(&self.config.default_viewport, &Self::presence_body(request));
        let waits = request.selectors.len() as u64;
        let payload: PresencePayload = self.run(&script, self.budget(waits, 0)).await?;
        Ok(payload.selectors)
    }

    async fn sample_positions(&self, request: &MotionRequest) -> Result<Vec<PositionSample>> {
        let script = self.build_script(&self.config.default_viewport, &Self::motion_body(request));
        let span = request.offsets_ms.iter().copied().max().unwrap_or(0);
        let payload: MotionPayload = self.run(&script, self.budget(2, span)).await?;
        Ok(payload.samples)
    }

    async fn follow_link(&self, request: &NavigationRequest) -> Result<NavigationObservation> {
        let script = self.build_script(&self.config.default_viewport, &Self::navigation_body(request));
        self.run(&script, self.budget(3, 0)).await
    }

    async fn collect_console(&self, path: &str) -> Result<Vec<ConsoleMessage>> {
        let script = self.build_script(&self.config.default_viewport, &Self::console_body(path));
        let payload: ConsolePayload = self.run(&script, self.budget(0, 0)).await?;
        Ok(payload.messages)
    }

    async fn measure_layout(&self, request: &LayoutRequest) -> Result<LayoutObservation> {
        let script = self.build_script(&request.viewport, &Self::layout_body(request));
        self.run(&script, self.budget(1, 0)).await
    }
}
