//! Browser seam
//!
//! QC cases talk to the browser only through [`PageDriver`]. Each call opens
//! a fresh page context and closes it before returning, so no animation frame
//! or timer outlives the probe that started it.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::console::ConsoleMessage;
use crate::error::Result;
use crate::motion::PositionSample;
use crate::site::ViewportProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub selector: String,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct PresenceRequest {
    pub path: String,
    pub selectors: Vec<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct MotionRequest {
    pub path: String,
    pub container: String,
    pub content: String,
    pub offsets_ms: Vec<u64>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub start_path: String,
    pub nav: String,
    pub link: String,
    pub marker: String,
    pub timeout_ms: u64,
    pub screenshot: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationObservation {
    pub final_url: String,
    pub marker_visible: bool,
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LayoutRequest {
    pub viewport: ViewportProfile,
    pub path: String,
    pub logo: String,
    pub timeout_ms: u64,
    pub screenshot: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutObservation {
    pub scroll_width: f64,
    pub client_width: f64,
    pub logo_visible: bool,
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
}

/// Browser operations the QC cases are built from
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load `path` and report which selectors became visible in time
    async fn check_visible(&self, request: &PresenceRequest) -> Result<Vec<Visibility>>;

    /// Load `path`, bring the ticker into view and read its content x-offset
    /// at each of `offsets_ms` after the first read
    async fn sample_positions(&self, request: &MotionRequest) -> Result<Vec<PositionSample>>;

    /// Load the start page, activate a link and observe where we ended up
    async fn follow_link(&self, request: &NavigationRequest) -> Result<NavigationObservation>;

    /// Load `path` and collect script errors and error-level console output
    /// until the network goes idle
    async fn collect_console(&self, path: &str) -> Result<Vec<ConsoleMessage>>;

    /// Load `path` at a viewport and measure horizontal overflow
    async fn measure_layout(&self, request: &LayoutRequest) -> Result<LayoutObservation>;
}
