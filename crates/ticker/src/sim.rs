//! Deterministic, frame-by-frame simulation of a ticker
//!
//! [`RecordingHost`] stands in for the browser: it records mounted markup and
//! offsets and hands out frame ids. [`simulate`] drives a ticker with it at a
//! fixed frame interval, optionally hiding the widget for some windows.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::TickerConfig;
use crate::machine::Phase;
use crate::repo::TrendingRepo;
use crate::state::Direction;
use crate::widget::{FrameId, Ticker, TickerHost};

/// Host double that records everything the ticker asks of it
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub mounted: Vec<String>,
    pub offsets: Vec<f64>,
    pub frames_requested: u64,
    pub frames_cancelled: u64,
    outstanding: HashSet<FrameId>,
    max_outstanding: usize,
    next_id: u64,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames requested and neither fired nor cancelled
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Highest number of simultaneously outstanding frames ever observed
    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding
    }

    /// Mark a frame as fired. Returns false if it was not outstanding.
    pub fn fire(&mut self, id: FrameId) -> bool {
        self.outstanding.remove(&id)
    }
}

impl TickerHost for RecordingHost {
    fn mount(&mut self, html: &str) {
        self.mounted.push(html.to_string());
    }

    fn set_offset(&mut self, px: f64) {
        self.offsets.push(px);
    }

    fn request_frame(&mut self) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        self.frames_requested += 1;
        self.outstanding.insert(id);
        self.max_outstanding = self.max_outstanding.max(self.outstanding.len());
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.outstanding.remove(&id) {
            self.frames_cancelled += 1;
        }
    }
}

/// Inputs for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub content_width: f64,
    pub container_width: f64,
    pub duration_ms: f64,
    pub frame_ms: f64,
    /// Half-open `[from, to)` windows during which the widget is off-screen
    pub hidden: Vec<(f64, f64)>,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self {
            content_width: 2400.0,
            container_width: 1280.0,
            duration_ms: 10_000.0,
            frame_ms: 1000.0 / 60.0,
            hidden: Vec::new(),
        }
    }
}

impl SimulationPlan {
    fn is_hidden(&self, at_ms: f64) -> bool {
        self.hidden.iter().any(|(from, to)| at_ms >= *from && at_ms < *to)
    }
}

/// One observation per simulated frame
#[derive(Debug, Clone, Serialize)]
pub struct TraceSample {
    pub at_ms: f64,
    pub position: f64,
    pub direction: Direction,
    pub paused: bool,
    pub visible: bool,
}

/// Result of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationTrace {
    pub samples: Vec<TraceSample>,
    pub min_position: f64,
    pub frames_requested: u64,
    pub frames_cancelled: u64,
    pub max_pending_frames: usize,
}

/// Run a ticker over `plan` and record its trajectory
pub fn simulate(config: TickerConfig, repos: Vec<TrendingRepo>, plan: &SimulationPlan) -> SimulationTrace {
    let frame_ms = if plan.frame_ms.is_finite() && plan.frame_ms > 0.0 {
        plan.frame_ms
    } else {
        1000.0 / 60.0
    };

    let mut ticker = Ticker::new(config, RecordingHost::new());
    ticker.dispatch(crate::machine::TickerEvent::DataLoaded(Ok(repos)));
    ticker.set_layout(plan.content_width, plan.container_width);

    let mut samples = Vec::new();
    let mut visible = false;
    let mut frame = 0u64;

    loop {
        let at_ms = frame as f64 * frame_ms;
        if at_ms > plan.duration_ms {
            break;
        }

        let should_show = !plan.is_hidden(at_ms);
        if should_show != visible {
            visible = should_show;
            ticker.set_visibility(if visible { 1.0 } else { 0.0 });
        }

        if let Some(id) = ticker.pending_frame() {
            ticker.host_mut().fire(id);
            ticker.on_frame(id, at_ms);
        }

        let state = ticker.machine().state();
        samples.push(TraceSample {
            at_ms,
            position: state.position(),
            direction: state.direction(),
            paused: state.is_paused(),
            visible: state.is_visible(),
        });
        frame += 1;
    }

    let min_position = ticker.machine().state().min_position();
    debug_assert!(ticker.machine().phase() == Phase::Ready);
    ticker.teardown();

    let host = ticker.host();
    SimulationTrace {
        samples,
        min_position,
        frames_requested: host.frames_requested,
        frames_cancelled: host.frames_cancelled,
        max_pending_frames: host.max_outstanding(),
    }
}
