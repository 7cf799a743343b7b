//! Animation state for a single ticker instance
//!
//! Pure bookkeeping: no timers, no host calls. The dwell at each end of the
//! track is a deadline compared against tick timestamps, so tearing a ticker
//! down never leaves a timer behind.

use serde::{Deserialize, Serialize};

use crate::config::{LoopStrategy, TickerConfig};

/// Scroll direction.
///
/// `Forward` moves toward the `0` bound, `Reverse` toward
/// `-(content_width - container_width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dwell {
    Idle,
    /// Frozen until this tick timestamp (ms)
    Until(f64),
    /// Hidden mid-dwell; this much dwell is still owed
    Suspended(f64),
}

/// Position, direction and dwell of one ticker
#[derive(Debug, Clone)]
pub struct TickerState {
    config: TickerConfig,
    position: f64,
    direction: Direction,
    dwell: Dwell,
    visible: bool,
    content_width: f64,
    container_width: f64,
    last_tick: Option<f64>,
}

impl TickerState {
    pub fn new(config: TickerConfig) -> Self {
        Self {
            config,
            position: 0.0,
            direction: Direction::Reverse,
            dwell: Dwell::Idle,
            visible: false,
            content_width: 0.0,
            container_width: 0.0,
            last_tick: None,
        }
    }

    pub fn config(&self) -> &TickerConfig {
        &self.config
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True while a dwell is in progress (including one owed across a hide)
    pub fn is_paused(&self) -> bool {
        !matches!(self.dwell, Dwell::Idle)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn content_width(&self) -> f64 {
        self.content_width
    }

    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    /// Lowest reachable offset, `-(content_width - container_width)`
    pub fn min_position(&self) -> f64 {
        -self.travel()
    }

    fn travel(&self) -> f64 {
        (self.content_width - self.container_width).max(0.0)
    }

    /// Width after which a wraparound strip repeats itself
    fn wrap_period(&self) -> f64 {
        (self.content_width / 2.0).min(self.travel())
    }

    /// Apply freshly measured widths and pull the position back into range
    pub fn set_layout(&mut self, content_width: f64, container_width: f64) {
        self.content_width = sanitize_width(content_width);
        self.container_width = sanitize_width(container_width);

        let travel = self.travel();
        self.position = self.position.clamp(-travel, 0.0);
        if self.config.strategy == LoopStrategy::Wraparound && travel > 0.0 {
            self.position = -(-self.position).rem_euclid(self.wrap_period());
        }
    }

    /// Record a visibility transition.
    ///
    /// Hiding drops the tick baseline and banks whatever dwell is left, so
    /// the hidden interval is neither animated nor counted as dwell.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;

        if !visible {
            if let Dwell::Until(deadline) = self.dwell {
                let seen = self.last_tick.unwrap_or(deadline);
                self.dwell = Dwell::Suspended((deadline - seen).max(0.0));
            }
            self.last_tick = None;
        }
    }

    /// Advance to the tick timestamp `now_ms`.
    ///
    /// The first tick after start or resume only establishes the baseline.
    pub fn advance(&mut self, now_ms: f64) {
        if !self.visible || !now_ms.is_finite() {
            return;
        }

        let last = match self.last_tick {
            Some(last) => last,
            None => {
                self.last_tick = Some(now_ms);
                if let Dwell::Suspended(remaining) = self.dwell {
                    self.dwell = Dwell::Until(now_ms + remaining);
                }
                return;
            }
        };
        self.last_tick = Some(now_ms.max(last));

        let mut from = last;
        match self.dwell {
            Dwell::Until(deadline) => {
                if now_ms < deadline {
                    return;
                }
                self.dwell = Dwell::Idle;
                from = from.max(deadline);
            }
            Dwell::Suspended(remaining) => {
                self.dwell = Dwell::Until(now_ms + remaining);
                return;
            }
            Dwell::Idle => {}
        }

        let elapsed = now_ms - from;
        if elapsed > 0.0 {
            self.step(elapsed, now_ms);
        }
    }

    fn step(&mut self, elapsed_ms: f64, now_ms: f64) {
        let travel = self.travel();
        if travel <= 0.0 {
            self.position = 0.0;
            return;
        }

        let delta = self.config.speed_px_per_ms() * elapsed_ms;
        match self.config.strategy {
            LoopStrategy::Bounce => {
                let next = self.position + self.direction.sign() * delta;
                match self.direction {
                    Direction::Forward if next >= 0.0 => {
                        self.position = 0.0;
                        self.flip(now_ms);
                    }
                    Direction::Reverse if next <= -travel => {
                        self.position = -travel;
                        self.flip(now_ms);
                    }
                    _ => self.position = next,
                }
            }
            LoopStrategy::Wraparound => {
                self.direction = Direction::Reverse;
                let travelled = (-self.position + delta).rem_euclid(self.wrap_period());
                self.position = -travelled;
            }
        }
    }

    fn flip(&mut self, now_ms: f64) {
        self.direction = self.direction.flipped();
        self.dwell = if self.config.dwell_ms > 0.0 {
            Dwell::Until(now_ms + self.config.dwell_ms)
        } else {
            Dwell::Idle
        };
    }

    /// Back to a freshly created state, keeping config and layout
    pub fn reset(&mut self) {
        let (content, container) = (self.content_width, self.container_width);
        *self = TickerState::new(self.config.clone());
        self.set_layout(content, container);
    }
}

fn sanitize_width(width: f64) -> f64 {
    if width.is_finite() && width > 0.0 {
        width
    } else {
        0.0
    }
}
