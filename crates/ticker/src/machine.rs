//! Ticker state machine
//!
//! Every input is an event. [`TickerMachine::handle`] applies it to the
//! animation state and returns the side effects the host must perform. The
//! machine never touches a host itself, which keeps transitions testable.

use tracing::{debug, warn};

use crate::config::TickerConfig;
use crate::error::FetchError;
use crate::render;
use crate::repo::TrendingRepo;
use crate::state::TickerState;

/// Inputs to the machine
#[derive(Debug)]
pub enum TickerEvent {
    /// Fixture retrieval finished
    DataLoaded(Result<Vec<TrendingRepo>, FetchError>),

    /// The container's intersection ratio changed
    VisibilityChanged { ratio: f64 },

    /// Widths were (re)measured after mount or resize
    Layout {
        content_width: f64,
        container_width: f64,
    },

    /// A requested animation frame fired
    Tick { now_ms: f64 },

    /// The widget is being unmounted
    Teardown,
}

/// Side effects for the host
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the container contents
    Mount { html: String },

    /// Translate the content element horizontally
    SetOffset { px: f64 },

    /// Schedule one animation frame
    RequestFrame,

    /// Cancel the pending animation frame
    CancelFrame,
}

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Unavailable,
    TornDown,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Loading => write!(f, "loading"),
            Phase::Ready => write!(f, "ready"),
            Phase::Unavailable => write!(f, "unavailable"),
            Phase::TornDown => write!(f, "torn_down"),
        }
    }
}

/// Pure transition logic for one ticker instance
#[derive(Debug, Clone)]
pub struct TickerMachine {
    phase: Phase,
    state: TickerState,
    frame_pending: bool,
}

impl TickerMachine {
    pub fn new(config: TickerConfig) -> Self {
        Self {
            phase: Phase::Loading,
            state: TickerState::new(config),
            frame_pending: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &TickerState {
        &self.state
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Apply one event and return the effects it causes
    pub fn handle(&mut self, event: TickerEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            TickerEvent::DataLoaded(result) => {
                if self.phase != Phase::Loading {
                    debug!("Ignoring fixture result in phase {}", self.phase);
                } else {
                    match result {
                        Ok(repos) => {
                            debug!("Ticker ready with {} repos", repos.len());
                            let html = render::render(&repos, self.state.config().strategy);
                            effects.push(Effect::Mount { html });
                            self.phase = Phase::Ready;
                        }
                        Err(e) => {
                            warn!("Ticker data unavailable: {}", e);
                            effects.push(Effect::Mount {
                                html: render::render_unavailable(),
                            });
                            self.phase = Phase::Unavailable;
                        }
                    }
                }
            }
            TickerEvent::VisibilityChanged { ratio } => {
                if self.phase != Phase::TornDown {
                    let visible = self.state.config().is_visible(ratio);
                    self.state.set_visible(visible);
                }
            }
            TickerEvent::Layout {
                content_width,
                container_width,
            } => {
                if self.phase == Phase::Ready {
                    self.state.set_layout(content_width, container_width);
                    effects.push(Effect::SetOffset {
                        px: self.state.position(),
                    });
                }
            }
            TickerEvent::Tick { now_ms } => {
                self.frame_pending = false;
                if self.phase == Phase::Ready {
                    let before = self.state.position();
                    self.state.advance(now_ms);
                    if self.state.position() != before {
                        effects.push(Effect::SetOffset {
                            px: self.state.position(),
                        });
                    }
                }
            }
            TickerEvent::Teardown => {
                if self.frame_pending {
                    effects.push(Effect::CancelFrame);
                    self.frame_pending = false;
                }
                self.state.reset();
                self.phase = Phase::TornDown;
            }
        }

        self.sync_frame(&mut effects);
        effects
    }

    /// Keep exactly zero or one frame pending depending on whether the
    /// loop should be running.
    fn sync_frame(&mut self, effects: &mut Vec<Effect>) {
        let should_run = self.phase == Phase::Ready && self.state.is_visible();
        if should_run && !self.frame_pending {
            effects.push(Effect::RequestFrame);
            self.frame_pending = true;
        } else if !should_run && self.frame_pending {
            effects.push(Effect::CancelFrame);
            self.frame_pending = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Direction;

    fn repos() -> Vec<TrendingRepo> {
        vec![TrendingRepo {
            name: "a/b".to_string(),
            url: "https://github.com/a/b".to_string(),
            stars_today: 42,
            language: "Rust".to_string(),
            trending_score: 1.0,
        }]
    }

    fn ready_machine() -> TickerMachine {
        let mut machine = TickerMachine::new(TickerConfig::default());
        machine.handle(TickerEvent::DataLoaded(Ok(repos())));
        machine.handle(TickerEvent::Layout {
            content_width: 1000.0,
            container_width: 400.0,
        });
        machine
    }

    #[test]
    fn test_data_loaded_mounts_without_frame_until_visible() {
        let mut machine = TickerMachine::new(TickerConfig::default());
        let effects = machine.handle(TickerEvent::DataLoaded(Ok(repos())));
        assert!(matches!(effects.as_slice(), [Effect::Mount { .. }]));
        assert_eq!(machine.phase(), Phase::Ready);
        assert!(!machine.frame_pending());

        let effects = machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 });
        assert_eq!(effects, vec![Effect::RequestFrame]);
    }

    #[test]
    fn test_visible_before_data_requests_on_load() {
        let mut machine = TickerMachine::new(TickerConfig::default());
        assert!(machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 }).is_empty());
        let effects = machine.handle(TickerEvent::DataLoaded(Ok(repos())));
        assert_eq!(effects.last(), Some(&Effect::RequestFrame));
    }

    #[test]
    fn test_fetch_failure_never_requests_frames() {
        let mut machine = TickerMachine::new(TickerConfig::default());
        let err = serde_json::from_str::<Vec<TrendingRepo>>("nope").unwrap_err();
        let mut effects = machine.handle(TickerEvent::DataLoaded(Err(err.into())));
        effects.extend(machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 }));
        effects.extend(machine.handle(TickerEvent::Tick { now_ms: 16.0 }));

        assert_eq!(machine.phase(), Phase::Unavailable);
        assert!(!effects.contains(&Effect::RequestFrame));
        match &effects[0] {
            Effect::Mount { html } => assert!(html.contains(render::UNAVAILABLE_MESSAGE)),
            other => panic!("unexpected effect: {:?}", other),
        }
    }

    #[test]
    fn test_tick_rerequests_one_frame() {
        let mut machine = ready_machine();
        machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 });
        machine.handle(TickerEvent::Tick { now_ms: 0.0 });
        let effects = machine.handle(TickerEvent::Tick { now_ms: 1000.0 });
        assert_eq!(effects.len(), 2);
        match effects[0] {
            Effect::SetOffset { px } => assert!((px + 50.0).abs() < 1e-9),
            ref other => panic!("unexpected effect: {:?}", other),
        }
        assert_eq!(effects[1], Effect::RequestFrame);
        assert_eq!(machine.state().direction(), Direction::Reverse);
    }

    #[test]
    fn test_hiding_cancels_pending_frame() {
        let mut machine = ready_machine();
        machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 });
        let effects = machine.handle(TickerEvent::VisibilityChanged { ratio: 0.0 });
        assert_eq!(effects, vec![Effect::CancelFrame]);
        assert!(!machine.frame_pending());

        // a stray tick while hidden neither moves nor reschedules
        let effects = machine.handle(TickerEvent::Tick { now_ms: 5000.0 });
        assert!(effects.is_empty());
        assert_eq!(machine.state().position(), 0.0);
    }

    #[test]
    fn test_repeated_visibility_does_not_double_schedule() {
        let mut machine = ready_machine();
        let first = machine.handle(TickerEvent::VisibilityChanged { ratio: 0.8 });
        let second = machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 });
        assert_eq!(first, vec![Effect::RequestFrame]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_teardown_cancels_and_stops() {
        let mut machine = ready_machine();
        machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 });
        let effects = machine.handle(TickerEvent::Teardown);
        assert_eq!(effects, vec![Effect::CancelFrame]);
        assert_eq!(machine.phase(), Phase::TornDown);

        let effects = machine.handle(TickerEvent::VisibilityChanged { ratio: 1.0 });
        assert!(effects.is_empty());
    }

    #[test]
    fn test_late_data_after_teardown_is_ignored() {
        let mut machine = TickerMachine::new(TickerConfig::default());
        machine.handle(TickerEvent::Teardown);
        let effects = machine.handle(TickerEvent::DataLoaded(Ok(repos())));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), Phase::TornDown);
    }
}
