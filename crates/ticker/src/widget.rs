//! Host adapter: runs a [`TickerMachine`] against a concrete host

use tracing::debug;

use crate::config::TickerConfig;
use crate::fixture::{self, FixtureSource};
use crate::machine::{Effect, TickerEvent, TickerMachine};

/// Handle for a scheduled animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// What a ticker needs from its environment: a place to mount markup, a way
/// to move the strip, and a frame scheduler.
pub trait TickerHost {
    fn mount(&mut self, html: &str);
    fn set_offset(&mut self, px: f64);
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
}

/// One ticker widget bound to its host
pub struct Ticker<H: TickerHost> {
    machine: TickerMachine,
    host: H,
    pending: Option<FrameId>,
}

impl<H: TickerHost> Ticker<H> {
    pub fn new(config: TickerConfig, host: H) -> Self {
        Self {
            machine: TickerMachine::new(config),
            host,
            pending: None,
        }
    }

    pub fn machine(&self) -> &TickerMachine {
        &self.machine
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn pending_frame(&self) -> Option<FrameId> {
        self.pending
    }

    /// Fetch the fixture once and feed the outcome to the machine
    pub async fn load(&mut self, source: &FixtureSource) {
        let result = fixture::load(source).await;
        self.dispatch(TickerEvent::DataLoaded(result));
    }

    /// Feed an event to the machine and apply its effects
    pub fn dispatch(&mut self, event: TickerEvent) {
        for effect in self.machine.handle(event) {
            self.apply(effect);
        }
    }

    /// Called by the host when frame `id` fires at `now_ms`.
    ///
    /// Frames that are no longer pending (cancelled or superseded) are ignored.
    pub fn on_frame(&mut self, id: FrameId, now_ms: f64) {
        if self.pending != Some(id) {
            debug!("Ignoring stale frame {:?}", id);
            return;
        }
        self.pending = None;
        self.dispatch(TickerEvent::Tick { now_ms });
    }

    pub fn set_visibility(&mut self, ratio: f64) {
        self.dispatch(TickerEvent::VisibilityChanged { ratio });
    }

    pub fn set_layout(&mut self, content_width: f64, container_width: f64) {
        self.dispatch(TickerEvent::Layout {
            content_width,
            container_width,
        });
    }

    /// Stop the loop for good. Idempotent.
    pub fn teardown(&mut self) {
        self.dispatch(TickerEvent::Teardown);
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Mount { html } => self.host.mount(&html),
            Effect::SetOffset { px } => self.host.set_offset(px),
            Effect::RequestFrame => {
                if let Some(stale) = self.pending.take() {
                    self.host.cancel_frame(stale);
                }
                self.pending = Some(self.host.request_frame());
            }
            Effect::CancelFrame => {
                if let Some(id) = self.pending.take() {
                    self.host.cancel_frame(id);
                }
            }
        }
    }
}

impl<H: TickerHost> Drop for Ticker<H> {
    fn drop(&mut self) {
        if self.pending.is_some() {
            self.teardown();
        }
    }
}
