//! Trendsite Ticker Engine
//!
//! Renders a strip of trending-repository cards and animates it with an
//! explicit, per-widget state machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Ticker<H: TickerHost>                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  fixture::load(source) -> Vec<TrendingRepo> | FetchError    │
//! │        │                                                    │
//! │        ▼ DataLoaded                                         │
//! │  TickerMachine::handle(event) -> [Effect]     (pure)        │
//! │    ├── DataLoaded / VisibilityChanged / Tick                │
//! │    ├── Layout / Teardown                                    │
//! │    └── TickerState::advance(now_ms)                         │
//! │        │                                                    │
//! │        ▼ Mount / SetOffset / RequestFrame / CancelFrame     │
//! │  TickerHost (DOM, RecordingHost, ...)                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod fixture;
pub mod machine;
pub mod render;
pub mod repo;
pub mod sim;
pub mod state;
pub mod widget;

pub use config::{LoopStrategy, TickerConfig};
pub use error::FetchError;
pub use fixture::FixtureSource;
pub use machine::{Effect, Phase, TickerEvent, TickerMachine};
pub use repo::TrendingRepo;
pub use state::{Direction, TickerState};
pub use widget::{FrameId, Ticker, TickerHost};
