//! Ticker configuration

use serde::{Deserialize, Serialize};

/// How the strip loops once it runs out of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStrategy {
    /// Ping-pong between the two bounds with a dwell at each end.
    /// Content is rendered once.
    #[default]
    Bounce,
    /// Scroll in one direction forever. Content is rendered twice and the
    /// offset wraps after one copy's width.
    Wraparound,
}

impl std::fmt::Display for LoopStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopStrategy::Bounce => write!(f, "bounce"),
            LoopStrategy::Wraparound => write!(f, "wraparound"),
        }
    }
}

impl std::str::FromStr for LoopStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bounce" => Ok(LoopStrategy::Bounce),
            "wraparound" => Ok(LoopStrategy::Wraparound),
            other => Err(format!("unknown loop strategy: {}", other)),
        }
    }
}

/// Tunables for one ticker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Scroll speed in pixels per second
    pub speed_px_per_sec: f64,

    /// Pause at each end of the track, in milliseconds
    pub dwell_ms: f64,

    /// Minimum intersection ratio for the container to count as visible
    pub visibility_threshold: f64,

    /// Loop strategy
    pub strategy: LoopStrategy,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            speed_px_per_sec: 50.0,
            dwell_ms: 2000.0,
            visibility_threshold: 0.1,
            strategy: LoopStrategy::Bounce,
        }
    }
}

impl TickerConfig {
    pub(crate) fn speed_px_per_ms(&self) -> f64 {
        self.speed_px_per_sec / 1000.0
    }

    /// Whether an intersection ratio counts as visible.
    ///
    /// A ratio of zero is never visible, even with a zero threshold.
    pub fn is_visible(&self, ratio: f64) -> bool {
        ratio > 0.0 && ratio >= self.visibility_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TickerConfig::default();
        assert_eq!(config.speed_px_per_sec, 50.0);
        assert_eq!(config.dwell_ms, 2000.0);
        assert_eq!(config.strategy, LoopStrategy::Bounce);
    }

    #[test]
    fn test_visibility_threshold() {
        let config = TickerConfig {
            visibility_threshold: 0.25,
            ..Default::default()
        };
        assert!(!config.is_visible(0.0));
        assert!(!config.is_visible(0.2));
        assert!(config.is_visible(0.25));
        assert!(config.is_visible(1.0));

        let zero = TickerConfig {
            visibility_threshold: 0.0,
            ..Default::default()
        };
        assert!(!zero.is_visible(0.0));
        assert!(zero.is_visible(0.01));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("bounce".parse::<LoopStrategy>().unwrap(), LoopStrategy::Bounce);
        assert_eq!("wraparound".parse::<LoopStrategy>().unwrap(), LoopStrategy::Wraparound);
        assert!("spin".parse::<LoopStrategy>().is_err());
    }
}
