//! Motion proof: shows the ticker is animating, not merely present
//!
//! Positions are sampled in a single page session at fixed offsets. The
//! primary window is `[0, interval]`. If both primary samples land inside a
//! dwell (or the strip bounces back to where it started), a third sample
//! taken one dwell later decides.

use serde::{Deserialize, Serialize};
use trendsite_ticker::TickerConfig;

/// Horizontal position of the ticker content at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub at_ms: u64,
    pub x: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionPolicy {
    /// Primary observation window
    pub interval_ms: u64,
    /// Minimum displacement that counts as motion
    pub threshold_px: f64,
    /// Extra time for the disambiguating sample; zero disables it
    pub widen_by_ms: u64,
}

impl Default for MotionPolicy {
    fn default() -> Self {
        let dwell = TickerConfig::default().dwell_ms as u64;
        Self {
            interval_ms: 3000,
            threshold_px: 5.0,
            widen_by_ms: dwell + 500,
        }
    }
}

/// Outcome of evaluating a set of samples
#[derive(Debug, Clone, PartialEq)]
pub enum MotionVerdict {
    /// Moved within the primary window
    Moving { delta_px: f64 },
    /// Only the widened sample showed motion
    MovingAfterWidening { delta_px: f64 },
    /// No sample moved far enough
    Stalled { max_delta_px: f64 },
}

impl MotionPolicy {
    /// Offsets (ms after the first sample) at which to read the position
    pub fn sample_offsets(&self) -> Vec<u64> {
        let mut offsets = vec![0, self.interval_ms];
        if self.widen_by_ms > 0 {
            offsets.push(self.interval_ms + self.widen_by_ms);
        }
        offsets
    }

    pub fn evaluate(&self, samples: &[PositionSample]) -> MotionVerdict {
        let Some(first) = samples.first() else {
            return MotionVerdict::Stalled { max_delta_px: 0.0 };
        };

        let primary = samples
            .iter()
            .find(|s| s.at_ms == self.interval_ms)
            .map(|s| (s.x - first.x).abs());
        if let Some(delta) = primary {
            if delta > self.threshold_px {
                return MotionVerdict::Moving { delta_px: delta };
            }
        }

        // any pair of samples, since a bounce can return to the first x
        let mut max_delta: f64 = 0.0;
        for (i, a) in samples.iter().enumerate() {
            for b in &samples[i + 1..] {
                max_delta = max_delta.max((b.x - a.x).abs());
            }
        }

        if max_delta > self.threshold_px {
            MotionVerdict::MovingAfterWidening { delta_px: max_delta }
        } else {
            MotionVerdict::Stalled {
                max_delta_px: max_delta,
            }
        }
    }
}
