//! Speed estimation from a rolling wheel pulse counter
//!
//! The bus reports a 16-bit counter far more often than the displayed
//! speed should change. The estimator turns counter deltas into km/h,
//! discards samples taken too close together or after a gap, and
//! debounces the output.

use std::time::Duration;

use carstream_core::decode::KM_PER_MILE;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Thresholds for the speed filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedFilterConfig {
    /// Samples closer together than this are too noisy
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,
    /// Samples further apart than this are stale
    #[serde(default = "default_max_gap_ms")]
    pub max_gap_ms: u64,
    /// Counter delta per step is read as mph
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Always emit once this much time passed since the last emission
    #[serde(default = "default_emit_interval_ms")]
    pub emit_interval_ms: u64,
    /// Always emit when the value moved at least this much (km/h)
    #[serde(default = "default_emit_delta_kmh")]
    pub emit_delta_kmh: f32,
}

fn default_min_gap_ms() -> u64 {
    50
}

fn default_max_gap_ms() -> u64 {
    2000
}

fn default_step_ms() -> u64 {
    50
}

fn default_emit_interval_ms() -> u64 {
    100
}

fn default_emit_delta_kmh() -> f32 {
    0.2
}

impl Default for SpeedFilterConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: default_min_gap_ms(),
            max_gap_ms: default_max_gap_ms(),
            step_ms: default_step_ms(),
            emit_interval_ms: default_emit_interval_ms(),
            emit_delta_kmh: default_emit_delta_kmh(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    counter: u16,
    at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Emission {
    kmh: f32,
    at: Instant,
}

/// Stateful counter-to-speed filter, one per acquisition run
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    config: SpeedFilterConfig,
    baseline: Option<Baseline>,
    last_emit: Option<Emission>,
}

impl SpeedEstimator {
    pub fn new(config: SpeedFilterConfig) -> Self {
        Self {
            config,
            baseline: None,
            last_emit: None,
        }
    }

    /// Forget the baseline and the last emission
    pub fn reset(&mut self) {
        self.baseline = None;
        self.last_emit = None;
    }

    /// Feed one counter sample; returns a speed in km/h when one should be
    /// published
    pub fn update(&mut self, counter: u16, now: Instant) -> Option<f32> {
        let previous = self.baseline.replace(Baseline { counter, at: now })?;

        let elapsed_ms = now.saturating_duration_since(previous.at).as_millis() as u64;
        if elapsed_ms < self.config.min_gap_ms || elapsed_ms > self.config.max_gap_ms {
            tracing::trace!(elapsed_ms, "Speed sample outside plausible window");
            return None;
        }

        let steps = elapsed_ms as f64 / self.config.step_ms.max(1) as f64;
        if steps <= 0.0 {
            return None;
        }

        // Unsigned wraparound across the 16-bit boundary
        let delta = counter.wrapping_sub(previous.counter);
        let mph = (f64::from(delta) / steps).max(0.0);
        let kmh = (mph * f64::from(KM_PER_MILE)) as f32;

        if self.should_emit(kmh, now) {
            self.last_emit = Some(Emission { kmh, at: now });
            Some(kmh)
        } else {
            None
        }
    }

    fn should_emit(&self, kmh: f32, now: Instant) -> bool {
        match self.last_emit {
            None => true,
            Some(last) => {
                now.saturating_duration_since(last.at)
                    >= Duration::from_millis(self.config.emit_interval_ms)
                    || (kmh - last.kmh).abs() >= self.config.emit_delta_kmh
            }
        }
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(SpeedFilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_first_sample_is_baseline_only() {
        let mut est = SpeedEstimator::default();
        assert_eq!(est.update(100, Instant::now()), None);
    }

    #[test]
    fn test_steady_rate() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(1000, t0);

        // 4 pulses over 2 steps = 2 mph
        let kmh = est.update(1004, t0 + ms(100)).unwrap();
        assert!(close(kmh, 2.0 * 1.609344), "got {}", kmh);
    }

    #[test]
    fn test_too_close_resets_baseline() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(1000, t0);

        assert_eq!(est.update(1500, t0 + ms(49)), None);
        // Baseline is now 1500 @ 49ms, so 2 pulses over 100ms = 1 mph
        let kmh = est.update(1502, t0 + ms(149)).unwrap();
        assert!(close(kmh, 1.609344), "got {}", kmh);
    }

    #[test]
    fn test_gap_resets_baseline() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(1000, t0);

        assert_eq!(est.update(9000, t0 + ms(2001)), None);
        let kmh = est.update(9010, t0 + ms(2101)).unwrap();
        assert!(close(kmh, 5.0 * 1.609344), "got {}", kmh);
    }

    #[test]
    fn test_max_gap_still_emits() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(1000, t0);

        // 40 pulses over 40 steps = 1 mph
        let kmh = est.update(1040, t0 + ms(2000)).unwrap();
        assert!(close(kmh, 1.609344), "got {}", kmh);
    }

    #[test]
    fn test_counter_wraparound() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(65530, t0);

        // 65530 -> 10 wraps to a delta of 16: 8 mph over two steps
        let kmh = est.update(10, t0 + ms(100)).unwrap();
        assert!(close(kmh, 8.0 * 1.609344), "got {}", kmh);
    }

    #[test]
    fn test_debounce_suppresses_small_quick_changes() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(0, t0);

        // 2 pulses per step
        assert!(est.update(2, t0 + ms(50)).is_some());
        // Same rate 50ms later: below both thresholds
        assert_eq!(est.update(4, t0 + ms(100)), None);
        // Same rate, 100ms since the last emission
        assert!(est.update(6, t0 + ms(150)).is_some());
    }

    #[test]
    fn test_large_change_emits_immediately() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(0, t0);

        assert!(est.update(2, t0 + ms(50)).is_some());
        // 3 pulses per step is ~1.6 km/h faster, only 50ms after emitting
        let kmh = est.update(5, t0 + ms(100)).unwrap();
        assert!(close(kmh, 3.0 * 1.609344));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut est = SpeedEstimator::default();
        let t0 = Instant::now();
        est.update(0, t0);
        est.reset();
        assert_eq!(est.update(2, t0 + ms(50)), None);
    }

    #[test]
    fn test_custom_window() {
        let mut est = SpeedEstimator::new(SpeedFilterConfig {
            min_gap_ms: 10,
            ..Default::default()
        });
        let t0 = Instant::now();
        est.update(0, t0);
        assert!(est.update(1, t0 + ms(25)).is_some());
    }
}
