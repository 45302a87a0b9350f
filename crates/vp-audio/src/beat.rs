use std::collections::VecDeque;

use vp_core::config::AnalysisConfig;
use vp_core::snapshot::BpmStatus;

/// Onset detection and BPM estimation over successive bass-energy samples.
///
/// Adaptive threshold over a rolling bass window, refractory period against
/// double-triggers, median inter-beat interval for outlier-robust BPM.
/// All timestamps are caller-supplied milliseconds, so the detector is
/// deterministic under test.
///
/// The fields written by the async realtime path (`apply_realtime`) are
/// disjoint from the tick-local detection state: realtime updates touch the
/// estimate fields only, never the histories.
///
/// # Example
/// ```
/// use vp_audio::beat::BeatDetector;
/// use vp_core::config::AnalysisConfig;
/// let detector = BeatDetector::new(&AnalysisConfig::default(), 0.0);
/// assert_eq!(detector.display_bpm(), 0);
/// ```
pub struct BeatDetector {
    /// Timestamps of recent fired beats (ms), bounded.
    beat_times: VecDeque<f64>,
    /// Rolling raw bass-energy window for the adaptive threshold.
    bass_window: VecDeque<f32>,
    /// Smoothed internal BPM estimate. 0 = none yet.
    current_bpm: u16,
    /// Latest asynchronous realtime-estimator reading. 0 = none.
    realtime_bpm: u16,
    /// Last known valid BPM, preserved through silence.
    last_valid_bpm: u16,
    /// Timestamp of the previously fired beat (ms).
    last_beat_ms: f64,
    /// Session start timestamp (ms), for the warmup window.
    started_at_ms: f64,

    // Tunables, copied from config at construction.
    warmup_ms: f64,
    refractory_ms: f64,
    threshold_ratio: f32,
    min_level: f32,
    window_cap: usize,
    history_cap: usize,
    bpm_min: u16,
    bpm_max: u16,
    blend: f32,
}

impl BeatDetector {
    /// Create a detector for a session starting at `now_ms`.
    #[must_use]
    pub fn new(config: &AnalysisConfig, now_ms: f64) -> Self {
        Self {
            beat_times: VecDeque::with_capacity(config.beat_history),
            bass_window: VecDeque::with_capacity(config.energy_window),
            current_bpm: 0,
            realtime_bpm: 0,
            last_valid_bpm: 0,
            last_beat_ms: 0.0,
            started_at_ms: now_ms,
            warmup_ms: config.warmup_ms,
            refractory_ms: config.refractory_ms,
            threshold_ratio: config.beat_threshold_ratio,
            min_level: config.min_beat_level,
            window_cap: config.energy_window,
            history_cap: config.beat_history,
            bpm_min: config.bpm_min,
            bpm_max: config.bpm_max,
            blend: config.bpm_blend,
        }
    }

    /// Feed this tick's raw (unclamped) bass energy. Returns true when a
    /// beat fires.
    ///
    /// The rolling window is maintained on every tick; firing is gated on
    /// the warmup window so stream-start transients don't register.
    pub fn process(&mut self, raw_bass: f32, now_ms: f64) -> bool {
        self.bass_window.push_back(raw_bass);
        if self.bass_window.len() > self.window_cap {
            self.bass_window.pop_front();
        }

        let avg: f32 =
            self.bass_window.iter().sum::<f32>() / self.bass_window.len().max(1) as f32;
        let threshold = avg * self.threshold_ratio;

        let warmed_up = now_ms - self.started_at_ms >= self.warmup_ms;
        let since_last = now_ms - self.last_beat_ms;
        let fired = warmed_up
            && raw_bass > threshold
            && raw_bass > self.min_level
            && since_last > self.refractory_ms;

        if !fired {
            return false;
        }

        log::debug!(
            "beat: bass={raw_bass:.3} threshold={threshold:.3} interval={since_last:.0}ms"
        );
        self.last_beat_ms = now_ms;
        self.beat_times.push_back(now_ms);
        if self.beat_times.len() > self.history_cap {
            self.beat_times.pop_front();
        }

        if self.beat_times.len() >= 2 {
            self.update_bpm_from_history();
        }

        true
    }

    /// Median inter-beat interval → BPM, blended into the running estimate.
    fn update_bpm_from_history(&mut self) {
        let mut intervals: Vec<f64> = self
            .beat_times
            .iter()
            .zip(self.beat_times.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();
        intervals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median = intervals[intervals.len() / 2];
        if median <= 0.0 {
            return;
        }

        let calculated = (60_000.0 / median).round() as u16;
        if calculated < self.bpm_min || calculated > self.bpm_max {
            return;
        }

        self.current_bpm = if self.current_bpm == 0 {
            calculated
        } else {
            (f32::from(self.current_bpm) * self.blend
                + f32::from(calculated) * (1.0 - self.blend))
                .round() as u16
        };
        self.last_valid_bpm = self.current_bpm;
        log::debug!(
            "bpm: calculated={calculated} smoothed={} median={median:.0}ms beats={}",
            self.current_bpm,
            self.beat_times.len()
        );
    }

    /// Apply an asynchronous realtime-estimator reading.
    ///
    /// Treated as higher confidence: overwrites the running and last-valid
    /// estimates. Never touches the beat or bass histories.
    pub fn apply_realtime(&mut self, bpm: u16) {
        if bpm == 0 {
            return;
        }
        log::info!("realtime bpm override: {bpm}");
        self.realtime_bpm = bpm;
        self.current_bpm = bpm;
        self.last_valid_bpm = bpm;
    }

    /// BPM to display: internal estimate first (the realtime analyzer lags
    /// several seconds after start), then realtime, then last known valid.
    #[must_use]
    pub fn display_bpm(&self) -> u16 {
        if self.current_bpm > 0 {
            self.current_bpm
        } else if self.realtime_bpm > 0 {
            self.realtime_bpm
        } else {
            self.last_valid_bpm
        }
    }

    /// Last valid BPM, shown while status reads `Lost`.
    #[must_use]
    pub fn last_valid_bpm(&self) -> u16 {
        self.last_valid_bpm
    }

    /// Beats currently held in the history.
    #[must_use]
    pub fn beat_count(&self) -> usize {
        self.beat_times.len()
    }

    /// Derive the estimate lifecycle for this tick.
    ///
    /// A rhythm-free stream stays in `Detecting` forever; that is expected,
    /// not an error.
    #[must_use]
    pub fn status(&self, now_ms: f64, in_silence: bool) -> BpmStatus {
        if now_ms - self.started_at_ms < self.warmup_ms {
            BpmStatus::WarmingUp
        } else if in_silence {
            if self.last_valid_bpm > 0 {
                BpmStatus::Lost
            } else {
                BpmStatus::Detecting
            }
        } else if self.current_bpm > 0 || self.realtime_bpm > 0 {
            BpmStatus::Detected
        } else if !self.beat_times.is_empty() {
            BpmStatus::Stabilizing
        } else {
            BpmStatus::Detecting
        }
    }

    /// Restart: every field back to its initial default.
    pub fn reset(&mut self, now_ms: f64) {
        self.beat_times.clear();
        self.bass_window.clear();
        self.current_bpm = 0;
        self.realtime_bpm = 0;
        self.last_valid_bpm = 0;
        self.last_beat_ms = 0.0;
        self.started_at_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed_detector() -> BeatDetector {
        let config = AnalysisConfig {
            warmup_ms: 0.0,
            ..AnalysisConfig::default()
        };
        BeatDetector::new(&config, 0.0)
    }

    /// Feed quiet ticks, then a spike at `at_ms`. Returns whether it fired.
    fn spike(detector: &mut BeatDetector, at_ms: f64) -> bool {
        for i in 0..10 {
            let _ = detector.process(0.0, at_ms - f64::from(10 - i));
        }
        detector.process(1.0, at_ms)
    }

    #[test]
    fn refractory_merges_close_transients() {
        let mut detector = warmed_detector();
        assert!(spike(&mut detector, 1000.0));
        // 50 ms later: below the refractory period, must not fire
        assert!(!detector.process(1.0, 1050.0));
        assert_eq!(detector.beat_count(), 1);
    }

    #[test]
    fn median_interval_resists_outlier() {
        let mut detector = warmed_detector();
        // Intervals 500, 505, 495, 2000 ms: median ≈ 500, mean ≈ 875.
        for t in [1000.0, 1500.0, 2005.0, 2500.0, 4500.0] {
            assert!(spike(&mut detector, t), "beat at {t} should fire");
        }
        let bpm = detector.display_bpm();
        assert!(
            (115..=125).contains(&bpm),
            "bpm {bpm} should track the ~500ms median, not the 875ms mean (~69)"
        );
    }

    #[test]
    fn implausible_intervals_produce_no_estimate() {
        let mut detector = warmed_detector();
        // 250 BPM territory: 240ms intervals → outside [50, 200], rejected.
        for i in 0..8 {
            let _ = spike(&mut detector, 1000.0 + f64::from(i) * 240.0);
        }
        assert_eq!(detector.display_bpm(), 0);

        // 20 BPM territory: 3s intervals → also rejected.
        let mut slow = warmed_detector();
        for i in 0..5 {
            let _ = spike(&mut slow, 1000.0 + f64::from(i) * 3000.0);
        }
        assert_eq!(slow.display_bpm(), 0);
    }

    #[test]
    fn no_beats_fire_during_warmup() {
        let config = AnalysisConfig::default(); // 2s warmup
        let mut detector = BeatDetector::new(&config, 0.0);
        assert!(!spike(&mut detector, 500.0));
        assert_eq!(detector.status(500.0, false), BpmStatus::WarmingUp);
        // Past warmup the same transient registers
        assert!(spike(&mut detector, 2500.0));
    }

    #[test]
    fn status_ladder() {
        let mut detector = warmed_detector();
        assert_eq!(detector.status(10.0, false), BpmStatus::Detecting);

        // One beat, no estimate yet
        assert!(spike(&mut detector, 1000.0));
        assert_eq!(detector.status(1001.0, false), BpmStatus::Stabilizing);

        // Second beat at a plausible interval → estimate exists
        assert!(spike(&mut detector, 1500.0));
        assert_eq!(detector.status(1501.0, false), BpmStatus::Detected);

        // Sustained silence: estimate retained, status degrades
        assert_eq!(detector.status(9000.0, true), BpmStatus::Lost);
        assert!(detector.display_bpm() > 0);

        // Silence with no prior estimate
        let fresh = warmed_detector();
        assert_eq!(fresh.status(9000.0, true), BpmStatus::Detecting);
    }

    #[test]
    fn realtime_override_wins_but_leaves_histories_alone() {
        let mut detector = warmed_detector();
        assert!(spike(&mut detector, 1000.0));
        let beats_before = detector.beat_count();

        detector.apply_realtime(128);
        assert_eq!(detector.display_bpm(), 128);
        assert_eq!(detector.last_valid_bpm(), 128);
        assert_eq!(detector.beat_count(), beats_before);
        assert_eq!(detector.status(3000.0, false), BpmStatus::Detected);
    }

    #[test]
    fn reset_restores_initial_defaults() {
        let mut detector = warmed_detector();
        assert!(spike(&mut detector, 1000.0));
        detector.apply_realtime(120);

        detector.reset(5000.0);
        assert_eq!(detector.display_bpm(), 0);
        assert_eq!(detector.beat_count(), 0);
        assert_eq!(detector.last_valid_bpm(), 0);
    }
}
