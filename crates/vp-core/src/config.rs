use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// All tunables of the analysis pipeline, loadable from TOML.
///
/// Every field has a documented default; a config file only needs to name
/// the fields it overrides. The *shape* of each algorithm is fixed — these
/// constants trade responsiveness against stability.
///
/// # Example
/// ```
/// use vp_core::config::AnalysisConfig;
/// let config = AnalysisConfig::default();
/// assert_eq!(config.fft_size, 4096);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    // === Front-end ===
    /// FFT window size in samples. Power of two.
    pub fft_size: usize,
    /// Analysis ticks per second. Matches the display refresh it drives.
    pub target_fps: u32,
    /// Per-bin exponential smoothing of the byte spectrum [0.0, 1.0).
    /// 0 = raw, 0.8 = heavily smoothed.
    pub spectrum_smoothing: f32,

    // === Levels ===
    /// Gain multiplier applied uniformly to every band energy.
    pub gain: f32,
    /// Energy below this counts as a silent tick.
    pub silence_threshold: f32,
    /// Consecutive silent ticks before the snapshot is forced neutral
    /// (300 ticks ≈ 5 s at 60 fps).
    pub silence_timeout_ticks: u32,

    // === Beat detection ===
    /// Post-start window during which beats are not trusted, in ms.
    pub warmup_ms: f64,
    /// Minimum spacing between two fired beats, in ms.
    pub refractory_ms: f64,
    /// Beat threshold = rolling bass average × this ratio. Must be > 1.
    pub beat_threshold_ratio: f32,
    /// Absolute bass floor below which no beat fires.
    pub min_beat_level: f32,
    /// Rolling raw-bass window capacity (adaptive threshold).
    pub energy_window: usize,
    /// Beat timestamp history capacity (inter-beat intervals).
    pub beat_history: usize,
    /// Plausible BPM range for the median-interval calculation.
    pub bpm_min: u16,
    /// Upper bound of the plausible BPM range.
    pub bpm_max: u16,
    /// Weight of the previous estimate when blending a new BPM reading.
    pub bpm_blend: f32,
    /// How long a fired beat stays visible in the snapshot, in ms.
    pub beat_latch_ms: f64,

    // === Mood smoothing ===
    /// EMA alpha for energy/valence. Higher = more responsive.
    pub ema_alpha: f32,
    /// Mood vote history capacity, in ticks.
    pub mood_window: usize,
    /// Fraction of total window weight a mood must accumulate to take
    /// over the display.
    pub mood_promote_ratio: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 4096,
            target_fps: 60,
            spectrum_smoothing: 0.8,
            gain: 5.0,
            silence_threshold: 0.03,
            silence_timeout_ticks: 300,
            warmup_ms: 2000.0,
            refractory_ms: 180.0,
            beat_threshold_ratio: 1.2,
            min_beat_level: 0.05,
            energy_window: 30,
            beat_history: 20,
            bpm_min: 50,
            bpm_max: 200,
            bpm_blend: 0.6,
            beat_latch_ms: 100.0,
            ema_alpha: 0.25,
            mood_window: 45,
            mood_promote_ratio: 0.4,
        }
    }
}

impl AnalysisConfig {
    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `CoreError::Config` describing the first offending field.
    pub fn validate(&self) -> std::result::Result<(), CoreError> {
        if self.fft_size == 0 || !self.fft_size.is_power_of_two() {
            return Err(CoreError::Config(format!(
                "fft_size must be a nonzero power of two, got {}",
                self.fft_size
            )));
        }
        if self.target_fps == 0 {
            return Err(CoreError::Config("target_fps must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.spectrum_smoothing) {
            return Err(CoreError::Config(format!(
                "spectrum_smoothing must be in [0, 1), got {}",
                self.spectrum_smoothing
            )));
        }
        if self.beat_threshold_ratio <= 1.0 {
            return Err(CoreError::Config(format!(
                "beat_threshold_ratio must be > 1, got {}",
                self.beat_threshold_ratio
            )));
        }
        if self.bpm_min == 0 || self.bpm_min >= self.bpm_max {
            return Err(CoreError::Config(format!(
                "BPM range [{}, {}] is invalid",
                self.bpm_min, self.bpm_max
            )));
        }
        if !(0.0..=1.0).contains(&self.bpm_blend) {
            return Err(CoreError::Config(format!(
                "bpm_blend must be in [0, 1], got {}",
                self.bpm_blend
            )));
        }
        if !(0.0..=1.0).contains(&self.ema_alpha) || self.ema_alpha == 0.0 {
            return Err(CoreError::Config(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if self.mood_window == 0 {
            return Err(CoreError::Config("mood_window must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.mood_promote_ratio) {
            return Err(CoreError::Config(format!(
                "mood_promote_ratio must be in [0, 1], got {}",
                self.mood_promote_ratio
            )));
        }
        if self.energy_window == 0 || self.beat_history < 2 {
            return Err(CoreError::Config(
                "energy_window must be > 0 and beat_history >= 2".into(),
            ));
        }
        Ok(())
    }

    /// Tick period derived from `target_fps`.
    #[must_use]
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }
}

/// Load an analysis config from a TOML file, merging over defaults.
///
/// Missing fields keep their default; unknown fields are rejected so typos
/// in a config file do not silently no-op.
///
/// # Errors
/// Fails if the file cannot be read, does not parse, or fails validation.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;

    let config: AnalysisConfig = toml::from_str(&content)
        .with_context(|| format!("TOML parse error in {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config in {}", path.display()))?;

    log::debug!("config loaded from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "gain = 3.0\nmood_window = 60").expect("write");

        let config = load_config(file.path()).expect("load");
        assert!((config.gain - 3.0).abs() < f32::EPSILON);
        assert_eq!(config.mood_window, 60);
        // Untouched field keeps its default
        assert_eq!(config.fft_size, 4096);
    }

    #[test]
    fn invalid_bpm_range_rejected() {
        let config = AnalysisConfig {
            bpm_min: 200,
            bpm_max: 50,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_ratio_must_exceed_one() {
        let config = AnalysisConfig {
            beat_threshold_ratio: 0.9,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/vibepal.toml")).is_err());
    }
}
