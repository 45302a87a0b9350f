use vp_core::config::AnalysisConfig;
use vp_core::snapshot::{AudioData, Mood, VIZ_BINS};

use crate::beat::BeatDetector;
use crate::features::extract_features;
use crate::mood;
use crate::smoothing::TemporalSmoother;

/// Fraction of the spectrum published for visualization (the top of the
/// range is mostly empty for music).
const VIZ_SPAN: f32 = 0.6;

/// Per-tick analysis over one session's state.
///
/// Owns the detector, smoother and silence accounting; the session thread
/// feeds it one frequency snapshot per tick and publishes the returned
/// `AudioData`. Wall-clock comes in as a caller-supplied `now_ms`, so the
/// whole per-tick protocol runs deterministically under test, without a
/// device.
pub struct AnalysisEngine {
    config: AnalysisConfig,
    beat: BeatDetector,
    smoother: TemporalSmoother,
    /// Consecutive ticks with energy under the silence threshold.
    silence_ticks: u32,
    /// Fired beats stay visible until this timestamp.
    beat_until_ms: f64,
}

impl AnalysisEngine {
    /// Create an engine for a session starting at `now_ms`.
    #[must_use]
    pub fn new(config: AnalysisConfig, now_ms: f64) -> Self {
        let beat = BeatDetector::new(&config, now_ms);
        let smoother = TemporalSmoother::new(&config);
        Self {
            config,
            beat,
            smoother,
            silence_ticks: 0,
            beat_until_ms: 0.0,
        }
    }

    /// Run one analysis tick: extract → detect → classify → smooth →
    /// assemble the published snapshot.
    pub fn process_frame(&mut self, bins: &[u8], sample_rate: u32, now_ms: f64) -> AudioData {
        let (bands, shape) = extract_features(bins, sample_rate, self.config.gain);
        let energy = bands.total.clamp(0.0, 1.0);
        let is_active = energy >= self.config.silence_threshold;

        if is_active {
            self.silence_ticks = 0;
        } else {
            self.silence_ticks = self.silence_ticks.saturating_add(1);
            if self.silence_ticks == self.config.silence_timeout_ticks + 1 {
                log::debug!(
                    "sustained silence: suppressing mood, preserving bpm {}",
                    self.beat.last_valid_bpm()
                );
            }
        }
        let in_silence = self.silence_ticks > self.config.silence_timeout_ticks;

        // Beat detection runs on the raw (unclamped) bass level every tick.
        if self.beat.process(bands.bass, now_ms) {
            self.beat_until_ms = now_ms + self.config.beat_latch_ms;
        }
        let beat_visible = now_ms < self.beat_until_ms;

        let max_frequency = bins.iter().copied().max().unwrap_or(0);
        let status = self.beat.status(now_ms, in_silence);

        if in_silence {
            // Neutral snapshot; the BPM estimate survives, only its status
            // degrades. The mood history is frozen, not fed.
            return AudioData {
                bpm: self.beat.last_valid_bpm(),
                bpm_status: status,
                mood: Mood::Chill,
                max_frequency,
                ..AudioData::default()
            };
        }

        let valence = mood::valence(&bands, &shape);
        let tick = mood::classify(energy, valence);
        let smoothed = self.smoother.push(&tick);

        AudioData {
            bpm: self.beat.display_bpm(),
            bpm_status: status,
            beat_count: self.beat.beat_count().min(u8::MAX as usize) as u8,
            energy,
            bands,
            mood: smoothed.mood,
            mood_confidence: smoothed.mood_confidence,
            valence: smoothed.valence,
            is_active,
            beat: beat_visible,
            max_frequency,
            viz_bins: downsample_viz(bins),
        }
    }

    /// Asynchronous realtime-estimator override (see `BeatDetector`).
    pub fn apply_tempo(&mut self, bpm: u16) {
        self.beat.apply_realtime(bpm);
    }

    /// Restart the session state: detector, smoother and counters back to
    /// their documented initial defaults.
    pub fn reset(&mut self, now_ms: f64) {
        self.beat.reset(now_ms);
        self.smoother.reset();
        self.silence_ticks = 0;
        self.beat_until_ms = 0.0;
    }
}

/// Down-sample the first 60% of the spectrum into `VIZ_BINS` slots,
/// normalized to [0, 1].
fn downsample_viz(bins: &[u8]) -> [f32; VIZ_BINS] {
    let mut out = [0.0f32; VIZ_BINS];
    let span = (bins.len() as f32 * VIZ_SPAN) as usize;
    if span == 0 {
        return out;
    }
    let stride = (span / VIZ_BINS).max(1);
    for (slot, bin_idx) in (0..span).step_by(stride).take(VIZ_BINS).enumerate() {
        out[slot] = f32::from(bins[bin_idx]) / 255.0;
    }
    out
}
