use serde::{Deserialize, Serialize};

/// Number of down-sampled spectrum slots published for visualization.
pub const VIZ_BINS: usize = 64;

/// Which audio endpoint a capture session listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Default input device (microphone).
    #[default]
    Microphone,
    /// System/loopback endpoint (what the machine is playing).
    System,
}

/// Perceptual mood category of the current music.
///
/// Declaration order is the tie-break order: when two moods score equal,
/// the first declared one wins.
///
/// # Example
/// ```
/// use vp_core::snapshot::Mood;
/// assert_eq!(Mood::default(), Mood::Chill);
/// assert_eq!(Mood::Happy.as_str(), "happy");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Low energy, pleasant. The neutral default.
    #[default]
    Chill,
    /// High energy, low/mid valence.
    Energetic,
    /// Low energy, low valence.
    Sad,
    /// High energy, high valence.
    Happy,
}

/// All moods, in declaration (tie-break) order.
pub const ALL_MOODS: [Mood; 4] = [Mood::Chill, Mood::Energetic, Mood::Sad, Mood::Happy];

impl Mood {
    /// Lowercase display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chill => "chill",
            Self::Energetic => "energetic",
            Self::Sad => "sad",
            Self::Happy => "happy",
        }
    }

    /// Index into `ALL_MOODS` / score arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Chill => 0,
            Self::Energetic => 1,
            Self::Sad => 2,
            Self::Happy => 3,
        }
    }
}

/// Lifecycle of the BPM estimate, derived each tick.
///
/// `Lost` means sustained silence while a previously valid BPM exists;
/// the estimate itself is retained, only the status degrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BpmStatus {
    /// No session running.
    #[default]
    Idle,
    /// Within the post-start warmup window; beats are not trusted yet.
    WarmingUp,
    /// Listening, no usable estimate so far.
    Detecting,
    /// Beats observed but the smoothed estimate is not established.
    Stabilizing,
    /// A live BPM estimate exists.
    Detected,
    /// Sustained silence; last valid BPM is shown but stale.
    Lost,
}

impl BpmStatus {
    /// Kebab-case display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WarmingUp => "warming-up",
            Self::Detecting => "detecting",
            Self::Stabilizing => "stabilizing",
            Self::Detected => "detected",
            Self::Lost => "lost",
        }
    }
}

/// Per-band spectrum energy, gain-amplified.
///
/// Values are averages of normalized magnitudes scaled by the configured
/// gain, so they are on the same scale regardless of band width. They are
/// NOT clamped here: transients above 1.0 must stay visible to the beat
/// detector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergies {
    /// Below 250 Hz.
    pub bass: f32,
    /// 250–2000 Hz.
    pub mid: f32,
    /// Above 2000 Hz.
    pub treble: f32,
    /// Whole-spectrum average.
    pub total: f32,
}

/// Brightness and noisiness of the current spectrum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralShape {
    /// Energy-weighted mean bin index, normalized by buffer length [0, 1].
    pub centroid: f32,
    /// Geometric/arithmetic mean ratio [0, 1]. High = noise-like.
    pub flatness: f32,
}

impl Default for SpectralShape {
    fn default() -> Self {
        // Neutral brightness for an empty/zero-sum frame.
        Self {
            centroid: 0.5,
            flatness: 0.0,
        }
    }
}

/// The published per-tick analysis snapshot.
///
/// Written once per tick by the session thread, read wait-free by the
/// presentation side through a triple buffer. Fixed size, `Copy`, never
/// allocated in the hot path.
///
/// # Example
/// ```
/// use vp_core::snapshot::{AudioData, BpmStatus, Mood};
/// let d = AudioData::default();
/// assert_eq!(d.bpm, 0);
/// assert_eq!(d.bpm_status, BpmStatus::Idle);
/// assert_eq!(d.mood, Mood::Chill);
/// assert!(!d.is_active);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct AudioData {
    /// Smoothed BPM estimate. 0 = no estimate yet. Never falls back to 0
    /// from a nonzero value during transient silence.
    pub bpm: u16,
    /// Estimate lifecycle for UI feedback.
    pub bpm_status: BpmStatus,
    /// Beats currently held in the detector history.
    pub beat_count: u8,
    /// Instantaneous gain-scaled energy, clamped [0, 1].
    pub energy: f32,
    /// Per-band energies (unclamped).
    pub bands: BandEnergies,
    /// Smoothed displayed mood.
    pub mood: Mood,
    /// Margin-based heuristic confidence [0, 1]. Not a probability.
    pub mood_confidence: f32,
    /// Smoothed valence [0, 1].
    pub valence: f32,
    /// True iff instantaneous energy is at or above the silence threshold.
    pub is_active: bool,
    /// True on the tick a beat fires, latched ~100 ms.
    pub beat: bool,
    /// Loudest raw byte magnitude this tick (debug: real signal vs noise).
    pub max_frequency: u8,
    /// Down-sampled spectrum (first 60% of bins) for visualization, [0, 1].
    pub viz_bins: [f32; VIZ_BINS],
}

impl Default for AudioData {
    fn default() -> Self {
        Self {
            bpm: 0,
            bpm_status: BpmStatus::Idle,
            beat_count: 0,
            energy: 0.0,
            bands: BandEnergies::default(),
            mood: Mood::Chill,
            mood_confidence: 0.0,
            valence: 0.0,
            is_active: false,
            beat: false,
            max_frequency: 0,
            viz_bins: [0.0; VIZ_BINS],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_indices_match_declaration_order() {
        for (i, mood) in ALL_MOODS.iter().enumerate() {
            assert_eq!(mood.index(), i);
        }
    }

    #[test]
    fn default_snapshot_is_neutral() {
        let d = AudioData::default();
        assert_eq!(d.bpm, 0);
        assert_eq!(d.beat_count, 0);
        assert_eq!(d.mood, Mood::Chill);
        assert!(!d.beat);
        assert!(!d.is_active);
        assert!(d.viz_bins.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn status_names_are_kebab_case() {
        assert_eq!(BpmStatus::WarmingUp.as_str(), "warming-up");
        assert_eq!(BpmStatus::Lost.as_str(), "lost");
    }
}
