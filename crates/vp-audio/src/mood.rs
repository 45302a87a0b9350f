use vp_core::snapshot::{ALL_MOODS, BandEnergies, Mood, SpectralShape};

/// Valence weights: brightness dominates, midrange forwardness helps,
/// heavy bass pulls down.
const W_CENTROID: f32 = 0.45;
const W_MID: f32 = 0.25;
const W_TREBLE: f32 = 0.10;
const W_BASS_INV: f32 = 0.20;

/// Margin-to-confidence scale: a 0.5 score gap saturates confidence.
const CONFIDENCE_SCALE: f32 = 2.0;

/// One tick's deterministic mood classification.
#[derive(Clone, Copy, Debug)]
pub struct Classification {
    /// Argmax mood. Ties break to declaration order.
    pub mood: Mood,
    /// Score per mood, indexed by `Mood::index()`.
    pub scores: [f32; 4],
    /// Clamped margin between the top two scores. Not a probability.
    pub confidence: f32,
    /// The energy input, as used.
    pub energy: f32,
    /// The valence input, as used.
    pub valence: f32,
}

/// Heuristic positivity/brightness from band balance and spectral shape.
///
/// Brighter and more midrange-forward signals score higher; bass-heavy
/// signals score lower. Band energies are gain-amplified, so they are
/// clamped to [0, 1] before weighting.
#[must_use]
pub fn valence(bands: &BandEnergies, shape: &SpectralShape) -> f32 {
    let bass = bands.bass.clamp(0.0, 1.0);
    let mid = bands.mid.clamp(0.0, 1.0);
    let treble = bands.treble.clamp(0.0, 1.0);

    (shape.centroid * W_CENTROID
        + mid * W_MID
        + treble * W_TREBLE
        + (1.0 - bass) * W_BASS_INV)
        .clamp(0.0, 1.0)
}

/// Score the four moods from instantaneous energy and valence.
///
/// Equal complementary weights put each mood in one energy/valence
/// quadrant, so the argmax is a pure function of which half of each axis
/// the inputs fall in. Reproducible for identical inputs; at the exact
/// center all four scores tie and the first declared mood (chill) wins.
///
/// # Example
/// ```
/// use vp_audio::mood::classify;
/// use vp_core::snapshot::Mood;
/// assert_eq!(classify(0.9, 0.9).mood, Mood::Happy);
/// assert_eq!(classify(0.9, 0.2).mood, Mood::Energetic);
/// assert_eq!(classify(0.2, 0.8).mood, Mood::Chill);
/// assert_eq!(classify(0.1, 0.1).mood, Mood::Sad);
/// ```
#[must_use]
pub fn classify(energy: f32, valence: f32) -> Classification {
    let e = energy.clamp(0.0, 1.0);
    let v = valence.clamp(0.0, 1.0);

    let mut scores = [0.0f32; 4];
    scores[Mood::Chill.index()] = (1.0 - e) * 0.5 + v * 0.5;
    scores[Mood::Energetic.index()] = e * 0.5 + (1.0 - v) * 0.5;
    scores[Mood::Sad.index()] = (1.0 - e) * 0.5 + (1.0 - v) * 0.5;
    scores[Mood::Happy.index()] = e * 0.5 + v * 0.5;

    let mut best = ALL_MOODS[0];
    let mut best_score = scores[0];
    let mut second = f32::MIN;
    for &mood in &ALL_MOODS[1..] {
        let score = scores[mood.index()];
        if score > best_score {
            second = best_score;
            best = mood;
            best_score = score;
        } else if score > second {
            second = score;
        }
    }

    let confidence = ((best_score - second) * CONFIDENCE_SCALE).clamp(0.0, 1.0);

    Classification {
        mood: best,
        scores,
        confidence,
        energy: e,
        valence: v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrants_map_to_moods() {
        assert_eq!(classify(0.8, 0.8).mood, Mood::Happy);
        assert_eq!(classify(0.8, 0.3).mood, Mood::Energetic);
        assert_eq!(classify(0.3, 0.8).mood, Mood::Chill);
        assert_eq!(classify(0.3, 0.3).mood, Mood::Sad);
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify(0.61, 0.42);
        let b = classify(0.61, 0.42);
        assert_eq!(a.mood, b.mood);
        assert_eq!(a.scores, b.scores);
        assert!((a.confidence - b.confidence).abs() < f32::EPSILON);
    }

    #[test]
    fn center_tie_breaks_to_first_declared_mood() {
        let c = classify(0.5, 0.5);
        assert_eq!(c.mood, Mood::Chill);
        assert!(c.confidence < 1e-6, "a four-way tie carries no confidence");
    }

    #[test]
    fn confidence_grows_away_from_the_center() {
        let near = classify(0.55, 0.55).confidence;
        let far = classify(0.95, 0.95).confidence;
        assert!(far > near);
        assert!((0.0..=1.0).contains(&near));
        assert!((0.0..=1.0).contains(&far));
    }

    #[test]
    fn exactly_one_mood_holds_the_max() {
        let c = classify(0.7, 0.6);
        let max = c.scores.iter().copied().fold(f32::MIN, f32::max);
        assert!((c.scores[c.mood.index()] - max).abs() < f32::EPSILON);
    }

    #[test]
    fn bright_mid_forward_signal_scores_high_valence() {
        let bright = BandEnergies {
            bass: 0.1,
            mid: 0.8,
            treble: 0.6,
            total: 0.5,
        };
        let dark = BandEnergies {
            bass: 1.5,
            mid: 0.1,
            treble: 0.05,
            total: 0.6,
        };
        let bright_shape = SpectralShape {
            centroid: 0.8,
            flatness: 0.3,
        };
        let dark_shape = SpectralShape {
            centroid: 0.15,
            flatness: 0.3,
        };
        assert!(valence(&bright, &bright_shape) > valence(&dark, &dark_shape));
    }
}
