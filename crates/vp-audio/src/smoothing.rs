use std::collections::VecDeque;

use vp_core::config::AnalysisConfig;
use vp_core::snapshot::{ALL_MOODS, Mood};

use crate::mood::Classification;

/// Neutral value the energy/valence EMAs start from.
const NEUTRAL: f32 = 0.5;

/// Smoothed pipeline output for one tick.
#[derive(Clone, Copy, Debug)]
pub struct SmoothedPrediction {
    /// Displayed mood after hysteresis.
    pub mood: Mood,
    /// Winning mood's share of the recency-weighted vote [0, 1].
    pub mood_confidence: f32,
    /// EMA-smoothed energy.
    pub energy: f32,
    /// EMA-smoothed valence.
    pub valence: f32,
}

/// Temporal smoothing of the per-tick classifier output.
///
/// Two regimes: continuous signals (energy, valence) go through an
/// exponential moving average; the categorical mood goes through a
/// recency-weighted vote over a bounded history and only changes the
/// display when one mood clears a fixed fraction of the total window
/// weight. Raw per-frame classification is too jittery to drive a visual
/// character directly.
///
/// # Example
/// ```
/// use vp_audio::smoothing::TemporalSmoother;
/// use vp_core::config::AnalysisConfig;
/// let smoother = TemporalSmoother::new(&AnalysisConfig::default());
/// assert_eq!(smoother.displayed_mood(), vp_core::snapshot::Mood::Chill);
/// ```
pub struct TemporalSmoother {
    alpha: f32,
    window_cap: usize,
    promote_ratio: f32,
    energy: f32,
    valence: f32,
    displayed: Mood,
    history: VecDeque<Mood>,
}

impl TemporalSmoother {
    /// Create a smoother with the config's alpha, window and threshold.
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            alpha: config.ema_alpha,
            window_cap: config.mood_window,
            promote_ratio: config.mood_promote_ratio,
            energy: NEUTRAL,
            valence: NEUTRAL,
            displayed: Mood::Chill,
            history: VecDeque::with_capacity(config.mood_window),
        }
    }

    /// Fold one tick's classification into the smoothed state.
    pub fn push(&mut self, tick: &Classification) -> SmoothedPrediction {
        self.energy = self.alpha * tick.energy + (1.0 - self.alpha) * self.energy;
        self.valence = self.alpha * tick.valence + (1.0 - self.alpha) * self.valence;

        self.history.push_back(tick.mood);
        if self.history.len() > self.window_cap {
            self.history.pop_front();
        }

        // Recency-weighted vote: weight grows linearly toward the newest
        // entry.
        let mut weights = [0.0f32; 4];
        let mut total = 0.0f32;
        for (i, mood) in self.history.iter().enumerate() {
            let w = (i + 1) as f32;
            weights[mood.index()] += w;
            total += w;
        }

        let mut top = ALL_MOODS[0];
        let mut top_weight = weights[0];
        for &mood in &ALL_MOODS[1..] {
            if weights[mood.index()] > top_weight {
                top = mood;
                top_weight = weights[mood.index()];
            }
        }

        // Display promotion only past the hysteresis threshold; otherwise
        // the previous displayed mood is retained.
        if total > 0.0 && top_weight >= self.promote_ratio * total {
            if top != self.displayed {
                log::debug!(
                    "mood promoted: {} -> {} ({:.0}% of window weight)",
                    self.displayed.as_str(),
                    top.as_str(),
                    top_weight / total * 100.0
                );
            }
            self.displayed = top;
        }

        let confidence = if total > 0.0 {
            (weights[self.displayed.index()] / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        SmoothedPrediction {
            mood: self.displayed,
            mood_confidence: confidence,
            energy: self.energy,
            valence: self.valence,
        }
    }

    /// Currently displayed mood.
    #[must_use]
    pub fn displayed_mood(&self) -> Mood {
        self.displayed
    }

    /// Back to neutral: EMAs at 0.5, history cleared, mood at the default.
    /// Smoothing state must never leak across sessions.
    pub fn reset(&mut self) {
        self.energy = NEUTRAL;
        self.valence = NEUTRAL;
        self.displayed = Mood::Chill;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::classify;

    fn tick_for(mood: Mood) -> Classification {
        // Inputs chosen so the classifier lands squarely in each quadrant.
        match mood {
            Mood::Happy => classify(0.9, 0.9),
            Mood::Energetic => classify(0.9, 0.1),
            Mood::Chill => classify(0.1, 0.9),
            Mood::Sad => classify(0.1, 0.1),
        }
    }

    #[test]
    fn majority_converges_through_hysteresis() {
        let config = AnalysisConfig::default();
        let mut smoother = TemporalSmoother::new(&config);

        // 60% happy / 40% energetic over a full window
        let mut last = Mood::Chill;
        for i in 0..config.mood_window {
            let mood = if i % 5 < 3 { Mood::Happy } else { Mood::Energetic };
            last = smoother.push(&tick_for(mood)).mood;
        }
        assert_eq!(last, Mood::Happy);
    }

    #[test]
    fn rotation_below_threshold_stays_pinned() {
        let config = AnalysisConfig::default(); // promote ratio 0.4
        let mut smoother = TemporalSmoother::new(&config);

        // Establish a stable mood first
        for _ in 0..config.mood_window {
            let _ = smoother.push(&tick_for(Mood::Sad));
        }
        assert_eq!(smoother.displayed_mood(), Mood::Sad);

        // Three-way rotation: each mood holds ~33% of the weight, below
        // the 40% promotion threshold → no flicker, display stays.
        let rotation = [Mood::Happy, Mood::Energetic, Mood::Chill];
        for i in 0..config.mood_window * 2 {
            let out = smoother.push(&tick_for(rotation[i % 3]));
            assert_eq!(out.mood, Mood::Sad, "tick {i} must not flip the display");
        }
    }

    #[test]
    fn ema_moves_from_neutral_toward_input() {
        let config = AnalysisConfig::default();
        let mut smoother = TemporalSmoother::new(&config);

        let first = smoother.push(&tick_for(Mood::Happy));
        assert!(first.energy > NEUTRAL);
        assert!(first.energy < 0.9, "EMA must not jump straight to the input");

        let mut last = first;
        for _ in 0..200 {
            last = smoother.push(&tick_for(Mood::Happy));
        }
        assert!((last.energy - 0.9).abs() < 0.01, "EMA converges to the input");
    }

    #[test]
    fn confidence_reflects_vote_share() {
        let config = AnalysisConfig::default();
        let mut smoother = TemporalSmoother::new(&config);
        let mut out = smoother.push(&tick_for(Mood::Happy));
        for _ in 0..config.mood_window {
            out = smoother.push(&tick_for(Mood::Happy));
        }
        assert!((out.mood_confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn reset_restores_neutral_state() {
        let config = AnalysisConfig::default();
        let mut smoother = TemporalSmoother::new(&config);
        for _ in 0..config.mood_window {
            let _ = smoother.push(&tick_for(Mood::Energetic));
        }
        assert_eq!(smoother.displayed_mood(), Mood::Energetic);

        smoother.reset();
        assert_eq!(smoother.displayed_mood(), Mood::Chill);
        let first = smoother.push(&tick_for(Mood::Sad));
        assert!((first.energy - (0.5 + config.ema_alpha * (0.1 - 0.5))).abs() < 1e-6);
    }
}
