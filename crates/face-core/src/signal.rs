//! Inputs to the engine: weighted emotion scores, wire messages from
//! collaborators, and the sample window that smooths classifier output.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Emotion;
use crate::config::SignalConfig;
use crate::engine::FaceEngine;
use crate::error::{FaceError, FaceResult};

// ============================================================
// EmotionWeights
// ============================================================

/// Non-negative score per emotion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmotionWeights {
    scores: [f32; Emotion::COUNT],
}

impl EmotionWeights {
    /// Weight 1 on a single emotion.
    pub fn single(emotion: Emotion) -> Self {
        let mut weights = Self::default();
        weights.scores[emotion.index()] = 1.0;
        weights
    }

    pub fn from_pairs(pairs: &[(Emotion, f32)]) -> FaceResult<Self> {
        let mut weights = Self::default();
        for &(emotion, score) in pairs {
            weights.add(emotion, score)?;
        }
        Ok(weights)
    }

    /// Build from named scores. Aliases of the same emotion accumulate.
    pub fn from_scores<I, S>(scores: I) -> FaceResult<Self>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        let mut weights = Self::default();
        for (name, score) in scores {
            weights.add(Emotion::parse(name.as_ref())?, score)?;
        }
        Ok(weights)
    }

    pub fn add(&mut self, emotion: Emotion, score: f32) -> FaceResult<()> {
        if !(score.is_finite() && score >= 0.0) {
            return Err(FaceError::invalid_weights(format!(
                "score for '{emotion}' must be a non-negative number, got {score}"
            )));
        }
        self.scores[emotion.index()] += score;
        Ok(())
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        self.scores[emotion.index()]
    }

    pub fn total(&self) -> f32 {
        self.scores.iter().sum()
    }

    /// Weights rescaled to sum to 1.
    pub fn normalized(&self) -> FaceResult<Self> {
        let total = self.total();
        if !(total > 0.0) {
            return Err(FaceError::invalid_weights(
                "weights are empty or all zero",
            ));
        }
        Ok(Self {
            scores: self.scores.map(|s| s / total),
        })
    }

    /// Highest weight; ties go to the earlier emotion in catalog order.
    pub fn dominant(&self) -> Option<Emotion> {
        let mut best: Option<(Emotion, f32)> = None;
        for (emotion, score) in self.iter() {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((emotion, score));
            }
        }
        best.map(|(e, _)| e)
    }

    /// Emotions with a positive weight.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL
            .into_iter()
            .map(|e| (e, self.scores[e.index()]))
            .filter(|&(_, s)| s > 0.0)
    }
}

// ============================================================
// FaceSignal: messages from collaborators
// ============================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FaceSignal {
    /// Weighted scores plus the dominant name, as produced by the classifier.
    Emotion {
        weights: BTreeMap<String, f32>,
        dominant: String,
    },
    /// A single expression at full weight, e.g. forced by the audio side.
    Named { emotion: String },
    LookAt { x: f32, y: f32 },
}

impl FaceSignal {
    pub fn from_json(json: &str) -> FaceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn apply(&self, engine: &mut FaceEngine) -> FaceResult<()> {
        match self {
            Self::Emotion { weights, dominant } => engine.set_target_scores(
                weights.iter().map(|(name, score)| (name.as_str(), *score)),
                dominant,
            ),
            Self::Named { emotion } => engine.set_emotion(emotion),
            Self::LookAt { x, y } => {
                engine.set_look_at(*x, *y);
                Ok(())
            }
        }
    }
}

// ============================================================
// EmotionWindow: classifier sample aggregation
// ============================================================

/// Collects confident classifier samples between updates and averages them.
#[derive(Clone, Debug)]
pub struct EmotionWindow {
    threshold: f32,
    sums: [f32; Emotion::COUNT],
    counts: [u32; Emotion::COUNT],
}

impl EmotionWindow {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            sums: [0.0; Emotion::COUNT],
            counts: [0; Emotion::COUNT],
        }
    }

    pub fn from_config(config: &SignalConfig) -> Self {
        Self::new(config.threshold)
    }

    /// Record one score; returns whether it cleared the threshold.
    pub fn push(&mut self, emotion: Emotion, score: f32) -> bool {
        if !(score > self.threshold) {
            return false;
        }
        self.sums[emotion.index()] += score;
        self.counts[emotion.index()] += 1;
        true
    }

    /// Record a full classifier result; returns how many scores were kept.
    pub fn push_scores<I, S>(&mut self, scores: I) -> FaceResult<usize>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        let mut kept = 0;
        for (name, score) in scores {
            if self.push(Emotion::parse(name.as_ref())?, score) {
                kept += 1;
            }
        }
        Ok(kept)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Average what was collected, pick the dominant emotion and start over.
    pub fn flush(&mut self) -> Option<(EmotionWeights, Emotion)> {
        let mut weights = EmotionWeights::default();
        let mut dominant: Option<(Emotion, f32)> = None;

        for emotion in Emotion::ALL {
            let count = self.counts[emotion.index()];
            if count == 0 {
                continue;
            }
            let avg = self.sums[emotion.index()] / count as f32;
            weights.scores[emotion.index()] = avg;
            if dominant.map_or(true, |(_, best)| avg > best) {
                dominant = Some((emotion, avg));
            }
        }

        self.sums = [0.0; Emotion::COUNT];
        self.counts = [0; Emotion::COUNT];
        dominant.map(|(e, _)| (weights, e))
    }
}

/// Randomized delay before the next window flush.
pub fn next_interval_ms<R: Rng>(config: &SignalConfig, rng: &mut R) -> u64 {
    rng.gen_range(config.min_interval_ms..=config.max_interval_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn from_scores_parses_names_and_merges_aliases() {
        let w = EmotionWeights::from_scores([("happy", 0.5), ("joy", 0.25), ("sad", 0.25)]).unwrap();
        assert_eq!(w.get(Emotion::Joy), 0.75);
        assert_eq!(w.get(Emotion::Sadness), 0.25);
        assert_eq!(w.total(), 1.0);

        assert!(matches!(
            EmotionWeights::from_scores([("unicorn", 1.0)]),
            Err(FaceError::UnknownEmotion(_))
        ));
        assert!(matches!(
            EmotionWeights::from_scores([("joy", -1.0)]),
            Err(FaceError::InvalidWeights(_))
        ));
        assert!(EmotionWeights::from_scores([("joy", f32::NAN)]).is_err());
    }

    #[test]
    fn normalized_sums_to_one_or_fails() {
        let w = EmotionWeights::from_pairs(&[(Emotion::Fear, 3.0), (Emotion::Anger, 1.0)]).unwrap();
        let n = w.normalized().unwrap();
        assert_eq!(n.get(Emotion::Fear), 0.75);
        assert_eq!(n.get(Emotion::Anger), 0.25);

        assert!(EmotionWeights::default().normalized().is_err());
        let zero = EmotionWeights::from_pairs(&[(Emotion::Neutral, 0.0)]).unwrap();
        assert!(matches!(zero.normalized(), Err(FaceError::InvalidWeights(_))));
    }

    #[test]
    fn dominant_prefers_the_highest_then_catalog_order() {
        let w = EmotionWeights::from_pairs(&[(Emotion::Disgust, 0.5), (Emotion::Joy, 0.5)]).unwrap();
        assert_eq!(w.dominant(), Some(Emotion::Joy));
        assert_eq!(EmotionWeights::default().dominant(), None);
        assert_eq!(EmotionWeights::single(Emotion::Fear).dominant(), Some(Emotion::Fear));
    }

    #[test]
    fn signal_json_shapes() {
        let s = FaceSignal::from_json(
            r#"{ "type": "emotion", "weights": { "happy": 0.9, "neutral": 0.1 }, "dominant": "happy" }"#,
        )
        .unwrap();
        assert!(matches!(s, FaceSignal::Emotion { ref dominant, .. } if dominant == "happy"));

        let s = FaceSignal::from_json(r#"{ "type": "look_at", "x": 0.2, "y": 0.8 }"#).unwrap();
        assert_eq!(s, FaceSignal::LookAt { x: 0.2, y: 0.8 });

        let s = FaceSignal::from_json(r#"{ "type": "named", "emotion": "neutral" }"#).unwrap();
        assert_eq!(
            s,
            FaceSignal::Named {
                emotion: "neutral".to_string()
            }
        );

        assert!(FaceSignal::from_json(r#"{ "type": "wink" }"#).is_err());
    }

    #[test]
    fn window_keeps_confident_samples_and_averages() {
        let mut window = EmotionWindow::new(0.9);
        assert!(!window.push(Emotion::Joy, 0.5));
        assert!(!window.push(Emotion::Joy, 0.9));
        assert!(window.push(Emotion::Joy, 0.92));
        assert!(window.push(Emotion::Joy, 0.96));
        assert_eq!(
            window
                .push_scores([("surprised", 0.95), ("neutral", 0.1)])
                .unwrap(),
            1
        );

        let (weights, dominant) = window.flush().unwrap();
        assert_eq!(dominant, Emotion::Surprise);
        assert!((weights.get(Emotion::Joy) - 0.94).abs() < 1e-6);
        assert_eq!(weights.get(Emotion::Neutral), 0.0);
        assert!(window.is_empty());
        assert!(window.flush().is_none());
    }

    #[test]
    fn window_rejects_unknown_names() {
        let mut window = EmotionWindow::new(0.9);
        assert!(window.push_scores([("bored", 0.99)]).is_err());
    }

    #[test]
    fn flush_interval_stays_in_range() {
        let config = SignalConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let ms = next_interval_ms(&config, &mut rng);
            assert!((1500..=4000).contains(&ms));
        }
    }
}
