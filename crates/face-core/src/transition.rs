use log::debug;

use crate::catalog::{Emotion, EmotionCatalog, EmotionProfile, EyePair, ProfileField};
use crate::error::{FaceError, FaceResult};
use crate::signal::EmotionWeights;

const SNAP_EPSILON: f32 = 1e-4;

/// Blends the catalog toward a weighted target and eases the live shape there.
///
/// `current` is interpolated in place every tick, so the approach is
/// exponential-like rather than linear in time, and a retarget part way
/// through continues from wherever `current` happens to be.
#[derive(Clone, Debug)]
pub struct TransitionEngine {
    current: EyePair,
    target: EyePair,
    progress: f32,
    current_emotion: Emotion,
    target_emotion: Emotion,
    step: f32,
}

impl TransitionEngine {
    /// Settled on the neutral profile.
    pub fn new(catalog: &EmotionCatalog, step: f32) -> Self {
        let neutral = *catalog.lookup(Emotion::Neutral);
        Self {
            current: neutral,
            target: neutral,
            progress: 1.0,
            current_emotion: Emotion::Neutral,
            target_emotion: Emotion::Neutral,
            step,
        }
    }

    pub fn current(&self) -> &EyePair {
        &self.current
    }

    pub fn target(&self) -> &EyePair {
        &self.target
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn current_emotion(&self) -> Emotion {
        self.current_emotion
    }

    pub fn target_emotion(&self) -> Emotion {
        self.target_emotion
    }

    pub fn is_settled(&self) -> bool {
        self.progress >= 1.0
    }

    /// Replace the target with the weighted blend of catalog profiles.
    ///
    /// The chord-cut side is not blended; it comes from `dominant`.
    pub fn set_target(
        &mut self,
        catalog: &EmotionCatalog,
        weights: &EmotionWeights,
        dominant: Emotion,
    ) -> FaceResult<()> {
        let normalized = weights.normalized()?;
        if normalized.get(dominant) <= 0.0 {
            return Err(FaceError::invalid_weights(format!(
                "dominant emotion '{dominant}' has no weight"
            )));
        }

        for eye in 0..2 {
            let mut blended = EmotionProfile::zeroed(catalog.lookup(dominant)[eye].cut_from_top);
            for (emotion, weight) in normalized.iter() {
                let profile = &catalog.lookup(emotion)[eye];
                for field in ProfileField::ALL {
                    blended.set(field, blended.get(field) + weight * profile.get(field));
                }
            }
            self.target[eye] = blended;
        }

        debug!(
            "retarget {} -> {} at progress {:.2}",
            self.current_emotion, dominant, self.progress
        );
        self.target_emotion = dominant;
        self.progress = 0.0;
        Ok(())
    }

    pub fn tick(&mut self) {
        self.progress = (self.progress + self.step).min(1.0);
        if self.progress > 1.0 - SNAP_EPSILON {
            self.progress = 1.0;
        }

        let t = self.progress;
        for (current, target) in self.current.iter_mut().zip(self.target.iter()) {
            for field in ProfileField::ALL {
                current.set(field, lerp(current.get(field), target.get(field), t));
            }
            current.cut_from_top = target.cut_from_top;
        }

        if self.progress == 1.0 {
            self.current_emotion = self.target_emotion;
        }
    }

    /// Scale the extents of both the live and target shapes, e.g. after a resize.
    pub fn rescale(&mut self, ratio: f32) {
        for profile in self.current.iter_mut().chain(self.target.iter_mut()) {
            *profile = profile.scaled(ratio);
        }
    }
}

pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start * (1.0 - t) + end * t
}
