use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{EmotionProfile, EyePair};
use crate::error::{FaceError, FaceResult};

// ============================================================
// Serializable config types
// ============================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceConfig {
    pub version: u32,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub blink: BlinkConfig,
    #[serde(default)]
    pub colors: ColorConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub signal: SignalConfig,
}

/// Base (unscaled) profiles keyed by emotion name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogConfig {
    pub profiles: BTreeMap<String, EyePair>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Progress added per tick.
    pub step: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Closedness added or removed per tick.
    pub step: f32,
    pub interval_ms: f64,
    pub jitter_ms: f64,
    /// Chance of an immediate second blink after the lid fully closes.
    pub repeat_chance: f64,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub center_color: [f32; 3],
    pub edge_color: [f32; 3],
    pub bg_color: [f32; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub base_width: f32,
    pub base_height: f32,
    pub cell_size_base: f32,
    pub mobile_cell_size_base: f32,
    pub cell_spacing_base: f32,
    pub eye_distance_ratio: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Classifier scores at or below this are discarded by the window.
    pub threshold: f32,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
}

// ============================================================
// Defaults
// ============================================================

#[allow(clippy::too_many_arguments)]
fn eye(
    width: f32,
    height: f32,
    curve: f32,
    intensity: f32,
    angle: f32,
    curve_cut: f32,
    cut_from_top: bool,
    edge: f32,
    cut_in_y: f32,
) -> EmotionProfile {
    EmotionProfile {
        width,
        height,
        curve,
        intensity,
        angle,
        curve_cut,
        cut_from_top,
        edge,
        cut_in_y,
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let entries: [(&str, EyePair); 7] = [
            (
                "neutral",
                [
                    eye(50.0, 30.0, 0.0, 0.85, 8.0, 0.0, false, 0.16, 0.0),
                    eye(50.0, 30.0, 0.0, 0.85, -8.0, 0.0, false, 0.16, 0.0),
                ],
            ),
            (
                "joy",
                [
                    eye(40.0, 40.0, 0.0, 1.0, 0.0, 0.7, false, 0.08, 0.0),
                    eye(40.0, 40.0, 0.0, 1.0, 0.0, 0.7, false, 0.08, 0.0),
                ],
            ),
            (
                "sadness",
                [
                    eye(45.0, 40.0, -0.2, 0.7, -8.0, 0.5, false, 0.32, 0.20),
                    eye(45.0, 40.0, -0.2, 0.7, 8.0, 0.5, false, 0.32, 0.20),
                ],
            ),
            (
                "anger",
                [
                    eye(45.0, 22.5, -0.3, 1.0, 16.0, 0.5, true, 0.24, 0.0),
                    eye(45.0, 22.5, -0.3, 1.0, -16.0, 0.5, true, 0.24, 0.0),
                ],
            ),
            (
                "surprise",
                [
                    eye(40.0, 40.0, 0.0, 1.0, 0.0, 0.0, false, 0.08, 0.0),
                    eye(40.0, 40.0, 0.0, 1.0, 0.0, 0.0, false, 0.08, 0.0),
                ],
            ),
            (
                "fear",
                [
                    eye(30.0, 30.0, 0.0, 0.7, -16.0, 0.3, true, 0.32, 0.0),
                    eye(30.0, 30.0, 0.0, 0.7, 16.0, 0.3, true, 0.32, 0.0),
                ],
            ),
            (
                "disgust",
                [
                    eye(50.0, 40.0, 0.0, 0.7, -24.0, 0.5, true, 0.24, 0.0),
                    eye(50.0, 40.0, 0.0, 0.7, -8.0, 0.5, true, 0.24, 0.0),
                ],
            ),
        ];
        Self {
            profiles: entries
                .into_iter()
                .map(|(name, pair)| (name.to_string(), pair))
                .collect(),
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self { step: 0.05 }
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            step: 0.2,
            interval_ms: 3000.0,
            jitter_ms: 1000.0,
            repeat_chance: 0.3,
            seed: None,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            // #FE007A
            center_color: [254.0 / 255.0, 0.0, 122.0 / 255.0],
            edge_color: [1.0, 1.0, 1.0],
            bg_color: [1.0, 1.0, 1.0],
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            base_width: 2048.0,
            base_height: 1200.0,
            cell_size_base: 8.0,
            mobile_cell_size_base: 12.0,
            cell_spacing_base: 1.0,
            eye_distance_ratio: 0.42,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            min_interval_ms: 1500,
            max_interval_ms: 4000,
        }
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            catalog: CatalogConfig::default(),
            transition: TransitionConfig::default(),
            blink: BlinkConfig::default(),
            colors: ColorConfig::default(),
            viewport: ViewportConfig::default(),
            signal: SignalConfig::default(),
        }
    }
}

// ============================================================
// FaceConfig: JSON I/O and validation
// ============================================================

impl FaceConfig {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn to_json(&self) -> FaceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> FaceResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the scalar sections. Profiles are validated by the catalog.
    pub fn validate(&self) -> FaceResult<()> {
        if self.version != Self::CURRENT_VERSION {
            return Err(FaceError::config(format!(
                "unsupported config version {} (expected {})",
                self.version,
                Self::CURRENT_VERSION
            )));
        }
        if !(self.transition.step > 0.0 && self.transition.step <= 1.0) {
            return Err(FaceError::config("transition.step must lie in (0, 1]"));
        }

        let blink = &self.blink;
        if !(blink.step > 0.0 && blink.step <= 1.0) {
            return Err(FaceError::config("blink.step must lie in (0, 1]"));
        }
        if !(blink.interval_ms.is_finite() && blink.jitter_ms.is_finite())
            || blink.jitter_ms < 0.0
            || blink.jitter_ms > blink.interval_ms
        {
            return Err(FaceError::config(
                "blink.jitter_ms must lie in [0, blink.interval_ms]",
            ));
        }
        if !(0.0..=1.0).contains(&blink.repeat_chance) {
            return Err(FaceError::config("blink.repeat_chance must lie in [0, 1]"));
        }

        let vp = &self.viewport;
        for (name, v) in [
            ("viewport.base_width", vp.base_width),
            ("viewport.base_height", vp.base_height),
            ("viewport.cell_size_base", vp.cell_size_base),
            ("viewport.mobile_cell_size_base", vp.mobile_cell_size_base),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(FaceError::config(format!("{name} must be positive")));
            }
        }
        if !(vp.cell_spacing_base >= 0.0 && vp.eye_distance_ratio >= 0.0) {
            return Err(FaceError::config(
                "viewport spacing and eye distance must be non-negative",
            ));
        }

        let signal = &self.signal;
        if signal.min_interval_ms > signal.max_interval_ms {
            return Err(FaceError::config(
                "signal.min_interval_ms must not exceed signal.max_interval_ms",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let config = FaceConfig::default();
        let json = config.to_json().unwrap();
        let back = FaceConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.catalog.profiles.len(), 7);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = FaceConfig::from_json(r#"{ "version": 1, "blink": { "seed": 7 } }"#).unwrap();
        assert_eq!(config.blink.seed, Some(7));
        assert_eq!(config.blink.step, 0.2);
        assert_eq!(config.catalog, CatalogConfig::default());
    }

    #[test]
    fn rejects_unknown_version_and_bad_steps() {
        assert!(matches!(
            FaceConfig::from_json(r#"{ "version": 9 }"#),
            Err(FaceError::Config(_))
        ));

        let mut config = FaceConfig::default();
        config.transition.step = 0.0;
        assert!(config.validate().is_err());

        let mut config = FaceConfig::default();
        config.blink.jitter_ms = 5000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        assert!(matches!(
            FaceConfig::from_json("{ not json"),
            Err(FaceError::Serde(_))
        ));
    }
}
