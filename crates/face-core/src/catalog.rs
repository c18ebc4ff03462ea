//! Emotion catalog: the fixed set of expressions and their per-eye shape profiles.
//!
//! Profiles are authored in base units (cells at the 2048×1200 reference
//! resolution) and scaled once by the viewport factor when the catalog is built.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::error::{FaceError, FaceResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Neutral,
    #[serde(alias = "happy")]
    Joy,
    #[serde(alias = "sad")]
    Sadness,
    #[serde(alias = "angry")]
    Anger,
    #[serde(alias = "surprised")]
    Surprise,
    #[serde(alias = "fearful")]
    Fear,
    #[serde(alias = "disgusted")]
    Disgust,
}

impl Emotion {
    pub const COUNT: usize = 7;

    pub const ALL: [Emotion; Self::COUNT] = [
        Self::Neutral,
        Self::Joy,
        Self::Sadness,
        Self::Anger,
        Self::Surprise,
        Self::Fear,
        Self::Disgust,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Joy => "joy",
            Self::Sadness => "sadness",
            Self::Anger => "anger",
            Self::Surprise => "surprise",
            Self::Fear => "fear",
            Self::Disgust => "disgust",
        }
    }

    /// Parse a canonical name or one of the classifier's adjective aliases.
    pub fn parse(name: &str) -> FaceResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(Self::Neutral),
            "joy" | "happy" => Ok(Self::Joy),
            "sadness" | "sad" => Ok(Self::Sadness),
            "anger" | "angry" => Ok(Self::Anger),
            "surprise" | "surprised" => Ok(Self::Surprise),
            "fear" | "fearful" => Ok(Self::Fear),
            "disgust" | "disgusted" => Ok(Self::Disgust),
            _ => Err(FaceError::unknown_emotion(name)),
        }
    }
}

impl FromStr for Emotion {
    type Err = FaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape parameters for one eye of one expression.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionProfile {
    /// Horizontal extent in cells.
    pub width: f32,
    /// Vertical extent in cells.
    pub height: f32,
    /// Signed curvature; bows rows away from the horizontal center.
    pub curve: f32,
    /// Reserved multiplier, not used by the brightness computation.
    pub intensity: f32,
    /// Eye rotation in degrees.
    pub angle: f32,
    /// Fraction of the ellipse removed by the curved chord cut.
    pub curve_cut: f32,
    /// Which pole the chord cut starts from.
    pub cut_from_top: bool,
    /// Fraction of the radius treated as rim.
    pub edge: f32,
    /// Fraction of the grid height hidden from the top.
    pub cut_in_y: f32,
}

/// Every continuous field of [`EmotionProfile`]. `cut_from_top` is never blended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileField {
    Width,
    Height,
    Curve,
    Intensity,
    Angle,
    CurveCut,
    Edge,
    CutInY,
}

impl ProfileField {
    pub const ALL: [ProfileField; 8] = [
        Self::Width,
        Self::Height,
        Self::Curve,
        Self::Intensity,
        Self::Angle,
        Self::CurveCut,
        Self::Edge,
        Self::CutInY,
    ];
}

impl EmotionProfile {
    /// A profile with every continuous field at zero, used as a blend accumulator.
    pub fn zeroed(cut_from_top: bool) -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            curve: 0.0,
            intensity: 0.0,
            angle: 0.0,
            curve_cut: 0.0,
            cut_from_top,
            edge: 0.0,
            cut_in_y: 0.0,
        }
    }

    pub fn get(&self, field: ProfileField) -> f32 {
        match field {
            ProfileField::Width => self.width,
            ProfileField::Height => self.height,
            ProfileField::Curve => self.curve,
            ProfileField::Intensity => self.intensity,
            ProfileField::Angle => self.angle,
            ProfileField::CurveCut => self.curve_cut,
            ProfileField::Edge => self.edge,
            ProfileField::CutInY => self.cut_in_y,
        }
    }

    pub fn set(&mut self, field: ProfileField, value: f32) {
        match field {
            ProfileField::Width => self.width = value,
            ProfileField::Height => self.height = value,
            ProfileField::Curve => self.curve = value,
            ProfileField::Intensity => self.intensity = value,
            ProfileField::Angle => self.angle = value,
            ProfileField::CurveCut => self.curve_cut = value,
            ProfileField::Edge => self.edge = value,
            ProfileField::CutInY => self.cut_in_y = value,
        }
    }

    /// Copy with the geometric extents multiplied by `factor`.
    pub fn scaled(mut self, factor: f32) -> Self {
        self.width *= factor;
        self.height *= factor;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        for field in ProfileField::ALL {
            let v = self.get(field);
            if !v.is_finite() {
                return Err(format!("{field:?} must be finite, got {v}"));
            }
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(format!(
                "width and height must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        if self.intensity < 0.0 {
            return Err(format!("intensity must be non-negative, got {}", self.intensity));
        }
        for (name, v) in [
            ("curve_cut", self.curve_cut),
            ("edge", self.edge),
            ("cut_in_y", self.cut_in_y),
        ] {
            if !(0.0..1.0).contains(&v) {
                return Err(format!("{name} must lie in [0, 1), got {v}"));
            }
        }
        Ok(())
    }
}

/// Left/right profile pair. Index 0 is the left eye.
pub type EyePair = [EmotionProfile; 2];

#[derive(Clone, Debug)]
pub struct EmotionCatalog {
    base: [EyePair; Emotion::COUNT],
    scaled: [EyePair; Emotion::COUNT],
    scale: f32,
}

impl EmotionCatalog {
    /// Validate the base profiles and scale their extents by `scale`.
    pub fn new(config: &CatalogConfig, scale: f32) -> FaceResult<Self> {
        check_scale(scale)?;

        let mut slots: [Option<EyePair>; Emotion::COUNT] = [None; Emotion::COUNT];
        for (name, pair) in &config.profiles {
            let emotion = Emotion::parse(name)?;
            if slots[emotion.index()].is_some() {
                return Err(FaceError::invalid_profile(
                    emotion.as_str(),
                    format!("defined more than once (last as '{name}')"),
                ));
            }
            for (eye, profile) in pair.iter().enumerate() {
                profile.validate().map_err(|reason| {
                    FaceError::invalid_profile(emotion.as_str(), format!("eye {eye}: {reason}"))
                })?;
            }
            slots[emotion.index()] = Some(*pair);
        }

        let mut base = [[EmotionProfile::zeroed(false); 2]; Emotion::COUNT];
        for emotion in Emotion::ALL {
            base[emotion.index()] = slots[emotion.index()]
                .ok_or_else(|| FaceError::invalid_profile(emotion.as_str(), "missing from catalog"))?;
        }

        Ok(Self::from_base(base, scale))
    }

    fn from_base(base: [EyePair; Emotion::COUNT], scale: f32) -> Self {
        let scaled = base.map(|pair| pair.map(|p| p.scaled(scale)));
        Self { base, scaled, scale }
    }

    /// The same catalog at a different scale factor.
    pub fn rescaled(&self, scale: f32) -> FaceResult<Self> {
        check_scale(scale)?;
        Ok(Self::from_base(self.base, scale))
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn lookup(&self, emotion: Emotion) -> &EyePair {
        &self.scaled[emotion.index()]
    }

    pub fn lookup_name(&self, name: &str) -> FaceResult<&EyePair> {
        Ok(self.lookup(Emotion::parse(name)?))
    }

    /// Largest scaled width and height over every profile.
    pub fn max_extent(&self) -> (f32, f32) {
        self.scaled
            .iter()
            .flatten()
            .fold((0.0f32, 0.0f32), |(w, h), p| (w.max(p.width), h.max(p.height)))
    }
}

fn check_scale(scale: f32) -> FaceResult<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(FaceError::config(format!("scale factor must be positive, got {scale}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(scale: f32) -> EmotionCatalog {
        EmotionCatalog::new(&CatalogConfig::default(), scale).unwrap()
    }

    #[test]
    fn parse_accepts_aliases_and_rejects_strangers() {
        assert_eq!(Emotion::parse("happy").unwrap(), Emotion::Joy);
        assert_eq!(Emotion::parse(" Angry ").unwrap(), Emotion::Anger);
        assert_eq!("fear".parse::<Emotion>().unwrap(), Emotion::Fear);
        assert!(matches!(
            Emotion::parse("unicorn"),
            Err(FaceError::UnknownEmotion(name)) if name == "unicorn"
        ));
    }

    #[test]
    fn index_matches_all_order() {
        for (i, e) in Emotion::ALL.iter().enumerate() {
            assert_eq!(e.index(), i);
        }
    }

    #[test]
    fn extents_are_scaled_and_shape_fields_are_not() {
        let c = catalog(2.0);
        let joy = c.lookup(Emotion::Joy);
        assert_eq!(joy[0].width, 80.0);
        assert_eq!(joy[0].curve_cut, 0.7);
        assert_eq!(c.lookup(Emotion::Neutral)[1].angle, -8.0);
    }

    #[test]
    fn lookup_name_reports_unknown() {
        let c = catalog(1.0);
        assert!(c.lookup_name("sad").is_ok());
        assert!(matches!(c.lookup_name("bored"), Err(FaceError::UnknownEmotion(_))));
    }

    #[test]
    fn max_extent_covers_every_profile() {
        let (w, h) = catalog(1.0).max_extent();
        assert_eq!(w, 50.0);
        assert_eq!(h, 40.0);
    }

    #[test]
    fn rescaled_keeps_base_content() {
        let c = catalog(1.0).rescaled(0.5).unwrap();
        assert_eq!(c.lookup(Emotion::Neutral)[0].width, 25.0);
        assert!(c.rescaled(0.0).is_err());
    }

    #[test]
    fn malformed_profiles_are_rejected() {
        let mut config = CatalogConfig::default();
        config.profiles.get_mut("fear").unwrap()[1].width = -3.0;
        assert!(matches!(
            EmotionCatalog::new(&config, 1.0),
            Err(FaceError::InvalidProfile { emotion, .. }) if emotion == "fear"
        ));

        let mut config = CatalogConfig::default();
        config.profiles.get_mut("joy").unwrap()[0].curve_cut = 1.0;
        assert!(EmotionCatalog::new(&config, 1.0).is_err());

        let mut config = CatalogConfig::default();
        config.profiles.remove("disgust");
        assert!(matches!(
            EmotionCatalog::new(&config, 1.0),
            Err(FaceError::InvalidProfile { reason, .. }) if reason.contains("missing")
        ));

        let mut config = CatalogConfig::default();
        let joy = config.profiles["joy"];
        config.profiles.insert("happy".to_string(), joy);
        assert!(EmotionCatalog::new(&config, 1.0).is_err());
    }
}
