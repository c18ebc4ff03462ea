pub type FaceResult<T> = Result<T, FaceError>;

#[derive(thiserror::Error, Debug)]
pub enum FaceError {
    #[error("unknown emotion '{0}'")]
    UnknownEmotion(String),

    #[error("invalid emotion weights: {0}")]
    InvalidWeights(String),

    #[error("invalid profile for '{emotion}': {reason}")]
    InvalidProfile { emotion: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl FaceError {
    pub fn unknown_emotion(name: impl Into<String>) -> Self {
        Self::UnknownEmotion(name.into())
    }

    pub fn invalid_weights(msg: impl Into<String>) -> Self {
        Self::InvalidWeights(msg.into())
    }

    pub fn invalid_profile(emotion: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProfile {
            emotion: emotion.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_input() {
        assert_eq!(
            FaceError::unknown_emotion("unicorn").to_string(),
            "unknown emotion 'unicorn'"
        );
        assert!(FaceError::invalid_weights("all zero")
            .to_string()
            .contains("all zero"));
        let e = FaceError::invalid_profile("joy", "width must be positive");
        assert!(e.to_string().contains("joy"));
        assert!(e.to_string().contains("width must be positive"));
    }
}
