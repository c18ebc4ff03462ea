pub mod blink;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod mask;
pub mod render;
pub mod signal;
pub mod transition;
pub mod viewport;

#[cfg(feature = "gui")]
pub mod gui;

pub use blink::BlinkCycle;
pub use catalog::{Emotion, EmotionCatalog, EmotionProfile, EyePair, ProfileField};
pub use config::FaceConfig;
pub use engine::FaceEngine;
pub use error::{FaceError, FaceResult};
pub use gpu::{LedInstance, LedRenderer};
pub use render::{CellState, EyeFrame, FaceFrame, Renderer};
pub use signal::{EmotionWeights, EmotionWindow, FaceSignal};
pub use transition::TransitionEngine;
pub use viewport::{FormFactor, GridGeometry, Viewport, ViewportLayout};
