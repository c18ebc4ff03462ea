use log::{debug, info, warn};

use crate::blink::BlinkCycle;
use crate::catalog::{Emotion, EmotionCatalog};
use crate::config::{ColorConfig, FaceConfig};
use crate::error::{FaceError, FaceResult};
use crate::render::{FaceFrame, Renderer};
use crate::signal::EmotionWeights;
use crate::transition::TransitionEngine;
use crate::viewport::{GridGeometry, Viewport, ViewportLayout};

/// Owns every piece of face state. Collaborators hold a `&mut FaceEngine`
/// to push emotion, look-at and viewport signals between ticks.
///
/// Tick timestamps are milliseconds on the caller's clock; the blink timer
/// starts at zero on that clock.
#[derive(Debug)]
pub struct FaceEngine {
    config: FaceConfig,
    viewport: Viewport,
    layout: ViewportLayout,
    catalog: EmotionCatalog,
    transition: TransitionEngine,
    blink: BlinkCycle,
    renderer: Renderer,
    look_at: [f32; 2],
    frame: FaceFrame,
}

impl FaceEngine {
    pub fn new(config: FaceConfig, viewport: Viewport) -> FaceResult<Self> {
        config.validate()?;

        let layout = config.viewport.layout(&viewport);
        let catalog = EmotionCatalog::new(&config.catalog, layout.scale_factor)?;
        let geometry = GridGeometry::new(&layout, &catalog);
        if layout.landscape_lock {
            info!("handheld viewport: requesting landscape orientation lock");
        }
        debug!(
            "face grid {}x{} cells, scale {:.3}",
            geometry.max_width, geometry.max_height, layout.scale_factor
        );

        let mut engine = Self {
            transition: TransitionEngine::new(&catalog, config.transition.step),
            blink: BlinkCycle::new(config.blink.clone(), 0.0),
            renderer: Renderer::new(config.colors.clone()),
            frame: FaceFrame::new(geometry),
            look_at: [0.5, 0.5],
            config,
            viewport,
            layout,
            catalog,
        };
        engine.place_cluster();
        Ok(engine)
    }

    // ============================================================
    // Signals
    // ============================================================

    pub fn set_target(&mut self, weights: &EmotionWeights, dominant: Emotion) -> FaceResult<()> {
        self.transition.set_target(&self.catalog, weights, dominant)
    }

    /// Named scores as reported by a classifier. Weights are checked before
    /// the dominant name, so an empty map is always `InvalidWeights`.
    pub fn set_target_scores<I, S>(&mut self, scores: I, dominant: &str) -> FaceResult<()>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        let weights = EmotionWeights::from_scores(scores)?;
        if !(weights.total() > 0.0) {
            return Err(FaceError::invalid_weights("weights are empty or all zero"));
        }
        let dominant = Emotion::parse(dominant)?;
        self.set_target(&weights, dominant)
    }

    /// Blend fully toward one expression.
    pub fn set_emotion(&mut self, name: &str) -> FaceResult<()> {
        let emotion = Emotion::parse(name)?;
        self.set_target(&EmotionWeights::single(emotion), emotion)
    }

    pub fn set_look_at(&mut self, x: f32, y: f32) {
        let clamp = |v: f32| if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) };
        let (cx, cy) = (clamp(x), clamp(y));
        if (cx, cy) != (x, y) {
            warn!("look-at ({x}, {y}) outside the unit square, using ({cx}, {cy})");
        }
        self.look_at = [cx, cy];
        self.place_cluster();
    }

    /// Recompute every scale-derived constant. Animation progress and
    /// emotion names are left alone.
    pub fn resize(&mut self, viewport: Viewport) -> FaceResult<()> {
        let layout = self.config.viewport.layout(&viewport);
        let catalog = self.catalog.rescaled(layout.scale_factor)?;
        let ratio = layout.scale_factor / self.layout.scale_factor;

        if ratio != 1.0 {
            self.transition.rescale(ratio);
        }
        self.frame.set_geometry(GridGeometry::new(&layout, &catalog));
        if layout.landscape_lock && !self.layout.landscape_lock {
            info!("handheld viewport: requesting landscape orientation lock");
        }
        debug!(
            "resize to {}x{}: scale {:.3} -> {:.3}",
            viewport.width, viewport.height, self.layout.scale_factor, layout.scale_factor
        );

        self.catalog = catalog;
        self.layout = layout;
        self.viewport = viewport;
        self.place_cluster();
        Ok(())
    }

    fn place_cluster(&mut self) {
        let (w, h) = self.viewport.clamped_size();
        self.frame.anchor = [self.look_at[0] * w, self.look_at[1] * h];
    }

    // ============================================================
    // Tick
    // ============================================================

    /// Advance transition, blink and cell output by one frame.
    pub fn tick(&mut self, now_ms: f64) -> &FaceFrame {
        self.transition.tick();
        self.blink.tick(now_ms);
        self.renderer
            .draw(&mut self.frame, self.transition.current(), self.blink.progress());
        &self.frame
    }

    // ============================================================
    // Accessors
    // ============================================================

    pub fn frame(&self) -> &FaceFrame {
        &self.frame
    }

    pub fn current_emotion(&self) -> Emotion {
        self.transition.current_emotion()
    }

    pub fn target_emotion(&self) -> Emotion {
        self.transition.target_emotion()
    }

    pub fn transition(&self) -> &TransitionEngine {
        &self.transition
    }

    pub fn blink(&self) -> &BlinkCycle {
        &self.blink
    }

    pub fn catalog(&self) -> &EmotionCatalog {
        &self.catalog
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.frame.geometry
    }

    pub fn layout(&self) -> &ViewportLayout {
        &self.layout
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn look_at(&self) -> [f32; 2] {
        self.look_at
    }

    pub fn config(&self) -> &FaceConfig {
        &self.config
    }

    pub fn colors(&self) -> &ColorConfig {
        self.renderer.colors()
    }

    pub fn set_colors(&mut self, colors: ColorConfig) {
        self.config.colors = colors.clone();
        self.renderer.set_colors(colors);
    }
}
