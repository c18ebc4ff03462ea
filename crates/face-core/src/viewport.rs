use serde::{Deserialize, Serialize};

use crate::catalog::EmotionCatalog;
use crate::config::ViewportConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFactor {
    Desktop,
    Mobile,
}

/// Logical size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Physical pixels per logical pixel; hosts use it for overlay scaling.
    pub device_pixel_ratio: f32,
    pub form_factor: FormFactor,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: 1.0,
            form_factor: FormFactor::Desktop,
        }
    }

    /// From a physical surface size as reported by the windowing system.
    pub fn from_physical(width: u32, height: u32, device_pixel_ratio: f32, form_factor: FormFactor) -> Self {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width: width as f32 / dpr,
            height: height as f32 / dpr,
            device_pixel_ratio: dpr,
            form_factor,
        }
    }

    pub fn with_form_factor(mut self, form_factor: FormFactor) -> Self {
        self.form_factor = form_factor;
        self
    }

    /// Width and height clamped to at least one pixel.
    pub fn clamped_size(&self) -> (f32, f32) {
        (clamp_extent(self.width), clamp_extent(self.height))
    }
}

fn clamp_extent(v: f32) -> f32 {
    if v.is_finite() {
        v.max(1.0)
    } else {
        1.0
    }
}

/// Scale-derived constants for one viewport size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportLayout {
    pub scale_factor: f32,
    pub cell_size: f32,
    pub cell_spacing: f32,
    /// Horizontal distance between the two eye centers.
    pub eye_distance: f32,
    /// Handheld layouts ask the host to lock landscape orientation.
    pub landscape_lock: bool,
}

impl ViewportConfig {
    /// Scale relative to the base reference resolution.
    pub fn scale_factor(&self, viewport: &Viewport) -> f32 {
        let (w, h) = viewport.clamped_size();
        let base_ratio = self.base_width / self.base_height;
        let ratio = w / h;

        match viewport.form_factor {
            FormFactor::Desktop => {
                (w / self.base_width).max(h / self.base_height) * (ratio / base_ratio)
            }
            FormFactor::Mobile => {
                // Handheld layouts are locked to landscape; a portrait report
                // is the same screen before the rotation lands.
                let (w, h) = (w.max(h), w.min(h));
                let ratio = w / h;
                let alpha = (1.0 - ((w - h) / w).powi(2)).max(f32::EPSILON);
                (h / self.base_width).max(w / self.base_height) * (ratio / base_ratio) * alpha
            }
        }
    }

    pub fn layout(&self, viewport: &Viewport) -> ViewportLayout {
        let scale_factor = self.scale_factor(viewport);
        let (w, h) = viewport.clamped_size();
        let cell_size_base = match viewport.form_factor {
            FormFactor::Desktop => self.cell_size_base,
            FormFactor::Mobile => self.mobile_cell_size_base,
        };
        ViewportLayout {
            scale_factor,
            cell_size: cell_size_base * scale_factor,
            cell_spacing: self.cell_spacing_base * scale_factor,
            eye_distance: w.max(h) * self.eye_distance_ratio,
            landscape_lock: viewport.form_factor == FormFactor::Mobile,
        }
    }
}

/// Fixed cell grid shared by both eyes: large enough for every catalog profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    pub cell_size: f32,
    pub cell_spacing: f32,
    pub max_width: usize,
    pub max_height: usize,
    pub eye_distance: f32,
}

impl GridGeometry {
    pub fn new(layout: &ViewportLayout, catalog: &EmotionCatalog) -> Self {
        let (w, h) = catalog.max_extent();
        Self {
            cell_size: layout.cell_size,
            cell_spacing: layout.cell_spacing,
            max_width: (w.ceil() as usize).max(1),
            max_height: (h.ceil() as usize).max(1),
            eye_distance: layout.eye_distance,
        }
    }

    /// Distance between neighbouring cell origins.
    pub fn pitch(&self) -> f32 {
        self.cell_size + self.cell_spacing
    }

    pub fn total_width(&self) -> f32 {
        self.pitch() * self.max_width as f32
    }

    pub fn total_height(&self) -> f32 {
        self.pitch() * self.max_height as f32
    }

    pub fn cell_count(&self) -> usize {
        self.max_width * self.max_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-5 * b.abs().max(1.0)
    }

    #[test]
    fn reference_resolution_has_unit_scale() {
        let config = ViewportConfig::default();
        let layout = config.layout(&Viewport::new(2048.0, 1200.0));
        assert!(close(layout.scale_factor, 1.0));
        assert!(close(layout.cell_size, 8.0));
        assert!(close(layout.cell_spacing, 1.0));
        assert!(close(layout.eye_distance, 2048.0 * 0.42));
        assert!(!layout.landscape_lock);
    }

    #[test]
    fn halving_the_viewport_halves_derived_constants() {
        let config = ViewportConfig::default();
        for form in [FormFactor::Desktop, FormFactor::Mobile] {
            let full = config.layout(&Viewport::new(1600.0, 900.0).with_form_factor(form));
            let half = config.layout(&Viewport::new(800.0, 450.0).with_form_factor(form));
            assert!(close(half.scale_factor, full.scale_factor / 2.0));
            assert!(close(half.cell_size, full.cell_size / 2.0));
            assert!(close(half.cell_spacing, full.cell_spacing / 2.0));
            assert!(close(half.eye_distance, full.eye_distance / 2.0));
        }
    }

    #[test]
    fn mobile_uses_larger_cells_and_locks_landscape() {
        let config = ViewportConfig::default();
        let vp = Viewport::new(1200.0, 800.0).with_form_factor(FormFactor::Mobile);
        let layout = config.layout(&vp);
        let alpha = 1.0 - (400.0f32 / 1200.0).powi(2);
        let expected = (800.0f32 / 2048.0).max(1200.0 / 1200.0) * (1.5 / (2048.0 / 1200.0)) * alpha;
        assert!(close(layout.scale_factor, expected));
        assert!(close(layout.cell_size, 12.0 * expected));
        assert!(layout.landscape_lock);
    }

    #[test]
    fn portrait_handheld_scales_like_its_landscape_rotation() {
        let config = ViewportConfig::default();
        let mobile = |w: f32, h: f32| {
            config.scale_factor(&Viewport::new(w, h).with_form_factor(FormFactor::Mobile))
        };
        for (w, h) in [(390.0, 844.0), (360.0, 800.0), (100.0, 1000.0), (1.0, 5000.0)] {
            let portrait = mobile(w, h);
            assert!(portrait.is_finite() && portrait > 0.0, "{w}x{h} -> {portrait}");
            assert!(close(portrait, mobile(h, w)));
        }
    }

    #[test]
    fn degenerate_viewport_is_clamped() {
        let config = ViewportConfig::default();
        let s = config.scale_factor(&Viewport::new(0.0, 0.0));
        assert!(s.is_finite() && s > 0.0);
        assert_eq!(Viewport::new(-5.0, f32::NAN).clamped_size(), (1.0, 1.0));
    }

    #[test]
    fn physical_sizes_are_divided_by_the_pixel_ratio() {
        let vp = Viewport::from_physical(2560, 1440, 2.0, FormFactor::Desktop);
        assert_eq!((vp.width, vp.height), (1280.0, 720.0));
        assert_eq!(vp.device_pixel_ratio, 2.0);
        let vp = Viewport::from_physical(100, 100, 0.0, FormFactor::Desktop);
        assert_eq!(vp.device_pixel_ratio, 1.0);
    }

    #[test]
    fn grid_fits_the_largest_profile() {
        let config = ViewportConfig::default();
        let layout = config.layout(&Viewport::new(2048.0, 1200.0));
        let catalog = EmotionCatalog::new(&CatalogConfig::default(), layout.scale_factor).unwrap();
        let grid = GridGeometry::new(&layout, &catalog);
        assert_eq!(grid.max_width, 50);
        assert_eq!(grid.max_height, 40);
        assert_eq!(grid.cell_count(), 2000);
        assert!(close(grid.total_width(), 9.0 * 50.0));
    }
}
