use crate::catalog::{EmotionProfile, EyePair};
use crate::config::ColorConfig;
use crate::mask;
use crate::transition::lerp;
use crate::viewport::GridGeometry;

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Exponent of the rim-to-center color blend. At zero every rim cell takes
/// the full center color.
const EDGE_BLEND_EXPONENT: i32 = 0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellState {
    pub visible: bool,
    /// Top-left corner relative to the eye's pivot (the grid center), in pixels.
    pub position: [f32; 2],
    pub color: [f32; 3],
    pub alpha: f32,
}

impl Default for CellState {
    fn default() -> Self {
        Self {
            visible: false,
            position: [0.0, 0.0],
            color: WHITE,
            alpha: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EyeFrame {
    /// Horizontal offset of the eye pivot from the cluster anchor.
    pub offset_x: f32,
    /// Rotation about the pivot, in radians.
    pub rotation: f32,
    /// Row-major, `max_width` cells per row.
    pub cells: Vec<CellState>,
}

/// Everything needed to put one tick of the face on screen.
#[derive(Clone, Debug)]
pub struct FaceFrame {
    pub anchor: [f32; 2],
    pub geometry: GridGeometry,
    pub eyes: [EyeFrame; 2],
}

impl FaceFrame {
    pub fn new(geometry: GridGeometry) -> Self {
        let eye = |offset_x: f32| EyeFrame {
            offset_x,
            rotation: 0.0,
            cells: vec![CellState::default(); geometry.cell_count()],
        };
        let half = geometry.eye_distance / 2.0;
        Self {
            anchor: [0.0, 0.0],
            geometry,
            eyes: [eye(-half), eye(half)],
        }
    }

    /// Swap in new geometry, reallocating the cells only if the grid changed shape.
    pub fn set_geometry(&mut self, geometry: GridGeometry) {
        if geometry.cell_count() != self.geometry.cell_count()
            || geometry.max_width != self.geometry.max_width
        {
            let anchor = self.anchor;
            *self = Self::new(geometry);
            self.anchor = anchor;
            return;
        }
        let half = geometry.eye_distance / 2.0;
        self.eyes[0].offset_x = -half;
        self.eyes[1].offset_x = half;
        self.geometry = geometry;
    }

    pub fn cell(&self, eye: usize, x: usize, y: usize) -> &CellState {
        &self.eyes[eye].cells[y * self.geometry.max_width + x]
    }

    pub fn visible_count(&self, eye: usize) -> usize {
        self.eyes[eye].cells.iter().filter(|c| c.visible).count()
    }

    /// Screen-space center of a cell after eye rotation and placement.
    pub fn cell_center(&self, eye: usize, index: usize) -> [f32; 2] {
        let eye = &self.eyes[eye];
        let cell = &eye.cells[index];
        let half = self.geometry.cell_size / 2.0;
        let lx = cell.position[0] + half;
        let ly = cell.position[1] + half;
        let (sin, cos) = eye.rotation.sin_cos();
        [
            self.anchor[0] + eye.offset_x + lx * cos - ly * sin,
            self.anchor[1] + lx * sin + ly * cos,
        ]
    }
}

/// Turns interpolated eye shapes and blink state into per-cell output.
#[derive(Clone, Debug)]
pub struct Renderer {
    colors: ColorConfig,
}

impl Renderer {
    pub fn new(colors: ColorConfig) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &ColorConfig {
        &self.colors
    }

    pub fn set_colors(&mut self, colors: ColorConfig) {
        self.colors = colors;
    }

    pub fn draw(&self, frame: &mut FaceFrame, eyes: &EyePair, blink_progress: f32) {
        let geometry = frame.geometry;
        for (profile, eye) in eyes.iter().zip(frame.eyes.iter_mut()) {
            self.draw_eye(&geometry, profile, blink_progress, eye);
        }
    }

    fn draw_eye(
        &self,
        geometry: &GridGeometry,
        profile: &EmotionProfile,
        blink_progress: f32,
        eye: &mut EyeFrame,
    ) {
        eye.rotation = profile.angle.to_radians();

        let max_w = geometry.max_width as f32;
        let max_h = geometry.max_height as f32;
        let (w, h) = (profile.width, profile.height);
        let shift_x = (max_w - w) / 2.0;
        let shift_y = (max_h - h) / 2.0;
        let pitch = geometry.pitch();
        let half_total_w = geometry.total_width() / 2.0;
        let half_total_h = geometry.total_height() / 2.0;
        let brightness = (1.0 - blink_progress).min(1.0);

        for (index, cell) in eye.cells.iter_mut().enumerate() {
            let x = index % geometry.max_width;
            let y = index / geometry.max_width;
            let (xf, yf) = (x as f32, y as f32);
            let lx = xf - shift_x;
            let ly = yf - shift_y;

            if !mask::is_inside(lx, ly, w, h, profile.curve_cut, profile.cut_from_top)
                || mask::row_clipped(y, geometry.max_height, profile.cut_in_y)
            {
                cell.visible = false;
                continue;
            }

            let distance_from_center = (xf - max_w / 2.0).abs() / (w / 2.0);
            let y_offset = profile.curve * distance_from_center * h * 0.5;

            let dx = lx - w / 2.0;
            let dy = ly - h / 2.0;
            let distance_from_edge = 1.0 - (dx * dx / (w * w / 4.0) + dy * dy / (h * h / 4.0)).sqrt();
            let (color, alpha) = self.shade(distance_from_edge, profile.edge, brightness);

            *cell = CellState {
                visible: true,
                position: [xf * pitch - half_total_w, yf * pitch - half_total_h + y_offset],
                color,
                alpha,
            };
        }
    }

    fn shade(&self, distance_from_edge: f32, edge: f32, brightness: f32) -> ([f32; 3], f32) {
        if distance_from_edge < edge {
            let color_factor = distance_from_edge.powi(EDGE_BLEND_EXPONENT);
            let led = lerp_color(self.colors.edge_color, self.colors.center_color, color_factor);
            let color = lerp_color(WHITE, led, brightness);
            let shadow = (edge - distance_from_edge) / edge;
            (color, brightness * (1.0 - shadow))
        } else {
            ([brightness, brightness, 1.0], brightness)
        }
    }
}

fn lerp_color(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Emotion, EmotionCatalog};
    use crate::config::{CatalogConfig, ViewportConfig};
    use crate::viewport::Viewport;

    fn setup() -> (EmotionCatalog, FaceFrame, Renderer) {
        let layout = ViewportConfig::default().layout(&Viewport::new(2048.0, 1200.0));
        let catalog = EmotionCatalog::new(&CatalogConfig::default(), layout.scale_factor).unwrap();
        let frame = FaceFrame::new(GridGeometry::new(&layout, &catalog));
        (catalog, frame, Renderer::new(ColorConfig::default()))
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn neutral_center_is_lit_and_corners_are_dark() {
        let (catalog, mut frame, renderer) = setup();
        renderer.draw(&mut frame, catalog.lookup(Emotion::Neutral), 0.0);

        let center = frame.cell(0, 25, 20);
        assert!(center.visible);
        assert_eq!(center.color, [1.0, 1.0, 1.0]);
        assert_eq!(center.alpha, 1.0);
        assert!(!frame.cell(0, 0, 0).visible);
        assert!(!frame.cell(1, 49, 39).visible);
        // 30 rows tall, centered in 40
        assert!(!frame.cell(0, 25, 4).visible);
        assert!(frame.cell(0, 25, 6).visible);
    }

    #[test]
    fn rim_cells_take_the_center_color_with_a_shadow() {
        let (catalog, mut frame, renderer) = setup();
        renderer.draw(&mut frame, catalog.lookup(Emotion::Neutral), 0.0);

        // nx = -0.92, ny = 0: distance 0.08, halfway into a 0.16 rim
        let rim = frame.cell(0, 2, 20);
        assert!(rim.visible);
        assert_eq!(rim.color, ColorConfig::default().center_color);
        assert!(close(rim.alpha, 0.5));
    }

    #[test]
    fn blink_dims_every_visible_cell() {
        let (catalog, mut frame, renderer) = setup();
        renderer.draw(&mut frame, catalog.lookup(Emotion::Surprise), 0.5);
        let center = frame.cell(0, 25, 20);
        assert_eq!(center.color, [0.5, 0.5, 1.0]);
        assert_eq!(center.alpha, 0.5);

        let rim = frame.cell(0, 6, 20);
        assert!(rim.visible);
        let expected = lerp_color(WHITE, ColorConfig::default().center_color, 0.5);
        for i in 0..3 {
            assert!(close(rim.color[i], expected[i]));
        }

        renderer.draw(&mut frame, catalog.lookup(Emotion::Surprise), 1.0);
        assert!(frame.eyes[0]
            .cells
            .iter()
            .filter(|c| c.visible)
            .all(|c| c.alpha == 0.0));
    }

    #[test]
    fn row_clip_hides_the_top_rows() {
        let (catalog, mut frame, renderer) = setup();
        renderer.draw(&mut frame, catalog.lookup(Emotion::Sadness), 0.0);
        for y in 0..8 {
            for x in 0..50 {
                assert!(!frame.cell(0, x, y).visible);
            }
        }
        assert!(frame.visible_count(0) > 0);
    }

    #[test]
    fn curve_bows_rows_away_from_the_center_column() {
        let (catalog, mut frame, renderer) = setup();
        renderer.draw(&mut frame, catalog.lookup(Emotion::Anger), 0.0);
        let pitch = frame.geometry.pitch();
        let half_h = frame.geometry.total_height() / 2.0;

        let mid = frame.cell(0, 25, 30);
        assert!(mid.visible);
        assert!(close(mid.position[1], 30.0 * pitch - half_h));

        let side = frame.cell(0, 10, 27);
        assert!(side.visible);
        let offset = -0.3 * (15.0 / 22.5) * 22.5 * 0.5;
        assert!(close(side.position[1], 27.0 * pitch - half_h + offset));
    }

    #[test]
    fn rotation_follows_profile_angle() {
        let (catalog, mut frame, renderer) = setup();
        renderer.draw(&mut frame, catalog.lookup(Emotion::Fear), 0.0);
        assert!(close(frame.eyes[0].rotation, (-16.0f32).to_radians()));
        assert!(close(frame.eyes[1].rotation, 16.0f32.to_radians()));
    }

    #[test]
    fn degenerate_shape_renders_nothing() {
        let (catalog, mut frame, renderer) = setup();
        let mut eyes = *catalog.lookup(Emotion::Neutral);
        eyes[0].width = 0.0;
        eyes[1].edge = 0.0;
        renderer.draw(&mut frame, &eyes, 0.0);
        assert_eq!(frame.visible_count(0), 0);
        assert!(frame.visible_count(1) > 0);
        assert!(frame.eyes[1]
            .cells
            .iter()
            .all(|c| c.alpha.is_finite() && c.position.iter().all(|p| p.is_finite())));
    }

    #[test]
    fn cell_center_applies_anchor_offset_and_rotation() {
        let (_, mut frame, _) = setup();
        frame.anchor = [100.0, 50.0];
        frame.eyes[1].rotation = std::f32::consts::FRAC_PI_2;
        frame.eyes[1].cells[0].position = [10.0, 0.0];
        let half = frame.geometry.cell_size / 2.0;
        let p = frame.cell_center(1, 0);
        let offset = frame.eyes[1].offset_x;
        assert!(close(p[0], 100.0 + offset - half));
        assert!(close(p[1], 50.0 + 10.0 + half));
    }
}
