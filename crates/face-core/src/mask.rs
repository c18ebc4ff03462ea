/// Whether cell `(x, y)` lies inside an ellipse of `width × height` cells,
/// optionally trimmed by a curved chord cut from one pole.
///
/// Coordinates are relative to the shape's own top-left corner; rows grow
/// downward, so the "top" pole is `ny = -1`.
pub fn is_inside(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    curve_cut: f32,
    cut_from_top: bool,
) -> bool {
    if !(width > 0.0 && height > 0.0) {
        return false;
    }

    let nx = (x - width / 2.0) / (width / 2.0);
    let ny = (y - height / 2.0) / (height / 2.0);
    let base_ellipse = nx * nx + ny * ny <= 1.0;

    if curve_cut > 0.0 {
        let cut_y = if cut_from_top {
            -1.0 + curve_cut
        } else {
            1.0 - curve_cut
        };
        // Inside the base ellipse |nx| <= 1, so the root is real there.
        let cut_curve = (1.0 - nx * nx).max(0.0).sqrt() * curve_cut;

        return if cut_from_top {
            base_ellipse && ny > cut_y + cut_curve
        } else {
            base_ellipse && ny < cut_y - cut_curve
        };
    }

    base_ellipse
}

/// Straight horizontal clip: rows above `max_height * cut_in_y` stay dark.
pub fn row_clipped(row: usize, max_height: usize, cut_in_y: f32) -> bool {
    (row as f32) < max_height as f32 * cut_in_y
}
