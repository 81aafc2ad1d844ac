//! Source-over compositing of viewport pages onto a single surface.

use image::Rgba;
use pdf_engine::PageSurface;
use viewer_core::Viewport;

/// Blends `src` over `dst` with its top-left corner at (`x`, `y`), scaling
/// source alpha by `opacity`. Pixels falling outside `dst` are clipped.
pub fn blend_over(dst: &mut PageSurface, src: &PageSurface, x: i64, y: i64, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return;
    }

    let (dst_width, dst_height) = (i64::from(dst.width()), i64::from(dst.height()));
    let col_start = (-x).max(0);
    let col_end = (dst_width - x).min(i64::from(src.width()));
    let row_start = (-y).max(0);
    let row_end = (dst_height - y).min(i64::from(src.height()));

    for row in row_start..row_end {
        for col in col_start..col_end {
            let source = src.get_pixel(col as u32, row as u32);
            let target = dst.get_pixel_mut((x + col) as u32, (y + row) as u32);
            *target = over(*source, *target, opacity);
        }
    }
}

/// Paints the viewport's rendered visible pages at their on-screen position.
/// Unrendered pages leave the canvas untouched.
pub fn paint_viewport(canvas: &mut PageSurface, viewport: &Viewport, opacity: f32) {
    let scroll_top = viewport.scroll_top();

    for (placeholder, surface) in viewport.rendered_visible() {
        let y = (placeholder.top - scroll_top).round() as i64;
        blend_over(canvas, surface, 0, y, opacity);
    }
}

fn over(source: Rgba<u8>, target: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let src_alpha = f32::from(source[3]) / 255.0 * opacity;
    let dst_alpha = f32::from(target[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |index: usize| {
        let src = f32::from(source[index]) * src_alpha;
        let dst = f32::from(target[index]) * dst_alpha * (1.0 - src_alpha);
        ((src + dst) / out_alpha).round().clamp(0.0, 255.0) as u8
    };

    Rgba([channel(0), channel(1), channel(2), (out_alpha * 255.0).round() as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> PageSurface {
        PageSurface::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn opaque_source_replaces_target() {
        let mut dst = solid(4, 4, [0, 0, 255, 255]);

        blend_over(&mut dst, &solid(2, 2, [255, 0, 0, 255]), 1, 1, 1.0);

        assert_eq!(dst.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(dst.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn half_opacity_mixes_evenly_over_opaque_base() {
        let mut dst = solid(1, 1, [0, 0, 0, 255]);

        blend_over(&mut dst, &solid(1, 1, [255, 255, 255, 255]), 0, 0, 0.5);

        assert_eq!(dst.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn source_outside_canvas_is_clipped() {
        let mut dst = solid(3, 3, [0, 0, 0, 0]);

        blend_over(&mut dst, &solid(3, 3, [9, 9, 9, 255]), -2, 2, 1.0);

        assert_eq!(dst.get_pixel(0, 2), &Rgba([9, 9, 9, 255]));
        assert_eq!(dst.get_pixel(1, 2), &Rgba([0, 0, 0, 0]));
        assert_eq!(dst.get_pixel(0, 1), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn transparent_base_takes_source_color() {
        let mut dst = solid(1, 1, [0, 0, 0, 0]);

        blend_over(&mut dst, &solid(1, 1, [200, 100, 50, 255]), 0, 0, 0.5);

        assert_eq!(dst.get_pixel(0, 0), &Rgba([200, 100, 50, 128]));
    }
}
