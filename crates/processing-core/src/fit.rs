//! Aspect-preserving fit of a clip into a grid cell.

use montage_media_model::grid::Canvas;

/// Largest size with `source`'s aspect ratio that fits inside `bounds`.
///
/// Dimensions are rounded down to even numbers (4:2:0 encoders reject odd
/// sizes) and never drop below 2. A degenerate source fills the bounds.
pub fn fit_within(source: Canvas, bounds: Canvas) -> Canvas {
    if source.width == 0 || source.height == 0 {
        return Canvas::new(even_floor(bounds.width), even_floor(bounds.height));
    }

    let scale_w = bounds.width as f64 / source.width as f64;
    let scale_h = bounds.height as f64 / source.height as f64;
    let scale = scale_w.min(scale_h);

    let width = (source.width as f64 * scale).floor() as u32;
    let height = (source.height as f64 * scale).floor() as u32;
    Canvas::new(even_floor(width), even_floor(height))
}

fn even_floor(v: u32) -> u32 {
    (v - v % 2).max(2)
}
