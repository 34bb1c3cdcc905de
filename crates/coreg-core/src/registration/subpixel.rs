use ndarray::Array2;

use crate::consts::EPSILON;

/// Offset of the vertex of a parabola through `(-1, prev)`, `(0, curr)`,
/// `(1, next)`, clamped to half a pixel.
#[inline]
pub(crate) fn parabola_vertex(prev: f64, curr: f64, next: f64) -> f64 {
    let denom = prev - 2.0 * curr + next;
    if denom.abs() > EPSILON {
        ((prev - next) / (2.0 * denom)).clamp(-0.5, 0.5)
    } else {
        0.0
    }
}

/// Refine a peak of a periodic correlation surface by fitting a parabola
/// along each axis through the 3-pixel neighbourhood. Neighbours wrap.
///
/// Returns `(delta_row, delta_col)` as fractional offsets from the peak.
pub(crate) fn refine_peak_periodic(
    surface: &Array2<f64>,
    peak_row: usize,
    peak_col: usize,
) -> (f64, f64) {
    let (h, w) = surface.dim();
    if h < 3 || w < 3 {
        return (0.0, 0.0);
    }
    let up = (peak_row + h - 1) % h;
    let down = (peak_row + 1) % h;
    let left = (peak_col + w - 1) % w;
    let right = (peak_col + 1) % w;
    let curr = surface[[peak_row, peak_col]];

    let delta_row = parabola_vertex(surface[[up, peak_col]], curr, surface[[down, peak_col]]);
    let delta_col = parabola_vertex(surface[[peak_row, left]], curr, surface[[peak_row, right]]);
    (delta_row, delta_col)
}
