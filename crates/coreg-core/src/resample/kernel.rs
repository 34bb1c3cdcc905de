//! Interpolation kernels.
//!
//! All kernels take positions in pixel-centre coordinates and clamp
//! neighbour indices to the raster, so callers only need to reject
//! positions outside the raster footprint.

use ndarray::ArrayView2;

#[inline]
fn clamp_index(i: i64, n: usize) -> usize {
    i.clamp(0, n as i64 - 1) as usize
}

#[inline]
pub(crate) fn nearest(data: &ArrayView2<'_, f32>, x: f64, y: f64) -> f32 {
    let (h, w) = data.dim();
    data[[clamp_index(y.round() as i64, h), clamp_index(x.round() as i64, w)]]
}

#[inline]
pub(crate) fn bilinear(data: &ArrayView2<'_, f32>, x: f64, y: f64) -> f32 {
    let (h, w) = data.dim();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;

    let c0 = clamp_index(x0 as i64, w);
    let c1 = clamp_index(x0 as i64 + 1, w);
    let r0 = clamp_index(y0 as i64, h);
    let r1 = clamp_index(y0 as i64 + 1, h);

    let top = data[[r0, c0]] + fx * (data[[r0, c1]] - data[[r0, c0]]);
    let bottom = data[[r1, c0]] + fx * (data[[r1, c1]] - data[[r1, c0]]);
    top + fy * (bottom - top)
}

/// Catmull-Rom cubic kernel (a = -0.5).
#[inline]
fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

#[inline]
pub(crate) fn bicubic(data: &ArrayView2<'_, f32>, x: f64, y: f64) -> f32 {
    let (h, w) = data.dim();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let mut wx = [0.0f64; 4];
    let mut wy = [0.0f64; 4];
    for i in 0..4 {
        let offset = i as f64 - 1.0;
        wx[i] = cubic_weight(fx - offset);
        wy[i] = cubic_weight(fy - offset);
    }

    let mut sum = 0.0f64;
    for (j, &wy_j) in wy.iter().enumerate() {
        let r = clamp_index(y0 as i64 + j as i64 - 1, h);
        let mut row_sum = 0.0f64;
        for (i, &wx_i) in wx.iter().enumerate() {
            let c = clamp_index(x0 as i64 + i as i64 - 1, w);
            row_sum += wx_i * data[[r, c]] as f64;
        }
        sum += wy_j * row_sum;
    }
    sum as f32
}
