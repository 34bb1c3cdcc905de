use ndarray::{Array2, ArrayView2};

/// Central-difference gradients `(gx, gy)`; one-sided at the borders.
pub fn central_gradients(data: &ArrayView2<'_, f32>) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = data.dim();
    let gx = Array2::from_shape_fn((h, w), |(r, c)| {
        if w < 2 {
            return 0.0;
        }
        let (lo, hi) = (c.saturating_sub(1), (c + 1).min(w - 1));
        (data[[r, hi]] - data[[r, lo]]) / (hi - lo) as f32
    });
    let gy = Array2::from_shape_fn((h, w), |(r, c)| {
        if h < 2 {
            return 0.0;
        }
        let (lo, hi) = (r.saturating_sub(1), (r + 1).min(h - 1));
        (data[[hi, c]] - data[[lo, c]]) / (hi - lo) as f32
    });
    (gx, gy)
}

/// Sobel gradients `(gx, gy)`, scaled by 1/8 so that a unit ramp has unit
/// slope. The 1-pixel border is zero.
pub fn sobel_gradients(data: &ArrayView2<'_, f32>) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = data.dim();
    let mut gx = Array2::<f32>::zeros((h, w));
    let mut gy = Array2::<f32>::zeros((h, w));
    if h < 3 || w < 3 {
        return (gx, gy);
    }

    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let sx = -data[[row - 1, col - 1]] + data[[row - 1, col + 1]]
                - 2.0 * data[[row, col - 1]]
                + 2.0 * data[[row, col + 1]]
                - data[[row + 1, col - 1]]
                + data[[row + 1, col + 1]];

            let sy = -data[[row - 1, col - 1]]
                - 2.0 * data[[row - 1, col]]
                - data[[row - 1, col + 1]]
                + data[[row + 1, col - 1]]
                + 2.0 * data[[row + 1, col]]
                + data[[row + 1, col + 1]];

            gx[[row, col]] = sx / 8.0;
            gy[[row, col]] = sy / 8.0;
        }
    }

    (gx, gy)
}
