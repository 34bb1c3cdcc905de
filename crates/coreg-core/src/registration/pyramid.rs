use ndarray::{Array2, ArrayView2};

use crate::consts::{MIN_PYRAMID_SIZE, PYRAMID_BLUR_SIGMA};
use crate::filters::gaussian_blur::{downsample_2x, gaussian_blur_array};

/// Build a Gaussian pyramid with up to `levels` downsampled levels.
///
/// Index 0 is the original; each further level halves both dimensions.
/// Stops early once a level would drop below the minimum useful size, so
/// the returned vector may hold fewer than `levels + 1` entries.
pub(crate) fn build_pyramid(data: &ArrayView2<'_, f32>, levels: usize) -> Vec<Array2<f32>> {
    let mut pyramid = Vec::with_capacity(levels + 1);
    pyramid.push(data.to_owned());

    for _ in 0..levels {
        let Some(current) = pyramid.last() else {
            break;
        };
        let (h, w) = current.dim();
        if h.div_ceil(2) < MIN_PYRAMID_SIZE || w.div_ceil(2) < MIN_PYRAMID_SIZE {
            break;
        }
        let blurred = gaussian_blur_array(&current.view(), PYRAMID_BLUR_SIGMA);
        pyramid.push(downsample_2x(&blurred.view()));
    }

    pyramid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyramid_halves_each_level() {
        let data = Array2::<f32>::zeros((128, 100));
        let pyramid = build_pyramid(&data.view(), 2);
        let dims: Vec<_> = pyramid.iter().map(Array2::dim).collect();
        assert_eq!(dims, vec![(128, 100), (64, 50), (32, 25)]);
    }

    #[test]
    fn pyramid_stops_at_minimum_size() {
        let data = Array2::<f32>::zeros((40, 40));
        assert_eq!(build_pyramid(&data.view(), 5).len(), 2);
    }
}
