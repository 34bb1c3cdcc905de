//! Geometric resampling of rasters through a [`TransformModel`].
//!
//! Output pixel `(row, col)` is sampled from the source at
//! `transform⁻¹(col, row)`. Positions outside the source footprint
//! `[-0.5, w - 0.5) x [-0.5, h - 0.5)` take the border value.

mod kernel;

use std::fmt;

use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::Result;
use crate::frame::{Layer, LayerKind};
use crate::transform::TransformModel;

/// Interpolation kernel used for continuous layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    Cubic,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => write!(f, "Nearest"),
            Self::Linear => write!(f, "Bilinear"),
            Self::Cubic => write!(f, "Bicubic"),
        }
    }
}

/// What to produce where the inverse-mapped position leaves the source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Border {
    Constant(f32),
    /// Clamp to the nearest edge pixel.
    Replicate,
}

impl Default for Border {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

#[inline]
pub(crate) fn in_footprint(x: f64, y: f64, height: usize, width: usize) -> bool {
    x.is_finite()
        && y.is_finite()
        && x >= -0.5
        && y >= -0.5
        && x < width as f64 - 0.5
        && y < height as f64 - 0.5
}

#[inline]
fn sample_kernel(data: &ArrayView2<'_, f32>, x: f64, y: f64, interpolation: Interpolation) -> f32 {
    match interpolation {
        Interpolation::Nearest => kernel::nearest(data, x, y),
        Interpolation::Linear => kernel::bilinear(data, x, y),
        Interpolation::Cubic => kernel::bicubic(data, x, y),
    }
}

/// Sample `data` at `(x, y)`, or `None` outside the raster footprint.
#[inline]
pub fn sample_at(
    data: &ArrayView2<'_, f32>,
    x: f64,
    y: f64,
    interpolation: Interpolation,
) -> Option<f32> {
    let (h, w) = data.dim();
    in_footprint(x, y, h, w).then(|| sample_kernel(data, x, y, interpolation))
}

#[inline]
fn sample_with_border(
    data: &ArrayView2<'_, f32>,
    x: f64,
    y: f64,
    interpolation: Interpolation,
    border: Border,
) -> f32 {
    if let Some(v) = sample_at(data, x, y, interpolation) {
        return v;
    }
    match border {
        Border::Constant(fill) => fill,
        Border::Replicate if x.is_finite() && y.is_finite() => {
            let (h, w) = data.dim();
            let cx = x.clamp(0.0, (w - 1) as f64);
            let cy = y.clamp(0.0, (h - 1) as f64);
            sample_kernel(data, cx, cy, interpolation)
        }
        Border::Replicate => 0.0,
    }
}

/// Resample `source` onto an `output_shape` grid through `transform`.
///
/// Fails only when `transform` cannot be inverted.
pub fn resample(
    source: ArrayView2<'_, f32>,
    transform: &TransformModel,
    interpolation: Interpolation,
    output_shape: (usize, usize),
    border: Border,
) -> Result<Array2<f32>> {
    let inverse = transform.invert()?;
    Ok(warp_inverse(&source, &inverse, interpolation, output_shape, border))
}

/// Resample with an already-inverted transform (output → source mapping).
pub(crate) fn warp_inverse(
    source: &ArrayView2<'_, f32>,
    inverse: &TransformModel,
    interpolation: Interpolation,
    output_shape: (usize, usize),
    border: Border,
) -> Array2<f32> {
    let (h, w) = output_shape;
    if source.is_empty() {
        let fill = match border {
            Border::Constant(v) => v,
            Border::Replicate => 0.0,
        };
        return Array2::from_elem((h, w), fill);
    }

    let mut result = Array2::<f32>::zeros((h, w));
    let sample = |(row, col): (usize, usize), out: &mut f32| {
        let (sx, sy) = inverse.apply(col as f64, row as f64);
        *out = sample_with_border(source, sx, sy, interpolation, border);
    };
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut result).par_for_each(sample);
    } else {
        Zip::indexed(&mut result).for_each(sample);
    }
    result
}

/// Fill and interpolation settings applied to one layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerPolicy {
    pub kind: LayerKind,
    pub interpolation: Interpolation,
    pub border: Border,
    /// Label written where a categorical layer maps out of bounds.
    pub no_data: f32,
}

impl LayerPolicy {
    /// Interpolation and border actually used for this layer. Categorical
    /// layers are forced to nearest-neighbour with the no-data fill.
    pub fn effective(&self) -> (Interpolation, Border) {
        match self.kind {
            LayerKind::Continuous => (self.interpolation, self.border),
            LayerKind::Categorical => {
                let border = match self.border {
                    Border::Replicate => Border::Replicate,
                    Border::Constant(_) => Border::Constant(self.no_data),
                };
                (Interpolation::Nearest, border)
            }
        }
    }
}

/// Resample every channel of a layer onto its own grid.
pub fn resample_layer(
    layer: &Layer,
    transform: &TransformModel,
    policy: &LayerPolicy,
) -> Result<Layer> {
    let inverse = transform.invert()?;
    Ok(warp_layer_inverse(layer, &inverse, policy))
}

pub(crate) fn warp_layer_inverse(
    layer: &Layer,
    inverse: &TransformModel,
    policy: &LayerPolicy,
) -> Layer {
    let (interpolation, border) = policy.effective();
    let (h, w) = layer.dim();
    let mut data = Array3::<f32>::zeros((layer.channels(), h, w));
    for (ch, mut out) in data.axis_iter_mut(Axis(0)).enumerate() {
        let warped = warp_inverse(&layer.channel(ch), inverse, interpolation, (h, w), border);
        out.assign(&warped);
    }
    Layer::new(data)
}

/// Shorthand for a translation-only resample with bilinear interpolation
/// and zero fill, mainly used to build synthetic inputs.
pub fn shift_array(data: &Array2<f32>, dx: f64, dy: f64) -> Array2<f32> {
    let inverse = TransformModel::translation(-dx, -dy);
    warp_inverse(
        &data.view(),
        &inverse,
        Interpolation::Linear,
        data.dim(),
        Border::Constant(0.0),
    )
}
