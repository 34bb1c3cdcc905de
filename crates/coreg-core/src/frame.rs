use std::collections::BTreeMap;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{CoregError, Result};

/// How a layer is interpolated during resampling.
///
/// Categorical layers (labels, masks) are always resampled with
/// nearest-neighbour so that no new label values can appear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    #[default]
    Continuous,
    Categorical,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// A single raster layer: one or more channels on a common pixel grid.
///
/// Pixel data is stored as `(channel, row, col)`. Categorical layers store
/// their integral labels in the same element type.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub data: Array3<f32>,
}

impl Layer {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Wrap a single-channel raster.
    pub fn from_array2(data: Array2<f32>) -> Self {
        Self {
            data: data.insert_axis(Axis(0)),
        }
    }

    pub fn channels(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Spatial dimensions as `(height, width)`.
    pub fn dim(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// View of one channel. Panics if `channel >= self.channels()`.
    pub fn channel(&self, channel: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), channel)
    }
}

/// One time step: a set of named, co-located layers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub layers: BTreeMap<String, Layer>,
    /// Acquisition time in microseconds since the epoch, if known.
    pub timestamp_us: Option<u64>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, name: impl Into<String>, layer: Layer) -> Self {
        self.layers.insert(name.into(), layer);
        self
    }

    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = Some(timestamp_us);
        self
    }

    pub fn layer(&self, name: &str) -> Result<&Layer> {
        self.layers
            .get(name)
            .ok_or_else(|| CoregError::UnknownLayer(name.to_string()))
    }

    /// Spatial dimensions of the frame, taken from its first layer.
    pub fn dim(&self) -> Option<(usize, usize)> {
        self.layers.values().next().map(Layer::dim)
    }

    /// Check that every layer shares the same spatial dimensions.
    fn validate(&self, index: usize) -> Result<(usize, usize)> {
        let dim = self.dim().ok_or(CoregError::EmptyFrame { index })?;
        if dim.0 == 0 || dim.1 == 0 {
            return Err(CoregError::InvalidDimensions {
                width: dim.1,
                height: dim.0,
            });
        }
        for (name, layer) in &self.layers {
            if layer.dim() != dim {
                return Err(CoregError::ShapeMismatch {
                    context: format!("frame {index}, layer '{name}'"),
                    expected: dim,
                    actual: layer.dim(),
                });
            }
        }
        Ok(dim)
    }
}

/// Nominal ground footprint of the stack, in the caller's coordinate system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackMetadata {
    pub bounds: Option<GroundBounds>,
}

/// Ordered, non-empty time series of structurally identical frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Stack {
    frames: Vec<Frame>,
    pub metadata: StackMetadata,
}

impl Stack {
    /// Build a stack, enforcing that it is non-empty and that every frame
    /// has the same layer set, per-layer channel count and dimensions.
    pub fn new(frames: Vec<Frame>) -> Result<Self> {
        Self::with_metadata(frames, StackMetadata::default())
    }

    pub fn with_metadata(frames: Vec<Frame>, metadata: StackMetadata) -> Result<Self> {
        let first = frames.first().ok_or(CoregError::EmptyStack)?;
        let dim = first.validate(0)?;

        for (index, frame) in frames.iter().enumerate().skip(1) {
            let frame_dim = frame.validate(index)?;
            if frame_dim != dim {
                return Err(CoregError::ShapeMismatch {
                    context: format!("frame {index}"),
                    expected: dim,
                    actual: frame_dim,
                });
            }
            if frame.layers.len() != first.layers.len() {
                return Err(CoregError::LayerSetMismatch { index });
            }
            for (name, layer) in &first.layers {
                let other = frame
                    .layers
                    .get(name)
                    .ok_or(CoregError::LayerSetMismatch { index })?;
                if other.channels() != layer.channels() {
                    return Err(CoregError::LayerSetMismatch { index });
                }
            }
        }

        Ok(Self { frames, metadata })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; a stack cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Spatial dimensions shared by every layer of every frame.
    pub fn dim(&self) -> (usize, usize) {
        self.frames[0].dim().unwrap_or((0, 0))
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.frames[0].layers.keys().map(String::as_str)
    }

    pub fn timestamps(&self) -> Vec<Option<u64>> {
        self.frames.iter().map(|f| f.timestamp_us).collect()
    }
}
