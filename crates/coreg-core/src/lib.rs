//! Temporal raster stack co-registration.
//!
//! A [`Stack`](frame::Stack) of same-shape multi-layer frames is aligned
//! onto a reference frame: a registration method estimates one planar
//! transform per frame, implausible or failed estimates fall back to the
//! identity, and every layer is resampled onto the reference grid with a
//! kernel chosen by its [`LayerKind`](frame::LayerKind).

pub mod align;
pub mod config;
pub mod consts;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod registration;
pub mod resample;
pub mod transform;
