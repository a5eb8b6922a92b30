//! Building blocks for feature-map adaptation stacks.
//!
//! Every layer here consumes image-like tensors laid out as
//! `(batch, channels, height, width)` and is assembled from Candle primitives.
//! Parameters are pulled from a [`candle_nn::VarBuilder`], so the same layers
//! can be freshly initialised from a `VarMap` or loaded from a checkpoint.

pub mod activations;
pub mod checks;
pub mod conv;
pub mod norm;
pub mod sequential;

pub use activations::Relu;
pub use conv::{Conv2d, Conv2dConfig, Size2d};
pub use norm::{BatchNorm2d, BatchNormConfig};
pub use sequential::{Sequential, Stage, StageKind};
