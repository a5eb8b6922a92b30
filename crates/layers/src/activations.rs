//! Element-wise activation stages.
//!
//! Activations keep the input layout untouched and only rewrite values, so they
//! can sit after any convolution or normalisation stage.

use candle_core::{Result, Tensor};
use candle_nn::Module;

/// Rectified linear unit, `max(x, 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relu;

impl Relu {
    pub fn new() -> Self {
        Self
    }

    /// Indicates if the activation can safely overwrite its input.
    ///
    /// Candle tensors are immutable so the flag is informational; it records
    /// that the stage has no backward dependency on its input values.
    pub fn allows_inplace(&self) -> bool {
        true
    }
}

impl Module for Relu {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        xs.relu()
    }
}
