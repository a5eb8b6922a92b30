//! Batch normalisation over the channel axis of NCHW feature maps.
//!
//! Statistics are computed per channel across `(batch, height, width)`. In
//! training mode the batch statistics normalise the input and are folded into
//! the running mean / variance with `momentum`; in evaluation mode the running
//! statistics are used directly. Running statistics live in the `VarBuilder`
//! under `running_mean` / `running_var`, next to the affine `weight` / `bias`.

use candle_core::{Error, Result, Tensor};
use candle_nn::{ModuleT, VarBuilder};

use crate::checks;

/// Configuration for [`BatchNorm2d`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchNormConfig {
    /// Number of channels being normalised.
    pub num_features: usize,
    /// Numeric stabiliser added to the variance.
    pub epsilon: f64,
    /// Weight given to the current batch when updating running statistics.
    pub momentum: f64,
    /// Whether a learnable per-channel scale and shift are applied.
    pub affine: bool,
}

impl BatchNormConfig {
    /// Creates a configuration with the customary defaults (eps 1e-5, momentum 0.1).
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            epsilon: 1e-5,
            momentum: 0.1,
            affine: true,
        }
    }
}

/// 2D batch normalisation backed by `candle_nn::BatchNorm`.
#[derive(Debug, Clone)]
pub struct BatchNorm2d {
    config: BatchNormConfig,
    inner: candle_nn::BatchNorm,
}

impl BatchNorm2d {
    pub fn new(config: BatchNormConfig, vb: VarBuilder) -> Result<Self> {
        if config.num_features == 0 {
            return Err(Error::Msg("batch norm requires at least one feature".into()));
        }
        if !(0.0..=1.0).contains(&config.momentum) {
            return Err(Error::Msg(format!(
                "batch norm momentum must be in [0, 1], got {}",
                config.momentum
            )));
        }
        let inner = candle_nn::batch_norm(
            config.num_features,
            candle_nn::BatchNormConfig {
                eps: config.epsilon,
                remove_mean: true,
                affine: config.affine,
                momentum: config.momentum,
            },
            vb,
        )?;
        Ok(Self { config, inner })
    }

    pub fn config(&self) -> &BatchNormConfig {
        &self.config
    }

    pub fn running_mean(&self) -> &Tensor {
        self.inner.running_mean()
    }

    pub fn running_var(&self) -> &Tensor {
        self.inner.running_var()
    }
}

impl ModuleT for BatchNorm2d {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        checks::expect_channels("bn.input", xs, self.config.num_features)?;
        self.inner.forward_t(xs, train)
    }
}
