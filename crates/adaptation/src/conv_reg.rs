//! Convolutional regressor for FitNets-style hint learning.
//!
//! Follows the `ConvReg` block of "Contrastive Representation Distillation"
//! (CRD): a convolution maps the student feature map onto the teacher's channel
//! count and spatial size, batch normalisation follows, then an optional ReLU.
//! Kernel, stride and padding are free parameters rather than being derived
//! from the two shapes, so callers can target larger input resolutions.
//!
//! Parameters are created under `conv.*` and `bn.*`, matching the state-dict
//! layout of the PyTorch module so pretrained regressors load unchanged.

use std::any::Any;

use candle_core::{Result, Tensor};
use candle_nn::{ModuleT, VarBuilder};
use layers::{BatchNorm2d, BatchNormConfig, Conv2d, Conv2dConfig, Relu, Sequential, Size2d, StageKind};
use serde::{Deserialize, Serialize};

use crate::{
    args::ModuleArgs,
    error::AdaptationError,
    module::{AdaptationModule, RegisteredModule},
};

/// Constructor parameters of [`ConvReg`], in positional order.
pub const CONV_REG_PARAMS: &[&str] = &[
    "num_input_channels",
    "num_output_channels",
    "kernel_size",
    "stride",
    "padding",
    "uses_relu",
];

fn default_uses_relu() -> bool {
    true
}

/// Configuration for [`ConvReg`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvRegConfig {
    pub num_input_channels: usize,
    pub num_output_channels: usize,
    pub kernel_size: Size2d,
    pub stride: Size2d,
    pub padding: Size2d,
    #[serde(default = "default_uses_relu")]
    pub uses_relu: bool,
}

impl ConvRegConfig {
    /// Creates a configuration that ends with a ReLU.
    pub fn new(
        num_input_channels: usize,
        num_output_channels: usize,
        kernel_size: impl Into<Size2d>,
        stride: impl Into<Size2d>,
        padding: impl Into<Size2d>,
    ) -> Self {
        Self {
            num_input_channels,
            num_output_channels,
            kernel_size: kernel_size.into(),
            stride: stride.into(),
            padding: padding.into(),
            uses_relu: true,
        }
    }

    pub fn with_relu(mut self, uses_relu: bool) -> Self {
        self.uses_relu = uses_relu;
        self
    }
}

/// Convolution → batch norm → optional ReLU.
#[derive(Debug)]
pub struct ConvReg {
    config: ConvRegConfig,
    stages: Sequential,
}

impl ConvReg {
    pub fn new(config: ConvRegConfig, vb: VarBuilder) -> Result<Self> {
        let conv_config = Conv2dConfig::new(
            config.num_input_channels,
            config.num_output_channels,
            config.kernel_size,
        )
        .with_stride(config.stride)
        .with_padding(config.padding);

        let mut stages = Sequential::new();
        stages.push("conv", Conv2d::new(conv_config, vb.pp("conv"))?)?;
        stages.push(
            "bn",
            BatchNorm2d::new(BatchNormConfig::new(config.num_output_channels), vb.pp("bn"))?,
        )?;
        if config.uses_relu {
            stages.push("relu", Relu::new())?;
        }

        Ok(Self { config, stages })
    }

    pub fn config(&self) -> &ConvRegConfig {
        &self.config
    }

    pub fn stages(&self) -> &Sequential {
        &self.stages
    }
}

impl ModuleT for ConvReg {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        self.stages.forward_t(xs, train)
    }
}

impl AdaptationModule for ConvReg {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stage_names(&self) -> Vec<&str> {
        self.stages.names()
    }

    fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.kinds()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredModule for ConvReg {
    const NAME: &'static str = "ConvReg";

    fn from_args(args: &ModuleArgs, vb: VarBuilder) -> std::result::Result<Self, AdaptationError> {
        let config: ConvRegConfig = args.parse(Self::NAME, CONV_REG_PARAMS)?;
        Ok(Self::new(config, vb)?)
    }
}
