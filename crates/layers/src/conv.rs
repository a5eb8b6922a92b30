//! 2D convolution over `(batch, channels, height, width)` feature maps.
//!
//! Kernel size, stride and padding accept either a single integer applied to
//! both spatial axes or a `[height, width]` pair. Each spatial axis follows the
//! usual output-size arithmetic
//! `out = floor((in + 2 * padding - kernel) / stride) + 1`.
//!
//! Candle's `conv2d` kernel takes one padding and one stride for both axes.
//! When the two axes disagree the input is zero-padded per axis, convolved
//! densely and then subsampled along each axis, which yields the same values.

use candle_core::{Error, Result, Tensor};
use candle_nn::{Init, Module, VarBuilder};
use serde::{Deserialize, Serialize};

use crate::checks;

/// Integer-or-pair spatial hyperparameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Size2d {
    /// Same value for height and width.
    Square(usize),
    /// Explicit `[height, width]` values.
    Rect([usize; 2]),
}

impl Size2d {
    /// Returns the `(height, width)` pair.
    pub fn pair(self) -> (usize, usize) {
        match self {
            Size2d::Square(v) => (v, v),
            Size2d::Rect([h, w]) => (h, w),
        }
    }

    fn is_square(self) -> bool {
        let (h, w) = self.pair();
        h == w
    }
}

impl From<usize> for Size2d {
    fn from(value: usize) -> Self {
        Size2d::Square(value)
    }
}

impl From<(usize, usize)> for Size2d {
    fn from((h, w): (usize, usize)) -> Self {
        Size2d::Rect([h, w])
    }
}

impl From<[usize; 2]> for Size2d {
    fn from(value: [usize; 2]) -> Self {
        Size2d::Rect(value)
    }
}

/// Output length of one spatial axis.
pub fn output_extent(input: usize, kernel: usize, stride: usize, padding: usize) -> Result<usize> {
    if stride == 0 {
        return Err(Error::Msg("conv stride must be greater than zero".into()));
    }
    let padded = input + 2 * padding;
    if padded < kernel {
        return Err(Error::Msg(format!(
            "conv kernel {kernel} exceeds padded input extent {padded}"
        )));
    }
    Ok((padded - kernel) / stride + 1)
}

/// Configuration for [`Conv2d`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conv2dConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: Size2d,
    pub stride: Size2d,
    pub padding: Size2d,
    /// Whether a learnable per-channel bias is added.
    pub bias: bool,
}

impl Conv2dConfig {
    /// Creates a biased convolution with unit stride and no padding.
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: impl Into<Size2d>) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size: kernel_size.into(),
            stride: Size2d::Square(1),
            padding: Size2d::Square(0),
            bias: true,
        }
    }

    pub fn with_stride(mut self, stride: impl Into<Size2d>) -> Self {
        self.stride = stride.into();
        self
    }

    pub fn with_padding(mut self, padding: impl Into<Size2d>) -> Self {
        self.padding = padding.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.in_channels == 0 || self.out_channels == 0 {
            return Err(Error::Msg(format!(
                "conv channels must be positive, got in={} out={}",
                self.in_channels, self.out_channels
            )));
        }
        let (kh, kw) = self.kernel_size.pair();
        if kh == 0 || kw == 0 {
            return Err(Error::Msg("conv kernel size must be positive".into()));
        }
        let (sh, sw) = self.stride.pair();
        if sh == 0 || sw == 0 {
            return Err(Error::Msg("conv stride must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Convolution layer holding a `(out, in, kh, kw)` weight and optional bias.
#[derive(Debug, Clone)]
pub struct Conv2d {
    config: Conv2dConfig,
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Conv2d {
    /// Initialises parameters under `weight` / `bias` in `vb`.
    ///
    /// Initialisation mirrors `candle_nn::conv2d`: Kaiming-normal weights and a
    /// bias drawn uniformly from `±1/sqrt(fan_in)`.
    pub fn new(config: Conv2dConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let (kh, kw) = config.kernel_size.pair();
        let weight = vb.get_with_hints(
            (config.out_channels, config.in_channels, kh, kw),
            "weight",
            candle_nn::init::DEFAULT_KAIMING_NORMAL,
        )?;
        let bias = if config.bias {
            let fan_in = (config.in_channels * kh * kw) as f64;
            let bound = 1.0 / fan_in.sqrt();
            Some(vb.get_with_hints(
                config.out_channels,
                "bias",
                Init::Uniform {
                    lo: -bound,
                    up: bound,
                },
            )?)
        } else {
            None
        };
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    /// Wraps existing parameter tensors after checking their shapes.
    pub fn from_parts(config: Conv2dConfig, weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        config.validate()?;
        let (kh, kw) = config.kernel_size.pair();
        checks::expect_shape(
            "conv.weight",
            &weight,
            &[config.out_channels, config.in_channels, kh, kw],
        )?;
        match (&bias, config.bias) {
            (Some(bias), true) => checks::expect_shape("conv.bias", bias, &[config.out_channels])?,
            (None, false) => {}
            (Some(_), false) => {
                return Err(Error::Msg(
                    "conv configured without bias but a bias tensor was supplied".into(),
                ))
            }
            (None, true) => {
                return Err(Error::Msg(
                    "conv configured with bias but no bias tensor was supplied".into(),
                ))
            }
        }
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    pub fn config(&self) -> &Conv2dConfig {
        &self.config
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// Spatial output size for an input of `height x width`.
    pub fn output_hw(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        let (kh, kw) = self.config.kernel_size.pair();
        let (sh, sw) = self.config.stride.pair();
        let (ph, pw) = self.config.padding.pair();
        Ok((
            output_extent(height, kh, sh, ph)?,
            output_extent(width, kw, sw, pw)?,
        ))
    }
}

impl Module for Conv2d {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        checks::expect_channels("conv.input", xs, self.config.in_channels)?;
        let (_, _, height, width) = xs.dims4()?;
        let (out_h, out_w) = self.output_hw(height, width)?;

        let (ph, pw) = self.config.padding.pair();
        let (sh, sw) = self.config.stride.pair();
        let output = if self.config.padding.is_square() && self.config.stride.is_square() {
            xs.conv2d(&self.weight, ph, sh, 1, 1)?
        } else {
            let padded = xs.pad_with_zeros(2, ph, ph)?.pad_with_zeros(3, pw, pw)?;
            let dense = padded.conv2d(&self.weight, 0, 1, 1, 1)?;
            let rows = subsample(&dense, 2, sh, out_h)?;
            subsample(&rows, 3, sw, out_w)?
        };

        match &self.bias {
            Some(bias) => {
                let bias = bias.reshape((1, self.config.out_channels, 1, 1))?;
                output.broadcast_add(&bias)
            }
            None => Ok(output),
        }
    }
}

/// Keeps every `stride`-th entry along `dim`, `len` entries in total.
fn subsample(tensor: &Tensor, dim: usize, stride: usize, len: usize) -> Result<Tensor> {
    if stride == 1 {
        return tensor.narrow(dim, 0, len);
    }
    let indices = (0..len).map(|i| (i * stride) as u32).collect::<Vec<_>>();
    let indices = Tensor::from_vec(indices, len, tensor.device())?;
    tensor.index_select(&indices, dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn build_input(device: &Device, dims: (usize, usize, usize, usize)) -> Result<Tensor> {
        let total = dims.0 * dims.1 * dims.2 * dims.3;
        let data = (0..total)
            .map(|i| ((i % 17) as f32 * 0.125_f32) - 1.0_f32)
            .collect::<Vec<_>>();
        Tensor::from_vec(data, dims, device)
    }

    fn max_diff(a: &Tensor, b: &Tensor) -> Result<f32> {
        a.sub(b)?.abs()?.flatten_all()?.max(0)?.to_vec0::<f32>()
    }

    /// Direct nested-loop convolution used as ground truth.
    fn naive_conv(
        input: &Tensor,
        weight: &Tensor,
        bias: &Tensor,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Tensor> {
        let (batch, in_c, h, w) = input.dims4()?;
        let (out_c, _, kh, kw) = weight.dims4()?;
        let out_h = output_extent(h, kh, stride.0, padding.0)?;
        let out_w = output_extent(w, kw, stride.1, padding.1)?;
        let x = input.flatten_all()?.to_vec1::<f32>()?;
        let k = weight.flatten_all()?.to_vec1::<f32>()?;
        let b = bias.to_vec1::<f32>()?;

        let mut out = vec![0f32; batch * out_c * out_h * out_w];
        for n in 0..batch {
            for oc in 0..out_c {
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let mut sum = b[oc];
                        for ic in 0..in_c {
                            for ky in 0..kh {
                                for kx in 0..kw {
                                    let iy = (oy * stride.0 + ky) as isize - padding.0 as isize;
                                    let ix = (ox * stride.1 + kx) as isize - padding.1 as isize;
                                    if iy < 0 || ix < 0 || iy >= h as isize || ix >= w as isize {
                                        continue;
                                    }
                                    let xi = ((n * in_c + ic) * h + iy as usize) * w + ix as usize;
                                    let ki = ((oc * in_c + ic) * kh + ky) * kw + kx;
                                    sum += x[xi] * k[ki];
                                }
                            }
                        }
                        out[((n * out_c + oc) * out_h + oy) * out_w + ox] = sum;
                    }
                }
            }
        }
        Tensor::from_vec(out, (batch, out_c, out_h, out_w), input.device())
    }

    #[test]
    fn output_extent_follows_conv_arithmetic() -> Result<()> {
        assert_eq!(output_extent(8, 3, 1, 1)?, 8);
        assert_eq!(output_extent(8, 3, 2, 1)?, 4);
        assert_eq!(output_extent(7, 3, 2, 0)?, 3);
        assert_eq!(output_extent(32, 1, 1, 0)?, 32);
        assert!(output_extent(2, 5, 1, 0).is_err());
        assert!(output_extent(8, 3, 0, 1).is_err());
        Ok(())
    }

    #[test]
    fn size2d_deserialises_integer_or_pair() {
        let square: Size2d = serde_json::from_str("3").unwrap();
        let rect: Size2d = serde_json::from_str("[3, 1]").unwrap();
        assert_eq!(square.pair(), (3, 3));
        assert_eq!(rect.pair(), (3, 1));
        assert!(serde_json::from_str::<Size2d>("true").is_err());
    }

    #[test]
    fn square_conv_matches_candle_nn_reference() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = Conv2dConfig::new(3, 5, 3).with_stride(2).with_padding(1);
        let conv = Conv2d::new(config, vb)?;

        let reference = candle_nn::Conv2d::new(
            conv.weight().clone(),
            conv.bias().cloned(),
            candle_nn::Conv2dConfig {
                padding: 1,
                stride: 2,
                ..Default::default()
            },
        );

        let input = build_input(&device, (2, 3, 9, 9))?;
        let output = conv.forward(&input)?;
        let expected = reference.forward(&input)?;
        assert_eq!(output.dims(), &[2, 5, 5, 5]);
        assert!(max_diff(&output, &expected)? < 1e-5);
        Ok(())
    }

    #[test]
    fn per_axis_stride_and_padding_match_naive_conv() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = Conv2dConfig::new(2, 4, (3, 2))
            .with_stride((2, 1))
            .with_padding((1, 0));
        let conv = Conv2d::new(config, vb)?;

        let input = build_input(&device, (1, 2, 7, 6))?;
        let output = conv.forward(&input)?;
        let bias = conv.bias().cloned().ok_or_else(|| Error::Msg("bias".into()))?;
        let expected = naive_conv(&input, conv.weight(), &bias, (2, 1), (1, 0))?;

        assert_eq!(output.dims(), &[1, 4, 4, 5]);
        assert!(max_diff(&output, &expected)? < 1e-4);
        Ok(())
    }

    #[test]
    fn parameters_are_registered_with_expected_names() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        Conv2d::new(Conv2dConfig::new(4, 8, 1), vb.pp("conv"))?;

        let data = varmap.data().lock().unwrap();
        assert_eq!(data["conv.weight"].as_tensor().dims(), &[8, 4, 1, 1]);
        assert_eq!(data["conv.bias"].as_tensor().dims(), &[8]);
        Ok(())
    }

    #[test]
    fn from_parts_rejects_mismatched_weight() -> Result<()> {
        let device = Device::Cpu;
        let weight = Tensor::zeros((8, 4, 3, 3), DType::F32, &device)?;
        let bias = Tensor::zeros(8, DType::F32, &device)?;
        let config = Conv2dConfig::new(4, 8, 1);
        assert!(Conv2d::from_parts(config.clone(), weight, Some(bias.clone())).is_err());

        let weight = Tensor::zeros((8, 4, 1, 1), DType::F32, &device)?;
        assert!(Conv2d::from_parts(config.clone(), weight.clone(), None).is_err());
        assert!(Conv2d::from_parts(config, weight, Some(bias)).is_ok());
        Ok(())
    }

    #[test]
    fn wrong_input_channels_are_rejected() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let conv = Conv2d::new(Conv2dConfig::new(3, 2, 1), vb)?;
        let input = Tensor::zeros((1, 4, 2, 2), DType::F32, &device)?;
        assert!(conv.forward(&input).is_err());
        Ok(())
    }
}
