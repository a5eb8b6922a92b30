//! Lightweight validation helpers shared across layer components.
//!
//! These routines provide concise shape assertions that can be wired into
//! constructors or forward paths. They return `candle_core::Result` so call
//! sites can propagate errors without panicking.

use candle_core::{Error, Result, Tensor};

/// Ensures a tensor matches the expected dimensions exactly.
pub fn expect_shape(label: &str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    let actual = tensor.dims();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{label}: expected shape {:?}, got {:?}",
            expected, actual
        )))
    }
}

/// Validates the `(batch, channels, height, width)` layout and returns the dims.
pub fn expect_nchw(label: &str, tensor: &Tensor) -> Result<(usize, usize, usize, usize)> {
    match tensor.dims() {
        &[batch, channels, height, width] => Ok((batch, channels, height, width)),
        other => Err(Error::Msg(format!(
            "{label}: expected (batch, channels, height, width) layout, got {:?}",
            other
        ))),
    }
}

/// Validates an NCHW tensor carrying exactly `channels` feature planes.
pub fn expect_channels(label: &str, tensor: &Tensor, channels: usize) -> Result<()> {
    let (_, actual, _, _) = expect_nchw(label, tensor)?;
    if actual == channels {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{label}: expected {channels} channels, got {actual}"
        )))
    }
}
