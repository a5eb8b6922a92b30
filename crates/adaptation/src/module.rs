//! Interfaces shared by every adaptation module.

use std::{any::Any, fmt};

use candle_core::Tensor;
use candle_nn::{ModuleT, VarBuilder};
use layers::StageKind;

use crate::{args::ModuleArgs, error::AdaptationError};

/// A trainable block that maps one feature map onto the shape of another.
///
/// `forward_t(xs, true)` runs in training mode (batch statistics, running
/// statistics updated); [`AdaptationModule::forward`] runs in evaluation mode.
pub trait AdaptationModule: ModuleT + Send + Sync + fmt::Debug {
    /// Name the module type is registered under.
    fn name(&self) -> &'static str;

    /// Names of the sub-stages, in the order they are applied.
    fn stage_names(&self) -> Vec<&str>;

    /// Kinds of the sub-stages, in the order they are applied.
    fn stage_kinds(&self) -> Vec<StageKind>;

    /// Enables downcasting to the concrete module type.
    fn as_any(&self) -> &dyn Any;

    /// Evaluation-mode forward pass.
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.forward_t(xs, false)
    }
}

/// A module type that can be created by name through the registry.
pub trait RegisteredModule: AdaptationModule + Sized + 'static {
    /// Name the type registers itself under.
    const NAME: &'static str;

    /// Builds the module from factory arguments, creating parameters in `vb`.
    fn from_args(args: &ModuleArgs, vb: VarBuilder) -> Result<Self, AdaptationError>;
}

/// Type-erased constructor stored in the registry.
pub type ModuleConstructor =
    fn(&ModuleArgs, VarBuilder) -> Result<Box<dyn AdaptationModule>, AdaptationError>;

fn construct<M: RegisteredModule>(
    args: &ModuleArgs,
    vb: VarBuilder,
) -> Result<Box<dyn AdaptationModule>, AdaptationError> {
    Ok(Box::new(M::from_args(args, vb)?))
}

/// Returns the registry constructor for `M`.
pub fn constructor_for<M: RegisteredModule>() -> ModuleConstructor {
    construct::<M>
}
