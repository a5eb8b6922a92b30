//! Adaptation modules for knowledge distillation.
//!
//! An adaptation module is a small trainable block that reshapes a student
//! feature map so it can be compared against a teacher feature map. Modules
//! are looked up by name in an [`AdaptationRegistry`] and built from
//! positional / keyword [`ModuleArgs`], with their parameters created in a
//! caller-supplied [`candle_nn::VarBuilder`].
//!
//! ```no_run
//! use adaptation::{AdaptationModule, AdaptationRegistry, ModuleArgs};
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = AdaptationRegistry::with_builtin_modules();
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//!
//! let args = ModuleArgs::positional([16, 32, 3, 1, 1]);
//! if let Some(regressor) = registry.get_adaptation_module("ConvReg", &args, vb)? {
//!     let student = Tensor::zeros((2, 16, 8, 8), DType::F32, &Device::Cpu)?;
//!     let aligned = regressor.forward(&student)?;
//!     assert_eq!(aligned.dims(), &[2, 32, 8, 8]);
//! }
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod config;
pub mod conv_reg;
pub mod error;
pub mod module;
pub mod registry;

pub use args::ModuleArgs;
pub use config::AdaptationModuleConfig;
pub use conv_reg::{ConvReg, ConvRegConfig, CONV_REG_PARAMS};
pub use error::AdaptationError;
pub use module::{constructor_for, AdaptationModule, ModuleConstructor, RegisteredModule};
pub use registry::{
    missing_module_message, AdaptationRegistry, AdaptationRegistryBuilder, DiagnosticSink,
};
