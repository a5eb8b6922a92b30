//! File-backed description of an adaptation module.
//!
//! Distillation pipelines declare their regressors next to the rest of the
//! experiment configuration:
//!
//! ```toml
//! type = "ConvReg"
//! args = [16, 32, 3, 1, 1]
//!
//! [params]
//! uses_relu = false
//! ```
//!
//! `args` become positional arguments and `params` keyword arguments.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{args::ModuleArgs, error::AdaptationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdaptationModuleConfig {
    /// Registered module name.
    #[serde(rename = "type")]
    pub module_type: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl AdaptationModuleConfig {
    /// Loads a config, picking the format from the file extension.
    ///
    /// `.json` is parsed as JSON; `.toml`, `.tml` or no extension as TOML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AdaptationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            Some("toml") | Some("tml") | None => Self::from_toml_str(&contents),
            Some(other) => Err(AdaptationError::ConfigFormat(format!(
                "unsupported configuration extension '{}'",
                other
            ))),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, AdaptationError> {
        Ok(toml::from_str(contents)?)
    }

    /// Arguments forwarded to the module constructor.
    pub fn module_args(&self) -> ModuleArgs {
        ModuleArgs::from_parts(self.args.clone(), self.params.clone())
    }
}
