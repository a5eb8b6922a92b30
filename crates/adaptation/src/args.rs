//! Constructor arguments forwarded from the factory to a module.
//!
//! [`ModuleArgs`] carries positional and keyword values untouched. A module
//! binds them to its declared parameter list: positionals fill parameters in
//! declaration order, keywords fill parameters by name. The bound map is then
//! deserialised into the module's typed configuration, which is where missing
//! parameters and ill-typed values are caught.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AdaptationError;

/// Positional and keyword constructor arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleArgs {
    positional: Vec<Value>,
    keyword: Map<String, Value>,
}

impl ModuleArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(positional: Vec<Value>, keyword: Map<String, Value>) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    /// Builds arguments from positional values only.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keyword: Map::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument, replacing any previous value for `name`.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn positional_values(&self) -> &[Value] {
        &self.positional
    }

    pub fn keyword_values(&self) -> &Map<String, Value> {
        &self.keyword
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Binds the arguments to `params`, returning a name → value map.
    pub fn bind(&self, module: &str, params: &[&str]) -> Result<Map<String, Value>, AdaptationError> {
        if self.positional.len() > params.len() {
            return Err(AdaptationError::invalid_arguments(
                module,
                format!(
                    "takes at most {} positional arguments but {} were given",
                    params.len(),
                    self.positional.len()
                ),
            ));
        }

        let mut bound = Map::new();
        for (name, value) in params.iter().zip(&self.positional) {
            bound.insert((*name).to_string(), value.clone());
        }

        for (name, value) in &self.keyword {
            if !params.contains(&name.as_str()) {
                return Err(AdaptationError::invalid_arguments(
                    module,
                    format!("unexpected keyword argument `{name}`"),
                ));
            }
            if bound.contains_key(name) {
                return Err(AdaptationError::invalid_arguments(
                    module,
                    format!("got multiple values for argument `{name}`"),
                ));
            }
            bound.insert(name.clone(), value.clone());
        }

        Ok(bound)
    }

    /// Binds the arguments to `params` and deserialises them into `T`.
    pub fn parse<T: DeserializeOwned>(
        &self,
        module: &str,
        params: &[&str],
    ) -> Result<T, AdaptationError> {
        let bound = self.bind(module, params)?;
        serde_json::from_value(Value::Object(bound))
            .map_err(|err| AdaptationError::invalid_arguments(module, err.to_string()))
    }
}
