use thiserror::Error;

/// Errors raised while constructing adaptation modules or loading their configs.
///
/// A lookup for an unregistered name is not an error; see
/// [`AdaptationRegistry::get_adaptation_module`](crate::AdaptationRegistry::get_adaptation_module).
#[derive(Debug, Error)]
pub enum AdaptationError {
    /// Constructor arguments could not be bound to the module's parameters.
    #[error("invalid arguments for adaptation module `{module}`: {message}")]
    InvalidArguments { module: String, message: String },
    /// Layer construction or a forward pass failed inside Candle.
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
    #[error("failed to read adaptation config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON adaptation config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML adaptation config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0}")]
    ConfigFormat(String),
}

impl AdaptationError {
    pub(crate) fn invalid_arguments(module: &str, message: impl Into<String>) -> Self {
        AdaptationError::InvalidArguments {
            module: module.to_string(),
            message: message.into(),
        }
    }
}
