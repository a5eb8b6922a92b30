//! Name → constructor registry for adaptation modules.
//!
//! The registry is an ordinary value built once during start-up and handed to
//! whatever assembles the distillation pipeline. Registration is explicit:
//! each module-providing unit calls [`AdaptationRegistryBuilder::register_module`]
//! (or the raw [`AdaptationRegistryBuilder::register`]) during its own
//! initialisation. Re-registering a name replaces the earlier entry.

use std::{collections::HashMap, fmt, sync::Arc};

use candle_nn::VarBuilder;
use tracing::{debug, warn};

use crate::{
    args::ModuleArgs,
    config::AdaptationModuleConfig,
    conv_reg::ConvReg,
    error::AdaptationError,
    module::{constructor_for, AdaptationModule, ModuleConstructor, RegisteredModule},
};

/// Receives the human-readable diagnostic emitted on a lookup miss.
pub type DiagnosticSink = Arc<dyn Fn(&str) + Send + Sync>;

fn stdout_sink() -> DiagnosticSink {
    Arc::new(|message: &str| println!("{message}"))
}

/// Message reported when `name` has no registered constructor.
pub fn missing_module_message(name: &str) -> String {
    format!("No adaption module called `{name}` is registered.")
}

/// Incremental construction of an [`AdaptationRegistry`].
pub struct AdaptationRegistryBuilder {
    registry: AdaptationRegistry,
}

impl AdaptationRegistryBuilder {
    /// Registers `constructor` under `name`, replacing any earlier entry.
    pub fn register(mut self, name: impl Into<String>, constructor: ModuleConstructor) -> Self {
        self.registry.register(name, constructor);
        self
    }

    /// Registers `M` under its own declared name.
    pub fn register_module<M: RegisteredModule>(self) -> Self {
        self.register(M::NAME, constructor_for::<M>())
    }

    /// Registers the modules shipped with this crate.
    pub fn builtin_modules(self) -> Self {
        self.register_module::<ConvReg>()
    }

    /// Routes lookup-miss diagnostics to `sink` instead of stdout.
    pub fn diagnostics<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.registry.diagnostics = Arc::new(sink);
        self
    }

    pub fn build(self) -> AdaptationRegistry {
        self.registry
    }
}

/// Maps module names to their constructors.
#[derive(Clone)]
pub struct AdaptationRegistry {
    constructors: HashMap<String, ModuleConstructor>,
    diagnostics: DiagnosticSink,
}

impl AdaptationRegistry {
    /// Creates an empty registry reporting misses on stdout.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            diagnostics: stdout_sink(),
        }
    }

    /// Creates a registry holding the built-in modules.
    pub fn with_builtin_modules() -> Self {
        Self::builder().builtin_modules().build()
    }

    pub fn builder() -> AdaptationRegistryBuilder {
        AdaptationRegistryBuilder {
            registry: Self::new(),
        }
    }

    /// Records `constructor` under `name` and returns the entry it replaced.
    ///
    /// Nothing is validated; the last registration for a name wins.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: ModuleConstructor,
    ) -> Option<ModuleConstructor> {
        let name = name.into();
        let previous = self.constructors.insert(name.clone(), constructor);
        if previous.is_some() {
            debug!(module = %name, "replaced adaptation module registration");
        } else {
            debug!(module = %name, "registered adaptation module");
        }
        previous
    }

    /// Registers `M` under its own declared name.
    pub fn register_module<M: RegisteredModule>(&mut self) -> Option<ModuleConstructor> {
        self.register(M::NAME, constructor_for::<M>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.constructors.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Constructs the module registered under `name`.
    ///
    /// Returns `Ok(None)` after reporting a diagnostic when `name` is unknown.
    /// Construction failures are returned as-is.
    pub fn get_adaptation_module(
        &self,
        name: &str,
        args: &ModuleArgs,
        vb: VarBuilder,
    ) -> Result<Option<Box<dyn AdaptationModule>>, AdaptationError> {
        let Some(constructor) = self.constructors.get(name).copied() else {
            warn!(module = %name, "no adaptation module registered under this name");
            (self.diagnostics)(&missing_module_message(name));
            return Ok(None);
        };
        debug!(module = %name, "constructing adaptation module");
        constructor(args, vb).map(Some)
    }

    /// Constructs the module described by `config`.
    pub fn build_from_config(
        &self,
        config: &AdaptationModuleConfig,
        vb: VarBuilder,
    ) -> Result<Option<Box<dyn AdaptationModule>>, AdaptationError> {
        self.get_adaptation_module(&config.module_type, &config.module_args(), vb)
    }
}

impl Default for AdaptationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdaptationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptationRegistry")
            .field("modules", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn missing_message_names_the_module() {
        let message = missing_module_message("DoesNotExist");
        assert_eq!(message, "No adaption module called `DoesNotExist` is registered.");
    }

    #[test]
    fn register_returns_replaced_entry() {
        let mut registry = AdaptationRegistry::new();
        assert!(registry.register_module::<ConvReg>().is_none());
        assert!(registry.register_module::<ConvReg>().is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["ConvReg"]);
    }

    #[test]
    fn builder_routes_diagnostics_to_custom_sink() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        let registry = AdaptationRegistry::builder()
            .diagnostics(move |message| sink.lock().unwrap().push(message.to_string()))
            .build();
        assert!(registry.is_empty());

        let varmap = candle_nn::VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, candle_core::DType::F32, &candle_core::Device::Cpu);
        let module = registry
            .get_adaptation_module("Missing", &ModuleArgs::new(), vb)
            .unwrap();
        assert!(module.is_none());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn debug_lists_registered_names() {
        let registry = AdaptationRegistry::with_builtin_modules();
        assert!(format!("{registry:?}").contains("ConvReg"));
    }
}
