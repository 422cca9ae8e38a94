//! Registry that the host environment discovers modules in before running a script.
//!
//! Nothing is registered as a side effect of linking the crate. The host creates a
//! [`ModuleRegistry`] during start-up and passes it to each module's registration function,
//! e.g. [`register`](crate::register).

use std::{any::Any, collections::HashMap, sync::Arc};

use thiserror::Error;
use tracing::debug;

type Factory = Box<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Error from registering or instantiating a module.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A module with the same name was registered before
    #[error("module {0:?} is already registered")]
    Duplicate(String),

    /// No module was registered under the name
    #[error("module {0:?} is not registered")]
    NotFound(String),

    /// The module does not have the requested type
    #[error("module {0:?} is not of the requested type")]
    TypeMismatch(String),
}

/// Modules available to scripts, indexed by their import name.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, Factory>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

impl ModuleRegistry {
    /// Registers a factory that builds a new instance of the module for every script.
    pub fn register<M, F>(&mut self, name: &str, factory: F) -> Result<(), RegistryError>
    where
        M: Any + Send + Sync,
        F: Fn() -> M + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        debug!(module = name, "registered");
        self.factories.insert(
            name.to_string(),
            Box::new(move || Arc::new(factory()) as Arc<dyn Any + Send + Sync>),
        );
        Ok(())
    }

    /// Builds an instance of the module registered under `name`.
    pub fn instantiate<M>(&self, name: &str) -> Result<Arc<M>, RegistryError>
    where
        M: Any + Send + Sync,
    {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        factory()
            .downcast::<M>()
            .map_err(|_| RegistryError::TypeMismatch(name.to_string()))
    }

    /// Returns `true` if a module is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all registered modules, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
