//! Name-keyed provider registry.
//!
//! One registry per capability. The registry stores constructors, not
//! instances: every lookup builds a fresh provider so per-request
//! mutable state (the `fetch_maps` flag, HTTP clients) stays isolated.
//! Registries are populated once at bootstrap and read-only afterward.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Constructor stored for each provider name.
pub type ProviderFactory<T> = Arc<dyn Fn() -> Box<T> + Send + Sync>;

/// A registry of provider constructors for one capability `T`.
pub struct ProviderRegistry<T: ?Sized> {
    factories: HashMap<String, ProviderFactory<T>>,
    default_name: Option<String>,
    fallback_chain: Vec<String>,
    cacheable: HashSet<String>,
}

impl<T: ?Sized> Default for ProviderRegistry<T> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
            default_name: None,
            fallback_chain: Vec::new(),
            cacheable: HashSet::new(),
        }
    }
}

impl<T: ?Sized> ProviderRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider constructor under a name
    /// (case-insensitive).
    pub fn register(&mut self, name: &str, factory: impl Fn() -> Box<T> + Send + Sync + 'static) {
        self.factories.insert(name.to_lowercase(), Arc::new(factory));
    }

    /// Registers a provider and makes it the default.
    pub fn register_default(
        &mut self,
        name: &str,
        factory: impl Fn() -> Box<T> + Send + Sync + 'static,
    ) {
        self.register(name, factory);
        self.default_name = Some(name.to_lowercase());
    }

    /// Sets the ordered fallback chain. Unregistered names are kept
    /// (and skipped at lookup time) so configuration and registration
    /// order are independent.
    pub fn set_fallback_chain(&mut self, names: &[String]) {
        self.fallback_chain = names.iter().map(|name| name.to_lowercase()).collect();
    }

    /// Marks a provider's results as eligible for the geocode cache.
    pub fn mark_cacheable(&mut self, name: &str) {
        self.cacheable.insert(name.to_lowercase());
    }

    /// Builds a fresh instance of the named provider, or of the
    /// default provider when no name is given. Returns `None` when the
    /// name is unregistered or no default is set.
    #[must_use]
    pub fn new_instance(&self, name: Option<&str>) -> Option<Box<T>> {
        let name = match name {
            Some(name) if !name.is_empty() => name.to_lowercase(),
            _ => self.default_name.clone()?,
        };
        match self.factories.get(&name) {
            Some(factory) => Some(factory()),
            None => {
                log::debug!("{name} is not a registered provider");
                None
            }
        }
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        !name.is_empty() && self.factories.contains_key(&name.to_lowercase())
    }

    #[must_use]
    pub fn is_cacheable(&self, name: &str) -> bool {
        self.cacheable.contains(&name.to_lowercase())
    }

    #[must_use]
    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// The fallback chain as configured.
    #[must_use]
    pub fn fallback_chain(&self) -> &[String] {
        &self.fallback_chain
    }

    /// Registered provider names, unordered.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
