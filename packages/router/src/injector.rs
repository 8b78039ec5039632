//! Environment Injector
//!
//! The router treats dependency injection as an opaque service locator: a
//! typed capability object passed explicitly down the recognize/guard/resolve
//! call chain. Lazily loaded configurations may carry their own child
//! injector so their guards and resolvers see the providers of the loaded
//! module, falling back to ancestors for everything else.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A hierarchical, typed provider map.
#[derive(Default)]
pub struct Injector {
    parent: Option<Arc<Injector>>,
    providers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Injector {
    pub fn new() -> Self {
        Injector::default()
    }

    /// A child injector that falls back to `parent` for unknown tokens.
    pub fn with_parent(parent: Arc<Injector>) -> Self {
        Injector {
            parent: Some(parent),
            providers: HashMap::new(),
        }
    }

    /// Register a provider instance under its type.
    pub fn provide<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.providers.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Look up a provider, walking up the parent chain.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self.providers.get(&TypeId::of::<T>()) {
            Some(provider) => provider.clone().downcast::<T>().ok(),
            None => self.parent.as_ref().and_then(|p| p.get::<T>()),
        }
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.providers.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
