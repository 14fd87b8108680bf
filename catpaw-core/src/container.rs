// Dependency injection container

use crate::error::{Error, Result};
use crate::logging::{debug, trace};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Marker for types the container may store and build.
pub trait Provider: Send + Sync + 'static {
    /// Returns the TypeId of the provider
    fn type_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

pub type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

enum Entry {
    Instance(Instance),
    Singleton(Factory),
    Transient(Factory),
}

#[derive(Default)]
struct Registry {
    entries: HashMap<TypeId, Entry>,
    type_names: HashMap<TypeId, &'static str>,
    names: HashMap<String, TypeId>,
}

thread_local! {
    static BUILDING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Pops the type being built when dropped.
struct BuildGuard;

impl BuildGuard {
    fn enter(type_id: TypeId, type_name: &str) -> Result<Self> {
        BUILDING.with(|building| {
            let mut building = building.borrow_mut();
            if building.contains(&type_id) {
                return Err(Error::DependencyInjection(format!(
                    "Circular dependency detected while building {type_name}"
                )));
            }
            building.push(type_id);
            Ok(BuildGuard)
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with(|building| {
            building.borrow_mut().pop();
        });
    }
}

/// The dependency injection container
///
/// Maps a type to a registered instance, a singleton factory (built once on
/// first resolution) or a transient factory (built on every resolution).
/// Factories receive the container so they can resolve their own
/// dependencies.
///
/// ```
/// use catpaw_core::{Container, Provider};
///
/// struct Config { name: String }
/// impl Provider for Config {}
///
/// struct Greeter { greeting: String }
/// impl Provider for Greeter {}
///
/// let container = Container::new();
/// container.register(Config { name: "cat".into() });
/// container.provide_singleton(|c| {
///     let config = c.resolve::<Config>()?;
///     Ok(Greeter { greeting: format!("hello {}", config.name) })
/// });
///
/// assert_eq!(container.resolve::<Greeter>().unwrap().greeting, "hello cat");
/// ```
#[derive(Clone, Default)]
pub struct Container {
    registry: Arc<RwLock<Registry>>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container").field("entries", &self.len()).finish()
    }
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new DI container");
        Self::default()
    }

    /// Register a singleton instance
    pub fn register<T: Provider>(&self, instance: T) {
        self.insert::<T>(Entry::Instance(Arc::new(instance)));
    }

    /// Register an already shared instance
    pub fn register_arc<T: Provider>(&self, instance: Arc<T>) {
        self.insert::<T>(Entry::Instance(instance));
    }

    /// Register a factory whose result is built once and cached
    pub fn provide_singleton<T, F>(&self, factory: F)
    where
        T: Provider,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.insert::<T>(Entry::Singleton(Arc::new(move |c| {
            factory(c).map(|v| Arc::new(v) as Instance)
        })));
    }

    /// Register a factory invoked on every resolution
    pub fn provide_transient<T, F>(&self, factory: F)
    where
        T: Provider,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.insert::<T>(Entry::Transient(Arc::new(move |c| {
            factory(c).map(|v| Arc::new(v) as Instance)
        })));
    }

    fn insert<T: Provider>(&self, entry: Entry) {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        trace!(provider = type_name, "Acquiring write lock for registration");
        let mut registry = self.registry.write();
        registry.entries.insert(type_id, entry);
        registry.type_names.insert(type_id, type_name);

        debug!(provider = type_name, "Provider registered in DI container");
    }

    /// Make `T` resolvable by `name`.
    pub fn alias<T: Provider>(&self, name: impl Into<String>) {
        let name = name.into();
        debug!(provider = std::any::type_name::<T>(), alias = %name, "Alias registered");
        self.registry.write().names.insert(name, TypeId::of::<T>());
    }

    /// Resolve a provider by type
    pub fn resolve<T: Provider>(&self) -> Result<Arc<T>> {
        let type_name = std::any::type_name::<T>();
        self.resolve_by_id(TypeId::of::<T>(), type_name)?
            .downcast::<T>()
            .map_err(|_| Error::DependencyInjection(format!("Type mismatch for {type_name}")))
    }

    /// Resolve a type registered under `name`.
    pub fn resolve_by_name(&self, name: &str) -> Result<Instance> {
        let found = {
            let registry = self.registry.read();
            registry.names.get(name).map(|type_id| {
                let type_name = registry.type_names.get(type_id).copied().unwrap_or(name);
                (*type_id, type_name.to_string())
            })
        };
        let (type_id, type_name) =
            found.ok_or_else(|| Error::ProviderNotFound(format!("No provider named `{name}`")))?;
        self.resolve_by_id(type_id, &type_name)
    }

    /// Resolve by `TypeId`; `type_name` is used for diagnostics.
    pub fn resolve_by_id(&self, type_id: TypeId, type_name: &str) -> Result<Instance> {
        trace!(provider = type_name, "Attempting to resolve provider");

        enum Found {
            Ready(Instance),
            Build(Factory, bool),
        }

        let found = {
            let registry = self.registry.read();
            match registry.entries.get(&type_id) {
                Some(Entry::Instance(instance)) => Found::Ready(instance.clone()),
                Some(Entry::Singleton(factory)) => Found::Build(factory.clone(), true),
                Some(Entry::Transient(factory)) => Found::Build(factory.clone(), false),
                None => {
                    debug!(provider = type_name, "Provider not found in container");
                    return Err(Error::ProviderNotFound(type_name.to_string()));
                }
            }
        };

        match found {
            Found::Ready(instance) => Ok(instance),
            Found::Build(factory, cache) => {
                let instance = {
                    let _guard = BuildGuard::enter(type_id, type_name)?;
                    factory(self)?
                };
                if cache {
                    let mut registry = self.registry.write();
                    // Another caller may have finished first; keep its instance.
                    if let Some(Entry::Instance(existing)) = registry.entries.get(&type_id) {
                        return Ok(existing.clone());
                    }
                    registry
                        .entries
                        .insert(type_id, Entry::Instance(instance.clone()));
                }
                debug!(provider = type_name, singleton = cache, "Provider built");
                Ok(instance)
            }
        }
    }

    /// Check if a provider is registered
    pub fn has<T: Provider>(&self) -> bool {
        self.has_id(TypeId::of::<T>())
    }

    pub fn has_id(&self, type_id: TypeId) -> bool {
        self.registry.read().entries.contains_key(&type_id)
    }

    /// Clear all providers
    pub fn clear(&self) {
        let mut registry = self.registry.write();
        let count = registry.entries.len();
        *registry = Registry::default();

        debug!(provider_count = count, "Cleared all providers from container");
    }

    pub fn len(&self) -> usize {
        self.registry.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
