use crate::di::Inject;
use dashmap::DashMap;
use std::any::{Any, type_name};
use std::sync::Arc;

/// Name-keyed registry of shared instances.
///
/// Each entry holds an `Arc<T>` (where `T` may be a trait object) under a
/// name. Providing the same name twice replaces the earlier instance.
/// Lookups succeed only when both the name and the exact `Arc<T>` type match.
///
/// Providers are expected to be registered before the owning transport starts
/// serving; the map itself is concurrent, but handlers injected before a
/// `provide` call will not observe it.
#[derive(Clone, Default)]
pub struct Container {
    providers: DashMap<String, Provided>,
}

#[derive(Clone)]
struct Provided {
    instance: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Container {
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    /// Record `instance` under `name`, replacing any previous entry.
    ///
    /// # Example
    /// ```
    /// use modrouter::Container;
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    /// struct Fixed;
    /// impl Clock for Fixed {
    ///     fn now(&self) -> u64 { 7 }
    /// }
    ///
    /// let container = Container::new();
    /// container.provide::<dyn Clock>("clock", Arc::new(Fixed));
    /// assert_eq!(container.get::<dyn Clock>("clock").unwrap().now(), 7);
    /// ```
    pub fn provide<T>(&self, name: impl Into<String>, instance: Arc<T>) -> &Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = Provided {
            instance: Arc::new(instance),
            type_name: type_name::<T>(),
        };
        if let Some(previous) = self.providers.insert(name.clone(), entry) {
            tracing::debug!(
                name = %name,
                previous = previous.type_name,
                current = type_name::<T>(),
                "replaced provided dependency"
            );
        }
        self
    }

    /// Wrap `value` in an `Arc` and provide it.
    pub fn provide_value<T>(&self, name: impl Into<String>, value: T) -> &Self
    where
        T: Send + Sync + 'static,
    {
        self.provide(name, Arc::new(value))
    }

    /// The instance under `name`, if there is one and it is an `Arc<T>`.
    pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = self.providers.get(name)?;
        entry.instance.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Type name recorded for `name`, for diagnostics.
    pub fn type_name_of(&self, name: &str) -> Option<&'static str> {
        self.providers.get(name).map(|entry| entry.type_name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Fill the dependency slots of `target` from this container.
    pub fn inject<T: Inject + ?Sized>(&self, target: &mut T) {
        target.inject(self);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
