use crate::di::Container;
use crate::error::HandlerError;
use std::sync::Arc;

/// Types whose dependency slots can be filled from a [`Container`].
///
/// This trait is typically implemented by `#[derive(Endpoint)]`, which fills
/// every `#[inject]` field by its name (or the name given in the attribute).
/// Slots with no matching entry, or an entry of another type, keep their
/// current value. Injection never fails.
///
/// # Example
/// ```
/// use modrouter::di::{Container, DependencySlot, Inject};
/// use std::sync::Arc;
///
/// struct Greeter {
///     prefix: Option<Arc<String>>,
/// }
///
/// impl Inject for Greeter {
///     fn inject(&mut self, container: &Container) {
///         self.prefix.fill(container, "prefix");
///     }
/// }
///
/// let container = Container::new();
/// container.provide_value("prefix", "hello".to_string());
/// let mut greeter = Greeter { prefix: None };
/// container.inject(&mut greeter);
/// assert_eq!(greeter.prefix.as_deref().map(String::as_str), Some("hello"));
/// ```
pub trait Inject {
    fn inject(&mut self, container: &Container) {
        let _ = container;
    }
}

/// A field that can hold a shared dependency.
pub trait DependencySlot {
    /// Replace the slot's value with the container entry under `name`.
    /// Returns whether it did.
    fn fill(&mut self, container: &Container, name: &str) -> bool;
}

impl<T> DependencySlot for Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn fill(&mut self, container: &Container, name: &str) -> bool {
        match container.get::<T>(name) {
            Some(dependency) => {
                *self = Some(dependency);
                true
            }
            None => false,
        }
    }
}

impl<T> DependencySlot for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn fill(&mut self, container: &Container, name: &str) -> bool {
        match container.get::<T>(name) {
            Some(dependency) => {
                *self = dependency;
                true
            }
            None => false,
        }
    }
}

/// Borrow an injected dependency, or fail the handler if it was never provided.
pub fn require<'a, T>(slot: &'a Option<Arc<T>>, name: &str) -> Result<&'a T, HandlerError>
where
    T: ?Sized,
{
    slot.as_deref()
        .ok_or_else(|| HandlerError::msg(format!("dependency not provided: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Store: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Memory;

    impl Store for Memory {
        fn name(&self) -> &str {
            "memory"
        }
    }

    struct Handler {
        store: Option<Arc<dyn Store>>,
        counter: Arc<u32>,
        unrelated: Option<Arc<String>>,
    }

    impl Inject for Handler {
        fn inject(&mut self, container: &Container) {
            self.store.fill(container, "store");
            self.counter.fill(container, "counter");
            self.unrelated.fill(container, "unrelated");
        }
    }

    #[test]
    fn test_inject_matches_name_and_type() {
        let container = Container::new();
        container.provide::<dyn Store>("store", Arc::new(Memory));
        container.provide_value("counter", 10_u32);
        // Right name, wrong type: left untouched.
        container.provide_value("unrelated", 3_i64);

        let mut handler = Handler {
            store: None,
            counter: Arc::new(0),
            unrelated: Some(Arc::new("prototype".into())),
        };
        container.inject(&mut handler);

        assert_eq!(handler.store.as_ref().unwrap().name(), "memory");
        assert_eq!(*handler.counter, 10);
        assert_eq!(handler.unrelated.as_deref().unwrap(), "prototype");
    }

    #[test]
    fn test_concrete_type_does_not_fill_trait_slot() {
        let container = Container::new();
        container.provide_value("store", Memory);

        let mut handler = Handler {
            store: None,
            counter: Arc::new(0),
            unrelated: None,
        };
        container.inject(&mut handler);
        assert!(handler.store.is_none());
    }

    #[test]
    fn test_require_reports_missing_dependency() {
        let slot: Option<Arc<dyn Store>> = None;
        let err = require(&slot, "store").err().unwrap();
        assert_eq!(err.to_string(), "dependency not provided: store");

        let slot: Option<Arc<dyn Store>> = Some(Arc::new(Memory));
        assert_eq!(require(&slot, "store").unwrap().name(), "memory");
    }
}
