use crate::di::Container;
use std::sync::Arc;

/// Builder for a dependency container
///
/// Use this to register every provider up front, before handing the container
/// to a transport.
///
/// # Example
/// ```
/// use modrouter::ContainerBuilder;
/// use std::sync::Arc;
///
/// let container = ContainerBuilder::new()
///     .value("greeting", "hello".to_string())
///     .provide("limit", Arc::new(10_u32))
///     .build();
/// assert!(container.contains("greeting"));
/// ```
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            container: Container::new(),
        }
    }

    /// Provide a shared instance under `name`
    pub fn provide<T>(self, name: impl Into<String>, instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container.provide(name, instance);
        self
    }

    /// Provide an owned value under `name`
    pub fn value<T>(self, name: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.container.provide_value(name, value);
        self
    }

    /// Build the container
    pub fn build(self) -> Container {
        self.container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
