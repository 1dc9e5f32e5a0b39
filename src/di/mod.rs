mod builder;
mod container;
mod inject;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use inject::{DependencySlot, Inject, require};
