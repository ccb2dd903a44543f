//! Resolution traits implemented by the container and by resolver contexts.

mod resolver;

pub use resolver::{Resolver, ResolverCore};
