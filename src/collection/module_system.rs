//! Component module system for modular registration.
//!
//! This module provides traits for organizing component registrations into
//! reusable modules.

use crate::{ComponentCollection, DiResult};

/// A module that registers components with a ComponentCollection.
///
/// # Example
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentCollectionExt, ComponentModule, DiResult, Resolver};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct UserConfig;
///
/// struct UserService {
///     config: Arc<UserConfig>,
/// }
///
/// struct UserModule;
///
/// impl ComponentModule for UserModule {
///     fn register_components(self, components: &mut ComponentCollection) -> DiResult<()> {
///         components.add_singleton(UserConfig::default());
///         components.add_prototype_factory::<UserService, _>(|r| {
///             Ok(UserService { config: r.get::<UserConfig>()? })
///         });
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let container = ComponentCollection::new().add_module(UserModule)?.build()?;
/// assert!(container.get::<UserService>().is_ok());
/// # Ok(())
/// # }
/// ```
pub trait ComponentModule {
    /// Register this module's components with the ComponentCollection.
    fn register_components(self, components: &mut ComponentCollection) -> DiResult<()>;
}

/// Extension trait for ComponentCollection that provides module registration.
pub trait ComponentCollectionExt {
    /// Add a module using chained-call syntax.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ferrous_ioc::{ComponentCollection, ComponentCollectionExt, ComponentModule, DiResult};
    ///
    /// struct DatabaseModule;
    /// impl ComponentModule for DatabaseModule {
    ///     fn register_components(self, _: &mut ComponentCollection) -> DiResult<()> { Ok(()) }
    /// }
    ///
    /// struct UserModule;
    /// impl ComponentModule for UserModule {
    ///     fn register_components(self, _: &mut ComponentCollection) -> DiResult<()> { Ok(()) }
    /// }
    ///
    /// # fn main() -> DiResult<()> {
    /// let container = ComponentCollection::new()
    ///     .add_module(DatabaseModule)?
    ///     .add_module(UserModule)?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    fn add_module<M: ComponentModule>(self, module: M) -> DiResult<Self>
    where
        Self: Sized;

    /// Add a module to the collection in place.
    fn add_module_mut<M: ComponentModule>(&mut self, module: M) -> DiResult<&mut Self>;
}

impl ComponentCollectionExt for ComponentCollection {
    fn add_module<M: ComponentModule>(mut self, module: M) -> DiResult<Self> {
        module.register_components(&mut self)?;
        Ok(self)
    }

    fn add_module_mut<M: ComponentModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register_components(self)?;
        Ok(self)
    }
}
