//! Service lookup used to inject shared objects into handler parameters.
//!
//! The dispatcher consults a [`ServiceProvider`] twice: once when a handler is registered, to
//! decide whether an unannotated parameter is a service, and once per request, to resolve the
//! value. [`ServiceCollection`] is a simple map backed provider good enough for most hosts.

use crate::error::DispatchError;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

/// Resolves values by their [`TypeId`].
pub trait ServiceProvider: Send + Sync {
    fn is_registered(&self, type_id: TypeId) -> bool;

    fn get_service(&self, type_id: TypeId) -> Option<Box<dyn Any + Send>>;
}

/// Typed helpers on top of [`ServiceProvider`].
pub trait ServiceProviderExt {
    /// Resolves `T`, failing with [`DispatchError::ServiceResolution`] when it is not registered.
    fn get_required<T: Any + Send>(&self) -> Result<T, DispatchError>;
}

impl<P: ServiceProvider + ?Sized> ServiceProviderExt for P {
    fn get_required<T: Any + Send>(&self) -> Result<T, DispatchError> {
        let service =
            self.get_service(TypeId::of::<T>()).ok_or_else(|| DispatchError::service_resolution(type_name::<T>()))?;

        service.downcast::<T>().map(|service| *service).map_err(|_service| DispatchError::service_type(type_name::<T>()))
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

struct Registration {
    type_name: &'static str,
    factory: Factory,
}

/// A [`ServiceProvider`] backed by a map of factories.
#[derive(Default)]
pub struct ServiceCollection {
    registrations: HashMap<TypeId, Registration>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared value, every resolution hands out a clone of it.
    #[must_use]
    pub fn add_singleton<T>(self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.add_factory(move || value.clone())
    }

    /// Registers a factory that is called on every resolution.
    #[must_use]
    pub fn add_factory<T, F>(mut self, factory: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let registration = Registration {
            type_name: type_name::<T>(),
            factory: Box::new(move || Box::new(factory()) as Box<dyn Any + Send>),
        };
        self.registrations.insert(TypeId::of::<T>(), registration);
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl ServiceProvider for ServiceCollection {
    fn is_registered(&self, type_id: TypeId) -> bool {
        self.registrations.contains_key(&type_id)
    }

    fn get_service(&self, type_id: TypeId) -> Option<Box<dyn Any + Send>> {
        self.registrations.get(&type_id).map(|registration| (registration.factory)())
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.registrations.values().map(|registration| registration.type_name)).finish()
    }
}
