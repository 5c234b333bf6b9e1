//! Core functionality for resolving service instances.
//!
//! The container only knows the singleton scope: once an instance of a service is installed, every
//! subsequent resolution returns the same pointer. Instances are installed either explicitly via
//! [Container::set] or lazily, on first resolution of a zero-argument constructible service.

use crate::catalog::ServiceCatalog;
use crate::error::ContainerError;
use crate::service::{ServiceAnyPtr, ServiceId, ServicePtr};
use fxhash::FxHashMap;
use itertools::Itertools;
use parking_lot::RwLock;
use tracing::debug;

/// Singleton registry of service instances backed by a [ServiceCatalog].
pub struct Container {
    catalog: ServiceCatalog,
    instances: RwLock<FxHashMap<ServiceId, ServiceAnyPtr>>,
}

impl Container {
    pub fn new(catalog: ServiceCatalog) -> Self {
        Self {
            catalog,
            instances: Default::default(),
        }
    }

    /// Registers an instance under the id of its type, replacing any previous one.
    pub fn set<T: Send + Sync + 'static>(&self, instance: ServicePtr<T>) {
        self.set_any(ServiceId::of::<T>(), instance);
    }

    /// Registers a type-erased instance under given id, replacing any previous one.
    pub fn set_any(&self, id: ServiceId, instance: ServiceAnyPtr) {
        self.instances.write().insert(id, instance);
    }

    /// Returns the registered instance for given id, constructing and registering it first if the
    /// service is zero-argument constructible.
    ///
    /// Concurrent first resolutions may run the constructor more than once, but only the first
    /// installed instance is ever returned.
    pub fn get(&self, id: &ServiceId) -> Result<ServiceAnyPtr, ContainerError> {
        if let Some(instance) = self.instances.read().get(id) {
            return Ok(instance.clone());
        }

        let constructor = self
            .catalog
            .definition(id)
            .and_then(|definition| definition.constructor)
            .ok_or_else(|| ContainerError::NotFound(id.clone()))?;

        let instance = constructor().map_err(|source| ContainerError::Construction {
            id: id.clone(),
            source,
        })?;

        debug!(service = %id, "Constructed service instance.");

        Ok(self
            .instances
            .write()
            .entry(id.clone())
            .or_insert(instance)
            .clone())
    }

    /// Typesafe version of [Container::get], using the type name as id.
    pub fn get_typed<T: Send + Sync + 'static>(&self) -> Result<ServicePtr<T>, ContainerError> {
        let id = ServiceId::of::<T>();
        self.get(&id)?
            .downcast::<T>()
            .map_err(|_| ContainerError::Incompatible(id))
    }

    /// Checks if an instance is already registered. Does not construct anything.
    #[inline]
    pub fn has(&self, id: &ServiceId) -> bool {
        self.instances.read().contains_key(id)
    }

    /// Ids of all registered instances, sorted.
    pub fn all(&self) -> Vec<ServiceId> {
        self.instances.read().keys().cloned().sorted().collect()
    }

    #[inline]
    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Eagerly instantiates every given service which is constructible and not registered yet.
    /// Returns the number of newly created instances.
    pub fn bootstrap(&self, ids: &[ServiceId]) -> Result<usize, ContainerError> {
        let mut created = 0;
        for id in ids {
            if self.has(id) {
                continue;
            }

            match self.catalog.definition(id) {
                Some(definition) if definition.is_constructible() => {
                    self.get(id)?;
                    created += 1;
                }
                _ => debug!(service = %id, "Skipping service without a constructor."),
            }
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{ServiceCatalog, ServiceDefinition};
    use crate::container::Container;
    use crate::error::{ContainerError, ErrorPtr};
    use crate::service::{ServiceAnyPtr, ServiceId, ServicePtr};
    use std::fmt::{Display, Formatter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default, Debug)]
    struct Counter {
        value: usize,
    }

    #[derive(Debug)]
    struct BrokenServiceError;

    impl Display for BrokenServiceError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str("broken")
        }
    }

    impl std::error::Error for BrokenServiceError {}

    fn broken_constructor() -> Result<ServiceAnyPtr, ErrorPtr> {
        Err(Arc::new(BrokenServiceError) as ErrorPtr)
    }

    static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

    struct Slow;

    fn slow_constructor() -> Result<ServiceAnyPtr, ErrorPtr> {
        CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(5));
        Ok(ServicePtr::new(Slow) as ServiceAnyPtr)
    }

    fn create_container() -> Container {
        let mut catalog = ServiceCatalog::default();
        catalog.register_default::<Counter>().unwrap();
        catalog
            .register(
                ServiceDefinition::new(ServiceId::new("broken"))
                    .with_constructor(broken_constructor),
            )
            .unwrap();
        catalog
            .register(ServiceDefinition::new(ServiceId::new("manual")))
            .unwrap();
        catalog
            .register(
                ServiceDefinition::new(ServiceId::of::<Slow>()).with_constructor(slow_constructor),
            )
            .unwrap();
        Container::new(catalog)
    }

    #[test]
    fn should_return_set_instance() {
        let container = create_container();
        container.set(ServicePtr::new(Counter { value: 5 }));

        assert_eq!(container.get_typed::<Counter>().unwrap().value, 5);
    }

    #[test]
    fn should_lazily_construct_singleton() {
        let container = create_container();
        let id = ServiceId::of::<Counter>();
        assert!(!container.has(&id));

        let first = container.get_typed::<Counter>().unwrap();
        let second = container.get_typed::<Counter>().unwrap();

        assert!(container.has(&id));
        assert!(ServicePtr::ptr_eq(&first, &second));
    }

    #[test]
    fn should_not_find_unregistered_service() {
        let container = create_container();
        assert!(matches!(
            container.get(&ServiceId::new("missing")).unwrap_err(),
            ContainerError::NotFound(_)
        ));
    }

    #[test]
    fn should_not_find_service_without_constructor() {
        let container = create_container();
        assert!(matches!(
            container.get(&ServiceId::new("manual")).unwrap_err(),
            ContainerError::NotFound(_)
        ));

        container.set_any(ServiceId::new("manual"), ServicePtr::new(1_u8));
        assert!(container.get(&ServiceId::new("manual")).is_ok());
    }

    #[test]
    fn should_forward_construction_error() {
        let container = create_container();
        assert!(matches!(
            container.get(&ServiceId::new("broken")).unwrap_err(),
            ContainerError::Construction { .. }
        ));
        assert!(!container.has(&ServiceId::new("broken")));
    }

    #[test]
    fn should_detect_incompatible_type() {
        let container = create_container();
        container.set_any(ServiceId::of::<Counter>(), ServicePtr::new(1_u8));

        assert!(matches!(
            container.get_typed::<Counter>().unwrap_err(),
            ContainerError::Incompatible(_)
        ));
    }

    #[test]
    fn should_install_single_instance_under_concurrent_access() {
        let container = create_container();
        let id = ServiceId::of::<Slow>();

        let (container, id) = (&container, &id);

        let instances: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(move || container.get(id).unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert!(CONSTRUCTIONS.load(Ordering::SeqCst) >= 1);
        assert!(instances
            .iter()
            .all(|instance| Arc::ptr_eq(instance, &instances[0])));
    }

    #[test]
    fn should_bootstrap_constructible_services() {
        let container = create_container();
        let created = container
            .bootstrap(&[
                ServiceId::of::<Counter>(),
                ServiceId::new("manual"),
                ServiceId::new("unknown"),
            ])
            .unwrap();

        assert_eq!(created, 1);
        assert_eq!(container.all(), vec![ServiceId::of::<Counter>()]);
    }

    #[test]
    fn should_fail_bootstrap_on_construction_error() {
        let container = create_container();
        assert!(container.bootstrap(&[ServiceId::new("broken")]).is_err());
    }
}
