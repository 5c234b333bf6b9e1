//! Functionality related to registering definitions of services. The
//! [Container](crate::container::Container) creates instances based on those definitions, while
//! [discovery](crate::discovery) walks their declared dependencies.

use crate::error::{CatalogError, ErrorPtr};
use crate::service::{ServiceAnyPtr, ServiceId, ServicePtr};
use derivative::Derivative;
use fxhash::FxHashMap;

/// Zero-argument constructor for type-erased instances.
pub type Constructor = fn() -> Result<ServiceAnyPtr, ErrorPtr>;

/// Definition for a service registered in a [ServiceCatalog].
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ServiceDefinition {
    pub id: ServiceId,

    /// Services without a constructor can only be resolved after an instance has been set
    /// explicitly in the container.
    #[derivative(Debug = "ignore")]
    pub constructor: Option<Constructor>,

    /// Injectable dependencies (property and constructor parameter types) followed during
    /// discovery.
    pub dependencies: Vec<ServiceId>,
}

impl ServiceDefinition {
    /// Creates a definition without a constructor or dependencies.
    pub fn new(id: ServiceId) -> Self {
        Self {
            id,
            constructor: None,
            dependencies: Vec::new(),
        }
    }

    /// Creates a definition for a type constructible via [Default].
    pub fn of_default<T: Default + Send + Sync + 'static>() -> Self {
        Self {
            id: ServiceId::of::<T>(),
            constructor: Some(construct_default::<T>),
            dependencies: Vec::new(),
        }
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn with_dependencies<I: IntoIterator<Item = ServiceId>>(mut self, dependencies: I) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    #[inline]
    pub fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }
}

fn construct_default<T: Default + Send + Sync + 'static>() -> Result<ServiceAnyPtr, ErrorPtr> {
    Ok(ServicePtr::new(T::default()) as ServiceAnyPtr)
}

/// Registry of service definitions, preserving registration order.
#[derive(Clone, Debug, Default)]
pub struct ServiceCatalog {
    definitions: FxHashMap<ServiceId, ServiceDefinition>,
    order: Vec<ServiceId>,
    allow_definition_overriding: bool,
}

impl ServiceCatalog {
    pub fn new(allow_definition_overriding: bool) -> Self {
        Self {
            allow_definition_overriding,
            ..Default::default()
        }
    }

    /// Adds a new definition. Re-registering an id replaces the previous definition only if
    /// overriding is allowed.
    pub fn register(&mut self, definition: ServiceDefinition) -> Result<(), CatalogError> {
        if let Some(existing) = self.definitions.get_mut(&definition.id) {
            if !self.allow_definition_overriding {
                return Err(CatalogError::DuplicateService(definition.id));
            }

            *existing = definition;
            return Ok(());
        }

        self.order.push(definition.id.clone());
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Shorthand for registering [ServiceDefinition::of_default].
    pub fn register_default<T: Default + Send + Sync + 'static>(
        &mut self,
    ) -> Result<(), CatalogError> {
        self.register(ServiceDefinition::of_default::<T>())
    }

    /// Adds dependencies to an already registered definition, skipping the ones it already has.
    /// Returns `false` if the service is not registered.
    pub fn add_dependencies<I: IntoIterator<Item = ServiceId>>(
        &mut self,
        id: &ServiceId,
        dependencies: I,
    ) -> bool {
        let Some(definition) = self.definitions.get_mut(id) else {
            return false;
        };

        for dependency in dependencies {
            if !definition.dependencies.contains(&dependency) {
                definition.dependencies.push(dependency);
            }
        }

        true
    }

    #[inline]
    pub fn definition(&self, id: &ServiceId) -> Option<&ServiceDefinition> {
        self.definitions.get(id)
    }

    #[inline]
    pub fn is_registered(&self, id: &ServiceId) -> bool {
        self.definitions.contains_key(id)
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.order
            .iter()
            .filter_map(|id| self.definitions.get(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{ServiceCatalog, ServiceDefinition};
    use crate::error::CatalogError;
    use crate::service::ServiceId;

    #[derive(Default)]
    struct TestService;

    #[derive(Default)]
    struct OtherService;

    #[test]
    fn should_register_definition() {
        let mut catalog = ServiceCatalog::default();
        catalog.register_default::<TestService>().unwrap();

        let id = ServiceId::of::<TestService>();
        assert!(catalog.is_registered(&id));
        assert!(catalog.definition(&id).unwrap().is_constructible());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn should_not_register_duplicate_service() {
        let mut catalog = ServiceCatalog::new(false);
        catalog.register_default::<TestService>().unwrap();

        assert_eq!(
            catalog.register_default::<TestService>().unwrap_err(),
            CatalogError::DuplicateService(ServiceId::of::<TestService>())
        );
    }

    #[test]
    fn should_override_duplicate_service() {
        let mut catalog = ServiceCatalog::new(true);
        catalog.register_default::<TestService>().unwrap();
        catalog
            .register(
                ServiceDefinition::new(ServiceId::of::<TestService>())
                    .with_dependencies([ServiceId::of::<OtherService>()]),
            )
            .unwrap();

        let definition = catalog
            .definition(&ServiceId::of::<TestService>())
            .unwrap();
        assert!(!definition.is_constructible());
        assert_eq!(definition.dependencies.len(), 1);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn should_add_dependencies_to_registered_service() {
        let mut catalog = ServiceCatalog::default();
        catalog
            .register(
                ServiceDefinition::of_default::<TestService>()
                    .with_dependencies([ServiceId::new("first")]),
            )
            .unwrap();

        let id = ServiceId::of::<TestService>();
        assert!(catalog.add_dependencies(
            &id,
            [ServiceId::new("first"), ServiceId::new("second")]
        ));
        assert_eq!(
            catalog.definition(&id).unwrap().dependencies,
            vec![ServiceId::new("first"), ServiceId::new("second")]
        );

        assert!(!catalog.add_dependencies(&ServiceId::of::<OtherService>(), [id]));
        assert!(!catalog.is_registered(&ServiceId::of::<OtherService>()));
    }

    #[test]
    fn should_keep_registration_order() {
        let mut catalog = ServiceCatalog::default();
        catalog.register_default::<OtherService>().unwrap();
        catalog.register_default::<TestService>().unwrap();

        let ids: Vec<_> = catalog
            .definitions()
            .map(|definition| definition.id.clone())
            .collect();
        assert_eq!(
            ids,
            vec![ServiceId::of::<OtherService>(), ServiceId::of::<TestService>()]
        );
    }
}
