//! Singleton service container for the Lento dispatch core.
//!
//! Services are described by [ServiceDefinition](catalog::ServiceDefinition)s registered in a
//! [ServiceCatalog](catalog::ServiceCatalog). A [Container](container::Container) resolves
//! services by [ServiceId](service::ServiceId), lazily constructing zero-argument constructible
//! ones and keeping every instance for the lifetime of the process.
//!
//! Before a server starts, [discover_services](discovery::discover_services) walks the dependency
//! graph of the declared controllers, so the container can be populated eagerly with
//! [Container::bootstrap](container::Container::bootstrap):
//!
//! ```
//! use lento_di::catalog::{ServiceCatalog, ServiceDefinition};
//! use lento_di::container::Container;
//! use lento_di::discovery::discover_services;
//! use lento_di::service::ServiceId;
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! #[derive(Default)]
//! struct GreetingController;
//!
//! let mut catalog = ServiceCatalog::default();
//! catalog.register_default::<Greeter>().unwrap();
//! catalog
//!     .register(
//!         ServiceDefinition::of_default::<GreetingController>()
//!             .with_dependencies([ServiceId::of::<Greeter>()]),
//!     )
//!     .unwrap();
//!
//! let services = discover_services(&[ServiceId::of::<GreetingController>()], &catalog);
//! assert_eq!(services.len(), 2);
//!
//! let container = Container::new(catalog);
//! container.bootstrap(&services).unwrap();
//! assert!(container.has(&ServiceId::of::<Greeter>()));
//! ```

pub mod catalog;
pub mod container;
pub mod discovery;
mod error;
pub mod service;

pub use error::{CatalogError, ContainerError, ErrorPtr};
