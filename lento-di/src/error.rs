use crate::service::ServiceId;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased error produced by user code, e.g. service constructors or request handlers.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Errors related to resolving and creating service instances.
#[derive(Error, Clone, Debug)]
pub enum ContainerError {
    #[error("Service '{0}' not found")]
    NotFound(ServiceId),
    #[error("Error constructing service '{id}': {source}")]
    Construction {
        id: ServiceId,
        #[source]
        source: ErrorPtr,
    },
    #[error("Tried to downcast service '{0}' to an incompatible type")]
    Incompatible(ServiceId),
}

/// Errors related to registering service definitions.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum CatalogError {
    #[error("Attempted to re-register service: {0}")]
    DuplicateService(ServiceId),
}
