//! Identifiers and pointer types shared by everything stored in a
//! [Container](crate::container::Container).

use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Shared pointer to a resolved service.
pub type ServicePtr<T> = Arc<T>;

/// Type-erased [ServicePtr], as stored in the container.
pub type ServiceAnyPtr = ServicePtr<dyn Any + Send + Sync + 'static>;

/// Identifier of a service type. Identifiers end up in persisted route caches, so they are plain
/// strings rather than [TypeId](std::any::TypeId)s.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Creates an identifier from an arbitrary name.
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    /// Identifier derived from the type name of `T`.
    ///
    /// Type names are only stable within a single build - the compiler is free to format them
    /// differently between versions. Identifiers persisted by one build must not be trusted by
    /// another one, or explicit names given via [ServiceId::new] should be used instead.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(type_name::<T>().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ServiceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::service::ServiceId;

    struct Marker;

    #[test]
    fn should_derive_id_from_type_name() {
        let id = ServiceId::of::<Marker>();
        assert!(id.as_str().ends_with("Marker"));
        assert_eq!(id, ServiceId::of::<Marker>());
    }

    #[test]
    fn should_display_raw_id() {
        assert_eq!(ServiceId::new("users").to_string(), "users");
        assert_eq!(ServiceId::from("users"), ServiceId::new("users".to_string()));
    }
}
