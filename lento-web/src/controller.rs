//! Functionality related to defining [Controller]s - service types exposing actions invoked by the
//! [Dispatcher](crate::dispatcher::Dispatcher).
//!
//! Controllers are container singletons. Since properties are injected per request, each request
//! works on its own clone of the singleton, created by a fork function recorded in the
//! [ControllerRegistry].

use crate::argument::Arguments;
use crate::dispatcher::Dispatcher;
use crate::http::{Request, ResponseHandle};
use crate::view::View;
use fxhash::FxHashMap;
use futures::future::BoxFuture;
use lento_di::service::{ServiceAnyPtr, ServiceId, ServicePtr};
use lento_di::ErrorPtr;
use lento_router::descriptor::PropertyInjection;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Error for actions unknown to a controller.
#[derive(Error, Clone, Debug)]
#[error("Unknown action: {0}")]
pub struct UnknownActionError(pub String);

/// Value returned by handlers. Views are rendered by the view formatter regardless of the route
/// formatter, everything else goes through the formatter selected by the route.
#[derive(Clone, PartialEq, Debug)]
pub enum Reply {
    Value(Value),
    View(View),
}

impl Reply {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ErrorPtr> {
        serde_json::to_value(value)
            .map(Reply::Value)
            .map_err(|error| Arc::new(error) as ErrorPtr)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<View> for Reply {
    fn from(view: View) -> Self {
        Reply::View(view)
    }
}

/// Value resolved for a property injection.
pub enum Injected {
    Request(Request),
    Response(ResponseHandle),
    Dispatcher(Dispatcher),
    Service(ServiceAnyPtr),
}

/// Field types which can receive [Injected] values.
pub trait InjectTarget: Sized {
    /// Type reported in [PropertyInjection]s.
    fn declared_type() -> ServiceId;

    fn from_injected(value: Injected) -> Option<Self>;
}

impl<T: Send + Sync + 'static> InjectTarget for ServicePtr<T> {
    fn declared_type() -> ServiceId {
        ServiceId::of::<T>()
    }

    fn from_injected(value: Injected) -> Option<Self> {
        match value {
            Injected::Service(instance) => instance.downcast().ok(),
            _ => None,
        }
    }
}

impl<T: InjectTarget> InjectTarget for Option<T> {
    fn declared_type() -> ServiceId {
        T::declared_type()
    }

    fn from_injected(value: Injected) -> Option<Self> {
        T::from_injected(value).map(Some)
    }
}

impl InjectTarget for Request {
    fn declared_type() -> ServiceId {
        ServiceId::of::<Request>()
    }

    fn from_injected(value: Injected) -> Option<Self> {
        match value {
            Injected::Request(request) => Some(request),
            _ => None,
        }
    }
}

impl InjectTarget for ResponseHandle {
    fn declared_type() -> ServiceId {
        ServiceId::of::<ResponseHandle>()
    }

    fn from_injected(value: Injected) -> Option<Self> {
        match value {
            Injected::Response(response) => Some(response),
            _ => None,
        }
    }
}

impl InjectTarget for Dispatcher {
    fn declared_type() -> ServiceId {
        ServiceId::of::<Dispatcher>()
    }

    fn from_injected(value: Injected) -> Option<Self> {
        match value {
            Injected::Dispatcher(dispatcher) => Some(dispatcher),
            _ => None,
        }
    }
}

/// Checks if properties of given type are injected by the dispatcher itself, rather than resolved
/// from the container.
pub fn is_contextual_type(id: &ServiceId) -> bool {
    *id == Request::declared_type()
        || *id == ResponseHandle::declared_type()
        || *id == Dispatcher::declared_type()
}

/// Explicit property injection contract, usually generated with `#[derive(Wire)]`.
pub trait Wire {
    /// Assigns a value to given field. Returns false if the field is unknown or the value has an
    /// incompatible type.
    fn wire(&mut self, field: &str, value: Injected) -> bool;

    /// Injectable properties.
    fn properties() -> Vec<PropertyInjection>
    where
        Self: Sized;
}

/// Collection of actions invoked by name.
pub trait Controller: Wire + Send + Sync + 'static {
    fn invoke<'a>(
        &'a self,
        action: &'a str,
        arguments: Arguments,
    ) -> BoxFuture<'a, Result<Reply, ErrorPtr>>;
}

type ForkFn = fn(&ServiceAnyPtr) -> Option<Box<dyn Controller>>;

fn fork<C: Controller + Clone>(instance: &ServiceAnyPtr) -> Option<Box<dyn Controller>> {
    instance
        .clone()
        .downcast::<C>()
        .ok()
        .map(|controller| Box::new(C::clone(&controller)) as Box<dyn Controller>)
}

/// Known controller types.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    forks: FxHashMap<ServiceId, ForkFn>,
}

impl ControllerRegistry {
    pub fn register<C: Controller + Clone>(&mut self) -> &mut Self {
        self.forks.insert(ServiceId::of::<C>(), fork::<C>);
        self
    }

    #[inline]
    pub fn is_registered(&self, id: &ServiceId) -> bool {
        self.forks.contains_key(id)
    }

    /// Creates a request-local copy of a controller singleton.
    pub fn fork(&self, id: &ServiceId, instance: &ServiceAnyPtr) -> Option<Box<dyn Controller>> {
        self.forks.get(id).and_then(|fork| fork(instance))
    }

    pub fn ids(&self) -> Vec<ServiceId> {
        let mut ids: Vec<_> = self.forks.keys().cloned().collect();
        ids.sort();
        ids
    }
}
