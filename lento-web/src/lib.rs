//! Request dispatching for the Lento routing core, with axum as the transport.
//!
//! The [Dispatcher](dispatcher::Dispatcher) closes over a compiled
//! [RouteTable](lento_router::table::RouteTable) and a service
//! [Container](lento_di::container::Container). For every request it serves static assets, matches
//! a route, forks the controller singleton, injects properties, binds arguments, invokes the
//! action and formats the reply.
//!
//! ### Simple usage example
//!
//! ```
//! use futures::future::{BoxFuture, FutureExt};
//! use lento_web::argument::Arguments;
//! use lento_web::controller::{Controller, ControllerRegistry, Reply, UnknownActionError};
//! use lento_web::dispatcher::Dispatcher;
//! use lento_web::http::Request;
//! use lento_web::lento_di::catalog::ServiceCatalog;
//! use lento_web::lento_di::container::Container;
//! use lento_web::lento_di::service::ServiceId;
//! use lento_web::lento_di::ErrorPtr;
//! use lento_web::lento_router::compiler::RouteCompiler;
//! use lento_web::lento_router::descriptor::{EndpointDescriptor, ParameterDescriptor, PrimitiveType};
//! use lento_web::lento_router::method::HttpMethod;
//! use lento_web::Wire;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Clone, Default, Wire)]
//! struct HelloController;
//!
//! impl Controller for HelloController {
//!     fn invoke<'a>(
//!         &'a self,
//!         action: &'a str,
//!         arguments: Arguments,
//!     ) -> BoxFuture<'a, Result<Reply, ErrorPtr>> {
//!         async move {
//!             match action {
//!                 "hello" => Ok(json!({ "id": arguments.int(0) }).into()),
//!                 _ => Err(Arc::new(UnknownActionError(action.to_string())) as ErrorPtr),
//!             }
//!         }
//!         .boxed()
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let descriptors = [EndpointDescriptor::new(
//!     ServiceId::of::<HelloController>(),
//!     HttpMethod::Get,
//!     "/hello/{id}",
//!     "hello",
//! )
//! .parameter(ParameterDescriptor::primitive("id", PrimitiveType::Int))];
//!
//! let mut catalog = ServiceCatalog::default();
//! catalog.register_default::<HelloController>().unwrap();
//!
//! let mut controllers = ControllerRegistry::default();
//! controllers.register::<HelloController>();
//!
//! let dispatcher = Dispatcher::builder(
//!     RouteCompiler::default().compile(&descriptors).unwrap(),
//!     Arc::new(Container::new(catalog)),
//!     controllers,
//! )
//! .build();
//!
//! let response = dispatcher
//!     .dispatch(Request::new(HttpMethod::Get, "/hello/7"))
//!     .await
//!     .unwrap();
//! assert_eq!(response.body_json().unwrap(), json!({ "id": 7 }));
//! # });
//! ```
//!
//! ### Features
//!
//! * `derive` - automatically import helper proc macros

extern crate self as lento_web;

pub mod argument;
pub mod asset;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod dto;
pub mod formatter;
pub mod http;
pub mod server;
pub mod validation;
pub mod view;

pub use axum;
pub use lento_di;
pub use lento_router;

#[cfg(feature = "derive")]
pub use lento_web_derive::*;
