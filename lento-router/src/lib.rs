//! Route compilation and caching for the Lento dispatch core.
//!
//! Declarative [EndpointDescriptor](descriptor::EndpointDescriptor)s, one per controller action,
//! are compiled by the [RouteCompiler](compiler::RouteCompiler) into a [RouteTable](table::RouteTable):
//! static routes are looked up by exact path, while dynamic routes containing `{name}`
//! placeholders are scanned in declaration order, first match wins.
//!
//! Compiling is only needed on a cold boot. The [RouteCache](cache::RouteCache) persists the
//! compiled table together with a [FreshnessManifest](cache::FreshnessManifest) of controller
//! source units, so a warm boot can load the table directly as long as no source unit changed.
//!
//! ```
//! use lento_di::service::ServiceId;
//! use lento_router::compiler::RouteCompiler;
//! use lento_router::descriptor::{EndpointDescriptor, ParameterDescriptor, PrimitiveType};
//! use lento_router::method::HttpMethod;
//!
//! let descriptors = vec![
//!     EndpointDescriptor::new(ServiceId::new("users"), HttpMethod::Get, "/", "list")
//!         .prefix("/users"),
//!     EndpointDescriptor::new(ServiceId::new("users"), HttpMethod::Get, "/{id}", "show")
//!         .prefix("/users")
//!         .parameter(ParameterDescriptor::primitive("id", PrimitiveType::Int).from_route()),
//! ];
//!
//! let table = RouteCompiler::default().compile(&descriptors).unwrap();
//! let matched = table.match_route(HttpMethod::Get, "/users/42").unwrap();
//! assert_eq!(matched.plan.action, "show");
//! assert_eq!(matched.param("id"), Some("42"));
//! ```

pub mod cache;
pub mod compiler;
pub mod descriptor;
mod error;
pub mod method;
pub mod path;
pub mod plan;
pub mod store;
pub mod table;

pub use error::{CacheError, CompileError, TemplateError};
