//! Application bootstrapping for the Lento routing and dispatch core.
//!
//! An [Application](application::Application) turns endpoint declarations into a routing table,
//! bootstraps every service reachable from the declared controllers and serves requests with the
//! [lento_web] dispatcher.
//!
//! Compiling routes requires endpoint metadata, provided by a
//! [MetadataProvider](metadata::MetadataProvider). Compiled routes are persisted in a route cache
//! along with a freshness manifest of controller source units. As long as no unit changes and the
//! set of controllers stays the same, subsequent boots load the cached table and never ask the
//! provider for descriptors.
//!
//! Configuration is read with [ApplicationConfig](config::ApplicationConfig), which also controls
//! installing a default `tracing` subscriber.

pub mod application;
pub mod config;
pub mod metadata;

pub use lento_di;
pub use lento_router;
pub use lento_web;
