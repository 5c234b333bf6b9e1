use lento_di::service::ServiceId;
use thiserror::Error;

use crate::method::HttpMethod;

/// Syntax errors in `{name}` path templates.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum TemplateError {
    #[error("Unclosed placeholder")]
    Unclosed,
    #[error("Closing brace without a matching placeholder")]
    Unopened,
    #[error("Nested placeholder")]
    Nested,
    #[error("Empty placeholder name")]
    EmptyName,
    #[error("Invalid placeholder name: {0}")]
    InvalidName(String),
    #[error("Placeholder name used more than once: {0}")]
    DuplicateName(String),
    #[error("Cannot build matcher: {0}")]
    Regex(String),
}

/// Fatal route compilation errors.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum CompileError {
    #[error("Malformed path template '{path}' in {controller}::{action}: {source}")]
    MalformedTemplate {
        path: String,
        controller: ServiceId,
        action: String,
        #[source]
        source: TemplateError,
    },
    #[error("Duplicate route {method} {path} declared by {existing} and {duplicate}")]
    DuplicateRoute {
        method: HttpMethod,
        path: String,
        existing: String,
        duplicate: String,
    },
}

/// Reasons for a route cache to be unusable, or to fail storing.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Missing cache artifact: {0}")]
    MissingArtifact(String),
    #[error("No controllers declared")]
    NoControllers,
    #[error("Cache stored by a different build: {0}")]
    BuildChanged(String),
    #[error("Declared controllers differ from cached controllers")]
    ControllersChanged,
    #[error("No source unit declared for controller: {0}")]
    MissingUnit(ServiceId),
    #[error("Source unit not found: {0}")]
    MissingSource(String),
    #[error("Source unit changed since the cache was stored: {0}")]
    StaleSource(String),
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
