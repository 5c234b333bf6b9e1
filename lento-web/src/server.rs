//! Core server-related functionality. Every request is handed to the [Dispatcher] by a single
//! fallback handler, which also turns dispatch errors into `500` responses.

use crate::config::WebConfig;
use crate::dispatcher::Dispatcher;
use crate::http::{Request, Response};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::IntoResponse;
use axum::Router;
use bytes::Bytes;
use hyper::Error as HyperError;
use lento_router::method::HttpMethod;
use std::future::Future;
use std::net::{AddrParseError, SocketAddr};
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors related to running servers.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Error parsing listen address: {0}")]
    ListenAddressParseError(#[source] AddrParseError),
    #[error("Error binding server: {0}")]
    BindError(#[source] HyperError),
    #[error("Server error: {0}")]
    ServeError(#[source] HyperError),
}

/// Creates an axum router dispatching all requests.
pub fn create_router(dispatcher: Dispatcher) -> Router {
    Router::new().fallback(handle).with_state(dispatcher)
}

/// Runs a server until the shutdown future completes.
pub async fn serve<F>(
    config: &WebConfig,
    dispatcher: Dispatcher,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address: SocketAddr = config
        .listen_address
        .parse()
        .map_err(ServerError::ListenAddressParseError)?;

    let builder = axum::Server::try_bind(&address).map_err(ServerError::BindError)?;
    info!(%address, "Listening.");

    builder
        .serve(create_router(dispatcher).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::ServeError)
}

async fn handle(
    State(dispatcher): State<Dispatcher>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let Ok(method) = method.as_str().parse::<HttpMethod>() else {
        debug!(%method, "Unsupported method.");
        return Response::not_found().into_response();
    };

    let request = Request::from_parts(
        method,
        uri.path(),
        uri.query(),
        headers.iter().filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        }),
        &body,
    );

    match dispatcher.dispatch(request).await {
        Ok(response) => response.into_response(),
        Err(dispatch_error) => {
            error!(error = %dispatch_error, "Error dispatching request.");
            Response::internal_error().into_response()
        }
    }
}
