use futures::future::{BoxFuture, FutureExt};
use lento_web::argument::Arguments;
use lento_web::config::WebConfig;
use lento_web::controller::{Controller, ControllerRegistry, Reply};
use lento_web::dispatcher::Dispatcher;
use lento_web::lento_di::catalog::ServiceCatalog;
use lento_web::lento_di::container::Container;
use lento_web::lento_di::service::ServiceId;
use lento_web::lento_di::ErrorPtr;
use lento_web::lento_router::compiler::RouteCompiler;
use lento_web::lento_router::descriptor::{EndpointDescriptor, ParameterDescriptor};
use lento_web::lento_router::method::HttpMethod;
use lento_web::server::serve;
use lento_web::Wire;
use portpicker::pick_unused_port;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Clone, Default, Wire)]
struct EchoController;

impl Controller for EchoController {
    fn invoke<'a>(
        &'a self,
        _action: &'a str,
        arguments: Arguments,
    ) -> BoxFuture<'a, Result<Reply, ErrorPtr>> {
        async move {
            Ok(json!({
                "name": arguments.text(0),
                "body": arguments.request(1).map(|request| request.body().clone()),
            })
            .into())
        }
        .boxed()
    }
}

fn create_dispatcher() -> Dispatcher {
    let mut catalog = ServiceCatalog::default();
    catalog.register_default::<EchoController>().unwrap();

    let mut controllers = ControllerRegistry::default();
    controllers.register::<EchoController>();

    let table = RouteCompiler::default()
        .compile(&[EndpointDescriptor::new(
            ServiceId::of::<EchoController>(),
            HttpMethod::Post,
            "/echo/{name}",
            "echo",
        )
        .parameter(ParameterDescriptor::untyped("name").from_route())
        .parameter(ParameterDescriptor::request("request"))])
        .unwrap();

    Dispatcher::builder(table, Arc::new(Container::new(catalog)), controllers).build()
}

async fn post_with_retry(client: &reqwest::Client, url: &str) -> reqwest::Response {
    for _ in 0..50 {
        match client
            .post(url)
            .header("content-type", "application/json")
            .body(r#"{"x":1}"#)
            .send()
            .await
        {
            Ok(response) => return response,
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }

    panic!("Server did not start.");
}

#[tokio::test]
async fn should_serve_dispatched_requests() {
    let port = pick_unused_port().unwrap();
    let mut config = WebConfig::default();
    config.listen_address = format!("127.0.0.1:{port}");

    let (sender, receiver) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        serve(&config, create_dispatcher(), async {
            receiver.await.ok();
        })
        .await
    });

    let client = reqwest::Client::new();
    let response = post_with_retry(&client, &format!("http://127.0.0.1:{port}/echo/ann")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json"
    );

    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body, json!({"name": "ann", "body": {"x": 1}}));

    let response = client
        .get(format!("http://127.0.0.1:{port}/echo/ann"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    sender.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn should_reject_invalid_listen_address() {
    let mut config = WebConfig::default();
    config.listen_address = "not an address".to_string();

    assert!(serve(&config, create_dispatcher(), async {}).await.is_err());
}
