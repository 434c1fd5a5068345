use crate::gateway::{AppState, routes::router};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use pont_core::Proxy;
use pont_core::prost_reflect::{DescriptorPool, DynamicMessage};
use std::sync::Arc;
use std::time::Duration;
use testing_service::{FILE_DESCRIPTOR_SET, TestServiceServer};
use testing_service_impl::TestServiceImpl;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::Routes;
use tonic::transport::{Endpoint, Server};
use tower::ServiceExt as _;

mod testing_service_impl;

/// Serves the testing upstream on a local port and returns a gateway connected to it.
async fn setup_gateway() -> Router {
    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .unwrap();

    let test_service = TestServiceServer::new(TestServiceImpl);

    let routes = Routes::new(reflection_service).add_service(test_service);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(
        Server::builder()
            .add_routes(routes)
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );

    let endpoint = Endpoint::from_shared(format!("http://{addr}")).unwrap();
    let proxy = Proxy::connect_lazy(endpoint, Duration::from_millis(50));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !proxy.is_ready() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("the upstream should become ready");

    router(AppState::new(
        Arc::new(proxy),
        Some(Duration::from_secs(10)),
    ))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, body)
}

fn post(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_unary_call() {
    let app = setup_gateway().await;

    let (status, body) = send(app, post("/v1/grpc.testing.TestService/EmptyCall", "{}")).await;

    assert_eq!(status, StatusCode::OK);

    let pool = DescriptorPool::decode(FILE_DESCRIPTOR_SET).unwrap();
    let output = pool.get_message_by_name("grpc.testing.Empty").unwrap();
    let mut deserializer = serde_json::Deserializer::from_slice(&body);
    DynamicMessage::deserialize(output, &mut deserializer)
        .expect("response should decode as the method's output type");
}

#[tokio::test]
async fn test_unimplemented_call() {
    let app = setup_gateway().await;

    let (status, body) = send(app, post("/v1/grpc.testing.TestService/UnaryCall", "{}")).await;

    assert_ne!(status, StatusCode::OK);

    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_ne!(body["code"], "ServiceNotFound");
    assert_ne!(body["code"], "MethodNotFound");
}

#[tokio::test]
async fn test_headers_reach_the_upstream() {
    let app = setup_gateway().await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/grpc.testing.TestService/EmptyCall")
        .header("Authorization", "denied")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "Unknown");
}

#[tokio::test]
async fn test_resolution_failures() {
    let app = setup_gateway().await;

    let (status, body) = send(app.clone(), post("/v1/grpc.testing.Ghost/EmptyCall", "{}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "ServiceNotFound");

    let (status, body) = send(
        app.clone(),
        post("/v1/grpc.testing.TestService/GhostCall", "{}"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "MethodNotFound");

    let (status, body) = send(
        app,
        post("/v1/grpc.testing.TestService/UnaryCall", r#"{"responseSize":"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "MessageTypeMismatch");
}

#[tokio::test]
async fn test_introspection() {
    let app = setup_gateway().await;

    let (status, body) = send(app, get("/actuator/services")).await;

    assert_eq!(status, StatusCode::OK);

    let catalog: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let service = catalog["services"]
        .as_array()
        .unwrap()
        .iter()
        .find(|service| service["name"] == "grpc.testing.TestService")
        .expect("TestService should be listed");

    assert_eq!(service["methods"].as_array().unwrap().len(), 6);
    assert_eq!(
        service["methods"][0]["route"],
        "/grpc.testing.TestService/EmptyCall"
    );
}

#[tokio::test]
async fn test_health() {
    let app = setup_gateway().await;

    let (status, body) = send(app, get("/actuator/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"UP"}"#);
}
