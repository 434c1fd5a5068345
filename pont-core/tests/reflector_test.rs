use pont_core::ProxyError;
use pont_core::reflection::{Reflector, find_method_by_name};
use prost_reflect::ReflectMessage;
use testing_service::{FILE_DESCRIPTOR_SET, TestServiceServer};
use testing_service_impl::TestServiceImpl;
use tonic::service::Routes;


fn setup_reflector() -> Reflector<Routes> {
    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .unwrap();

    let test_service = TestServiceServer::new(TestServiceImpl);

    let service = Routes::new(reflection_service).add_service(test_service);

    Reflector::new(service)
}

#[tokio::test]
async fn test_resolve_unknown_service() {
    let reflector = setup_reflector();

    let result = reflector.resolve_service("grpc.testing.Ghost").await;

    assert!(matches!(result, Err(ProxyError::ServiceNotFound(_))));
}

#[tokio::test]
async fn test_resolve_message_name_as_service() {
    let reflector = setup_reflector();

    // The symbol exists upstream, but it is not a service
    let result = reflector.resolve_service("grpc.testing.Empty").await;

    assert!(matches!(result, Err(ProxyError::ServiceNotFound(_))));
}

#[tokio::test]
async fn test_find_method_by_name() {
    let reflector = setup_reflector();
    let service = reflector
        .resolve_service("grpc.testing.TestService")
        .await
        .unwrap();

    let method = find_method_by_name(&service, "UnaryCall").unwrap();
    assert_eq!(method.input().full_name(), "grpc.testing.SimpleRequest");
    assert_eq!(method.output().full_name(), "grpc.testing.SimpleResponse");

    let result = find_method_by_name(&service, "GhostCall");
    assert!(matches!(result, Err(ProxyError::MethodNotFound(_))));
}

#[tokio::test]
async fn test_describe_service_keeps_declaration_order() {
    let reflector = setup_reflector();

    let methods = reflector
        .describe_service("grpc.testing.TestService")
        .await
        .unwrap();

    let names: Vec<_> = methods.iter().map(|m| m.name()).collect();
    assert_eq!(
        names,
        [
            "EmptyCall",
            "UnaryCall",
            "StreamingOutputCall",
            "StreamingInputCall",
            "FullDuplexCall",
            "HalfDuplexCall"
        ]
    );
}

#[tokio::test]
async fn test_describe_unknown_service() {
    let reflector = setup_reflector();

    let result = reflector.describe_service("grpc.testing.Ghost").await;

    assert!(matches!(result, Err(ProxyError::ServiceNotFound(_))));
}

#[tokio::test]
async fn test_list_services() {
    let reflector = setup_reflector();

    let services = reflector.list_services().await.unwrap();

    assert!(services.contains(&"grpc.testing.TestService".to_string()));
}

#[tokio::test]
async fn test_create_invocation() {
    let reflector = setup_reflector();

    let body = br#"{"responseType":"RANDOM","responseSize":42,"payload":{"body":"aGVsbG8="}}"#;

    let invocation = reflector
        .create_invocation("grpc.testing.TestService", "UnaryCall", body)
        .await
        .unwrap();

    assert_eq!(invocation.method().name(), "UnaryCall");
    assert_eq!(
        invocation.message().descriptor().full_name(),
        "grpc.testing.SimpleRequest"
    );
    assert_eq!(
        invocation.message().descriptor(),
        invocation.method().input()
    );

    let size = invocation
        .message()
        .get_field_by_name("response_size")
        .unwrap();
    assert_eq!(size.as_i32(), Some(42));
}

#[tokio::test]
async fn test_create_invocation_with_empty_body() {
    let reflector = setup_reflector();

    let invocation = reflector
        .create_invocation("grpc.testing.TestService", "EmptyCall", b"")
        .await
        .unwrap();

    assert_eq!(
        invocation.message().descriptor().full_name(),
        "grpc.testing.Empty"
    );
}

#[tokio::test]
async fn test_create_invocation_failures_are_distinguishable() {
    let reflector = setup_reflector();

    let unknown_service = reflector
        .create_invocation("grpc.testing.Ghost", "EmptyCall", b"{}")
        .await;
    assert!(matches!(unknown_service, Err(ProxyError::ServiceNotFound(_))));

    let unknown_method = reflector
        .create_invocation("grpc.testing.TestService", "GhostCall", b"{}")
        .await;
    assert!(matches!(unknown_method, Err(ProxyError::MethodNotFound(_))));

    let bodies: [&[u8]; 6] = [
        b"{",
        b"not json",
        br#"{"responseSize":"many"}"#,
        br#"{"unknownField":1}"#,
        br#"{} {}"#,
        b"[]",
    ];

    for body in bodies {
        let mismatch = reflector
            .create_invocation("grpc.testing.TestService", "UnaryCall", body)
            .await;

        assert!(
            matches!(mismatch, Err(ProxyError::MessageTypeMismatch(_))),
            "body {:?} should not decode",
            String::from_utf8_lossy(body)
        );
    }
}
