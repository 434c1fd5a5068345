//! # Reflector
//!
//! Resolves services, methods and message types from the upstream at runtime, using the gRPC
//! Server Reflection Protocol, and turns raw JSON payloads into typed requests.
//!
//! Nothing is cached: every resolution performs a fresh reflection round trip, so schema
//! changes on the upstream are visible on the next call without restarting the gateway.
//!
//! All failures are reported as [`ProxyError`]s whose code tells the three resolution failures
//! apart:
//!
//! * unknown service: `ServiceNotFound`
//! * unknown method on a known service: `MethodNotFound`
//! * payload that doesn't match the method's input type: `MessageTypeMismatch`
pub mod client;
pub mod message;
pub mod template;

use crate::{
    BoxError,
    error::{ProxyError, is_connectivity_failure},
};
use client::{ReflectionClient, ReflectionResolveError};
use http_body::Body as HttpBody;
use prost_reflect::{DescriptorPool, DynamicMessage, MethodDescriptor, ServiceDescriptor};
use tonic::{client::GrpcService, transport::Channel};

/// A resolved method together with a request message already decoded against its input type.
///
/// This is the unit handed to the [`crate::grpc::client::Stub`]. It is built for one call and
/// consumed by it.
#[derive(Debug, Clone)]
pub struct MethodInvocation {
    method: MethodDescriptor,
    message: DynamicMessage,
}

impl MethodInvocation {
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn message(&self) -> &DynamicMessage {
        &self.message
    }

    pub fn into_parts(self) -> (MethodDescriptor, DynamicMessage) {
        (self.method, self.message)
    }
}

/// Performs reflection against the upstream to obtain services, methods and types.
#[derive(Debug, Clone)]
pub struct Reflector<S = Channel> {
    client: ReflectionClient<S>,
}

impl<S> Reflector<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            client: ReflectionClient::new(service),
        }
    }

    /// Resolves `name` to its service descriptor.
    ///
    /// The descriptor carries the whole pool built from the service's file and its imports,
    /// so every message type reachable from its methods can be resolved from it.
    pub async fn resolve_service(&self, name: &str) -> Result<ServiceDescriptor, ProxyError> {
        let not_found =
            || ProxyError::ServiceNotFound(format!("service {name} was not found upstream"));

        let fd_set = self
            .client
            .clone()
            .file_descriptor_set_by_symbol(name)
            .await
            .map_err(|err| {
                tracing::debug!(service = name, error = %err, "service resolution failed");
                resolve_error(err).unwrap_or_else(not_found)
            })?;

        let pool = DescriptorPool::from_file_descriptor_set(fd_set).map_err(|err| {
            ProxyError::Unknown(format!(
                "failed to build the descriptor pool for service {name}: {err}"
            ))
        })?;

        pool.get_service_by_name(name).ok_or_else(not_found)
    }

    /// Lists the fully qualified names of all services, in the order the upstream reports them.
    pub async fn list_services(&self) -> Result<Vec<String>, ProxyError> {
        self.client
            .clone()
            .list_services()
            .await
            .map_err(|err| {
                let message = format!("listing services failed: {err}");
                resolve_error(err).unwrap_or(ProxyError::ServiceNotFound(message))
            })
    }

    /// Returns the method descriptors of a service, in declaration order.
    pub async fn describe_service(&self, name: &str) -> Result<Vec<MethodDescriptor>, ProxyError> {
        let service = self.resolve_service(name).await?;
        Ok(service.methods().collect())
    }

    /// Resolves `service_name`/`method_name` and decodes `input` into the method's input type.
    pub async fn create_invocation(
        &self,
        service_name: &str,
        method_name: &str,
        input: &[u8],
    ) -> Result<MethodInvocation, ProxyError> {
        let service = self.resolve_service(service_name).await?;
        let method = find_method_by_name(&service, method_name)?;
        let message = message::decode_json(method.input(), input)?;

        tracing::debug!(
            service = service_name,
            method = method_name,
            input_type = method.input().full_name(),
            "created invocation"
        );

        Ok(MethodInvocation { method, message })
    }
}

/// Finds a method by its short name (e.g. `SayHello`) on a resolved service.
pub fn find_method_by_name(
    service: &ServiceDescriptor,
    name: &str,
) -> Result<MethodDescriptor, ProxyError> {
    service
        .methods()
        .find(|m| m.name() == name)
        .ok_or_else(|| ProxyError::MethodNotFound(format!("the method {name} was not found")))
}

/// Maps reflection failures caused by the connection itself. Anything else is left to the caller.
fn resolve_error(err: ReflectionResolveError) -> Option<ProxyError> {
    match err.status() {
        Some(status) if is_connectivity_failure(status.code()) => {
            Some(ProxyError::UpstreamConnFailure(format!(
                "reflection request failed: {}",
                status.message()
            )))
        }
        _ => None,
    }
}
