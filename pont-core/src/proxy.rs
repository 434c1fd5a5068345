//! # Proxy
//!
//! The orchestrator of the core. It owns the shared [`Upstream`] connection and composes the
//! [`Reflector`] and the [`Stub`] into the two public operations used by the gateway:
//!
//! 1. [`Proxy::invoke`]: JSON request in, JSON response out.
//! 2. [`Proxy::introspect`]: the catalog of every service, method and message type the
//!    upstream exposes, with a JSON template per type.
//!
//! Every failure is returned as a [`ProxyError`]. Nothing is retried.
pub mod catalog;

use crate::{
    BoxError,
    connection::{Connectivity, Upstream},
    error::ProxyError,
    grpc::client::{InvokeError, Stub},
    metadata::Metadata,
    reflection::{Reflector, message, template},
};
use catalog::{IntrospectionCatalog, MethodEntry, ServiceEntry, TypeEntry};
use http_body::Body as HttpBody;
use prost_reflect::MessageDescriptor;
use std::{collections::HashMap, future::Future, time::Duration};
use tokio::time::Instant;
use tonic::{
    client::GrpcService,
    transport::{Channel, Endpoint},
};

/// Per-call scope handed to [`Proxy::invoke`].
///
/// The deadline covers the whole call: reflection round trips and the upstream RPC.
/// Cancellation is cooperative, dropping the `invoke` future aborts whatever is in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context without deadline.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// A context expiring `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// Dynamic gRPC to JSON proxy over a single shared upstream connection.
///
/// Cloning is cheap and clones share the connection, so a single instance can serve any number
/// of concurrent callers.
#[derive(Debug, Clone)]
pub struct Proxy<S = Channel> {
    upstream: Upstream<S>,
    reflector: Reflector<S>,
    stub: Stub<S>,
}

impl Proxy<Channel> {
    /// Builds a proxy over a lazily connected channel to `endpoint`.
    ///
    /// Never fails on an unreachable upstream: the proxy reports itself not ready until the
    /// connection monitor reaches it. Must be called within a Tokio runtime.
    pub fn connect_lazy(endpoint: Endpoint, probe_interval: Duration) -> Self {
        Self::new(Upstream::connect_lazy(endpoint, probe_interval))
    }
}

impl<S> Proxy<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(upstream: Upstream<S>) -> Self {
        let reflector = Reflector::new(upstream.service());
        let stub = Stub::new(upstream.service());

        Self {
            upstream,
            reflector,
            stub,
        }
    }

    /// Whether the upstream connection is currently usable for calls.
    pub fn is_ready(&self) -> bool {
        self.upstream.is_ready()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.upstream.connectivity()
    }

    /// Calls `service`/`method` with the JSON request `input` and returns the JSON response.
    ///
    /// `service` is the fully qualified service name (e.g. `grpc.testing.TestService`) and
    /// `method` its short method name (e.g. `EmptyCall`).
    pub async fn invoke(
        &self,
        ctx: &CallContext,
        service: &str,
        method: &str,
        input: &[u8],
        metadata: &Metadata,
    ) -> Result<Vec<u8>, ProxyError> {
        self.ensure_ready()?;

        let call = async {
            let invocation = self
                .reflector
                .create_invocation(service, method, input)
                .await?;

            let response = self
                .stub
                .invoke_rpc(invocation, metadata, ctx.remaining())
                .await
                .map_err(invoke_error)?
                .map_err(|status| {
                    if status.code() == tonic::Code::Unavailable {
                        self.upstream.report_unavailable();
                    }
                    tracing::debug!(
                        service,
                        method,
                        code = ?status.code(),
                        "upstream call failed"
                    );
                    ProxyError::from_upstream_status(&status)
                })?;

            message::encode_json(&response)
        };

        within(ctx.deadline(), call).await
    }

    /// Builds the catalog of every service reachable upstream.
    ///
    /// Services and their methods keep the order reported by the upstream. Types are unique by
    /// name and come in no particular order. Any failure aborts the whole walk.
    pub async fn catalog(&self) -> Result<IntrospectionCatalog, ProxyError> {
        self.ensure_ready()?;

        let mut services = Vec::new();
        let mut types: HashMap<String, MessageDescriptor> = HashMap::new();

        for name in self.reflector.list_services().await? {
            let methods = self.reflector.describe_service(&name).await?;

            let methods = methods
                .into_iter()
                .map(|method| {
                    for message in [method.input(), method.output()] {
                        types
                            .entry(message.full_name().to_string())
                            .or_insert(message);
                    }

                    MethodEntry {
                        name: method.name().to_string(),
                        input: method.input().full_name().to_string(),
                        output: method.output().full_name().to_string(),
                        route: format!("/{name}/{}", method.name()),
                    }
                })
                .collect();

            services.push(ServiceEntry { name, methods });
        }

        let types = types
            .into_iter()
            .map(|(name, descriptor)| TypeEntry {
                name,
                template: template::make_template(&descriptor),
            })
            .collect();

        Ok(IntrospectionCatalog { services, types })
    }

    /// [`Proxy::catalog`] encoded as JSON.
    pub async fn introspect(&self) -> Result<Vec<u8>, ProxyError> {
        let catalog = self.catalog().await?;

        serde_json::to_vec(&catalog).map_err(|err| {
            ProxyError::Unknown(format!("could not marshal the introspection catalog: {err}"))
        })
    }

    fn ensure_ready(&self) -> Result<(), ProxyError> {
        if self.is_ready() {
            return Ok(());
        }

        Err(ProxyError::UpstreamConnFailure(format!(
            "upstream connection is not ready (state: {:?})",
            self.connectivity()
        )))
    }
}

async fn within<T>(
    deadline: Option<Instant>,
    call: impl Future<Output = Result<T, ProxyError>>,
) -> Result<T, ProxyError> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, call)
            .await
            .unwrap_or_else(|_| {
                Err(ProxyError::UpstreamConnFailure(
                    "deadline exceeded".to_string(),
                ))
            }),
        None => call.await,
    }
}

fn invoke_error(err: InvokeError) -> ProxyError {
    match err {
        InvokeError::ClientNotReady(_) => ProxyError::UpstreamConnFailure(err.to_string()),
        InvokeError::StreamingNotSupported(_) => ProxyError::MethodNotFound(err.to_string()),
        InvokeError::InvalidMetadata(_) => ProxyError::MessageTypeMismatch(err.to_string()),
    }
}
