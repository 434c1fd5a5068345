//! # Stub
//!
//! Wraps a `tonic` client to perform unary calls for methods resolved at runtime.
//!
//! ## How it works
//!
//! The [`Stub`] receives a [`MethodInvocation`] (a method descriptor plus a request message
//! already decoded against its input type), builds the HTTP/2 path
//! (`/package.Service/Method`) at runtime, attaches the caller's metadata and sends the
//! message using the [`DynamicCodec`].
//!
//! It neither retries nor interprets the upstream's answer: a `tonic::Status` returned by the
//! server is handed back as is, next to the successful response.
use super::codec::DynamicCodec;
use crate::{
    BoxError,
    metadata::{Metadata, MetadataError},
    reflection::MethodInvocation,
};
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use std::{str::FromStr, time::Duration};
use tonic::{client::GrpcService, transport::Channel};

#[derive(thiserror::Error, Debug)]
pub enum InvokeError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Method '{0}' is a streaming method, only unary methods can be invoked")]
    StreamingNotSupported(String),
    #[error(transparent)]
    InvalidMetadata(#[from] MetadataError),
}

/// A generic client performing single request / single response gRPC calls.
///
/// Cloning is cheap: clones share the underlying transport service.
#[derive(Debug, Clone)]
pub struct Stub<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> Stub<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// `timeout`, when set, is sent to the server as the call's `grpc-timeout`.
    ///
    /// # Returns
    ///
    /// * `Ok(Ok(DynamicMessage))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but the upstream answered with an error status.
    /// * `Err(InvokeError)` - The request could not be sent.
    pub async fn invoke_rpc(
        &self,
        invocation: MethodInvocation,
        metadata: &Metadata,
        timeout: Option<Duration>,
    ) -> Result<Result<DynamicMessage, tonic::Status>, InvokeError> {
        let (method, message) = invocation.into_parts();

        if method.is_client_streaming() || method.is_server_streaming() {
            return Err(InvokeError::StreamingNotSupported(
                method.full_name().to_string(),
            ));
        }

        let mut request = tonic::Request::new(message);
        *request.metadata_mut() = metadata.to_grpc()?;
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }

        let mut client = self.client.clone();
        client
            .ready()
            .await
            .map_err(|e| InvokeError::ClientNotReady(e.into()))?;

        let codec = DynamicCodec::new(method.output());
        let path = http_path(&method);

        tracing::debug!(path = %path, "invoking upstream method");

        match client.unary(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }
}

fn http_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}
