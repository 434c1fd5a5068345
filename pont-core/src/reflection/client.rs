//! # Reflection Client
//!
//! A client implementation for `grpc.reflection.v1`.
//!
//! It answers the two questions the gateway asks the upstream: which services do you expose,
//! and what is the complete schema behind a given symbol. For the latter it builds a
//! `FileDescriptorSet` by requesting the file that defines the symbol and then recursively
//! fetching every import that hasn't been seen yet, all over a single bidirectional stream.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use crate::BoxError;
use futures_util::stream::once;
use http_body::Body as HttpBody;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Streaming, client::GrpcService};
use tonic_reflection::pb::v1::{
    ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionResolveError {
    #[error(
        "Failed to start a stream request with the reflection server, reflection might not be supported: '{0}'"
    )]
    ServerStreamInitFailed(#[source] tonic::Status),

    #[error("The server stream returned an error status: '{0}'")]
    ServerStreamFailure(#[source] tonic::Status),

    #[error("Reflection stream closed unexpectedly")]
    StreamClosed,

    #[error("Internal error: Failed to send request to stream")]
    SendFailed,

    #[error("Server returned reflection error code {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: Received unexpected response type: {0}")]
    UnexpectedResponseType(String),

    #[error("Failed to decode FileDescriptorProto: {0}")]
    DecodeError(#[from] prost::DecodeError),
}

impl ReflectionResolveError {
    /// The gRPC status behind this error, if the failure came from the transport or the server.
    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            ReflectionResolveError::ServerStreamInitFailed(status)
            | ReflectionResolveError::ServerStreamFailure(status) => Some(status),
            _ => None,
        }
    }
}

// The host field of reflection requests is optional and servers ignore it.
const EMPTY_HOST: &str = "";

/// A client for the gRPC Server Reflection Protocol.
///
/// Cloning is cheap: clones share the underlying transport service.
#[derive(Debug, Clone)]
pub struct ReflectionClient<T = Channel> {
    client: ServerReflectionClient<T>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = ServerReflectionClient::new(service);
        Self { client }
    }

    /// Asks the reflection service for the file containing `symbol` (e.g. `my.package.MyService`)
    /// and every file it transitively imports.
    ///
    /// # Returns
    ///
    /// * `Ok(fd_set)` - All the files needed to build a descriptor pool for `symbol`.
    /// * `Err(ReflectionResolveError)` - The reflection exchange failed.
    pub async fn file_descriptor_set_by_symbol(
        &mut self,
        symbol: &str,
    ) -> Result<FileDescriptorSet, ReflectionResolveError> {
        let (tx, rx) = mpsc::channel(100);

        let mut response_stream = self
            .client
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        tx.send(request(MessageRequest::FileContainingSymbol(
            symbol.to_string(),
        )))
        .await
        .map_err(|_| ReflectionResolveError::SendFailed)?;

        let file_map = collect_descriptors(&mut response_stream, tx).await?;

        tracing::debug!(symbol, files = file_map.len(), "resolved symbol via reflection");

        Ok(FileDescriptorSet {
            file: file_map.into_values().collect(),
        })
    }

    /// Lists the fully qualified names of all services exposed by the server, in the order the
    /// server reports them.
    pub async fn list_services(&mut self) -> Result<Vec<String>, ReflectionResolveError> {
        let req = request(MessageRequest::ListServices(String::new()));

        let mut response_stream = self
            .client
            .server_reflection_info(once(async { req }))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        let response = response_stream
            .message()
            .await
            .map_err(ReflectionResolveError::ServerStreamFailure)?
            .ok_or(ReflectionResolveError::StreamClosed)?;

        match response.message_response {
            Some(MessageResponse::ListServicesResponse(resp)) => {
                Ok(resp.service.into_iter().map(|s| s.name).collect())
            }
            other => Err(unexpected_response(other)),
        }
    }
}

fn request(message_request: MessageRequest) -> ServerReflectionRequest {
    ServerReflectionRequest {
        host: EMPTY_HOST.to_string(),
        message_request: Some(message_request),
    }
}

fn unexpected_response(response: Option<MessageResponse>) -> ReflectionResolveError {
    match response {
        Some(MessageResponse::ErrorResponse(e)) => ReflectionResolveError::ServerError {
            code: e.error_code,
            message: e.error_message,
        },
        Some(other) => ReflectionResolveError::UnexpectedResponseType(format!("{other:?}")),
        None => ReflectionResolveError::UnexpectedResponseType("Empty Message".into()),
    }
}

/// Reads file descriptor responses until no request is left unanswered.
async fn collect_descriptors(
    response_stream: &mut Streaming<ServerReflectionResponse>,
    request_channel: mpsc::Sender<ServerReflectionRequest>,
) -> Result<HashMap<String, FileDescriptorProto>, ReflectionResolveError> {
    let mut inflight = 1;
    let mut collected_files = HashMap::new();
    let mut requested = HashSet::new();

    while inflight > 0 {
        let response = response_stream
            .message()
            .await
            .map_err(ReflectionResolveError::ServerStreamFailure)?
            .ok_or(ReflectionResolveError::StreamClosed)?;

        inflight -= 1;

        match response.message_response {
            Some(MessageResponse::FileDescriptorResponse(res)) => {
                for raw in res.file_descriptor_proto {
                    let fd = FileDescriptorProto::decode(raw.as_ref())?;

                    let Some(name) = fd.name.clone() else {
                        continue;
                    };
                    if collected_files.contains_key(&name) {
                        continue;
                    }

                    for dep in &fd.dependency {
                        if !collected_files.contains_key(dep) && requested.insert(dep.clone()) {
                            request_channel
                                .send(request(MessageRequest::FileByFilename(dep.clone())))
                                .await
                                .map_err(|_| ReflectionResolveError::SendFailed)?;
                            inflight += 1;
                        }
                    }

                    collected_files.insert(name, fd);
                }
            }
            other => return Err(unexpected_response(other)),
        }
    }

    Ok(collected_files)
}
