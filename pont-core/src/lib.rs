//! # Pont Core
//!
//! `pont-core` is the engine behind the Pont gateway. It exposes the methods of any gRPC server
//! with reflection enabled as plain JSON calls, without compile-time knowledge of the Protobuf
//! schema.
//!
//! ## Key Components
//!
//! * **[`Proxy`]:** The main entry point. It owns the upstream connection, answers readiness
//!   queries, invokes methods with JSON payloads and builds the introspection catalog.
//! * **[`ProxyError`]:** The only error crossing the public boundary. Its [`ErrorCode`] maps to an
//!   HTTP status and a JSON error body.
//! * **[`Metadata`]:** Caller headers forwarded to the upstream as gRPC metadata.
//!
//! ## Building blocks
//!
//! The pieces used by the proxy are public as well:
//!
//! * **[`reflection::Reflector`]:** Resolves services, methods and message types through the
//!   gRPC Server Reflection Protocol, on every call (nothing is cached).
//! * **[`grpc::client::Stub`]:** Performs unary calls for methods resolved at runtime.
//! * **[`connection::Upstream`]:** The shared transport and its connectivity state.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod connection;
pub mod error;
pub mod grpc;
pub mod metadata;
pub mod proxy;
pub mod reflection;

pub use error::{ErrorBody, ErrorCode, ProxyError};
pub use metadata::Metadata;
pub use proxy::{CallContext, Proxy};

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
