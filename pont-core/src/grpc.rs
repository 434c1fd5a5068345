//! # Invoker
//!
//! Low-level building blocks to perform unary gRPC calls with messages whose types are only
//! known at runtime.
//!
//! Unlike standard `tonic` clients, which are strongly typed (e.g. `HelloRequest`), the
//! components here exchange [`prost_reflect::DynamicMessage`]s, encoded and decoded using the
//! descriptors obtained through reflection.
pub mod client;
pub mod codec;
