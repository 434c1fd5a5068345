//! # Testing Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide the `grpc.testing.TestService`
//! server bindings and a descriptor set for integration testing the `pont` gateway.
//! It is not intended for production use.
//!
//! It also compiles `pont.testing`, a set of message shapes (maps, oneofs, recursive and
//! well-known types) used to exercise JSON template generation.

pub mod pb {
    include!(concat!(env!("OUT_DIR"), "/grpc.testing.rs"));
}

pub mod shapes {
    include!(concat!(env!("OUT_DIR"), "/pont.testing.rs"));
}

pub use pb::test_service_server::{TestService, TestServiceServer};
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("descriptors");
