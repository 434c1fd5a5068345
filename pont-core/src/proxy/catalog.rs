//! # Introspection Catalog
//!
//! The self-describing document returned by [`super::Proxy::introspect`]: every reachable
//! service with its methods, plus one JSON template per message type those methods use.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionCatalog {
    pub services: Vec<ServiceEntry>,
    /// Unique by `name`. Order is unspecified.
    pub types: Vec<TypeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub methods: Vec<MethodEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodEntry {
    pub name: String,
    /// Fully qualified input type name.
    pub input: String,
    /// Fully qualified output type name.
    pub output: String,
    /// `/{service}/{method}`
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    pub template: serde_json::Value,
}

impl IntrospectionCatalog {
    pub fn service(&self, name: &str) -> Option<&ServiceEntry> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn type_entry(&self, name: &str) -> Option<&TypeEntry> {
        self.types.iter().find(|t| t.name == name)
    }
}
