//! # Metadata Carrier
//!
//! [`Metadata`] maps lower-cased header names to the ordered list of their values. It is
//! built fresh for every inbound call from the HTTP headers and attached, unchanged, to the
//! outgoing gRPC request.
//!
//! Not every HTTP header can travel as gRPC metadata: connection-specific headers are
//! forbidden by HTTP/2 and a few names are owned by the gRPC transport itself. Those are
//! skipped by [`Metadata::to_grpc`]. Keys with the `-bin` suffix carry base64 text in HTTP
//! and are sent as binary metadata.
use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use http::HeaderMap;
use std::collections::BTreeMap;
use std::str::FromStr;
use tonic::metadata::{
    AsciiMetadataKey, AsciiMetadataValue, BinaryMetadataKey, BinaryMetadataValue, KeyAndValueRef,
    MetadataMap,
    errors::{InvalidMetadataKey, InvalidMetadataValue},
};

/// Base64 for binary metadata. gRPC peers may omit the padding.
const BINARY_VALUE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Headers that never become gRPC metadata.
const SKIPPED_HEADERS: &[&str] = &[
    // connection-specific, rejected by HTTP/2
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
    "te",
    // owned by the gRPC transport
    "content-type",
    "user-agent",
    "grpc-timeout",
    "grpc-status",
    "grpc-message",
    "grpc-encoding",
    "grpc-accept-encoding",
];

#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidValue {
        key: String,
        source: InvalidMetadataValue,
    },
    #[error("Binary metadata value for key '{key}' is not valid base64: '{source}'")]
    InvalidBinaryValue {
        key: String,
        source: base64::DecodeError,
    },
}

/// Header-like metadata: lower-cased names, each with one or more ordered values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to `key`. The key is normalized to lower case.
    pub fn append(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .entry(key.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Returns every value stored under `key`, in insertion order.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collects all inbound HTTP headers.
    ///
    /// Values that are not visible ASCII can't be text metadata. They are base64 encoded under
    /// the header name with a `-bin` suffix and travel as binary metadata.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut metadata = Self::new();

        for (name, value) in headers {
            match value.to_str() {
                Ok(value) => metadata.append(name.as_str(), value),
                Err(_) if name.as_str().ends_with("-bin") => {
                    tracing::debug!(header = %name, "skipping binary header that is not base64")
                }
                Err(_) => metadata.append(
                    format!("{}-bin", name.as_str()),
                    BINARY_VALUE.encode(value.as_bytes()),
                ),
            }
        }

        metadata
    }

    /// Builds the gRPC metadata attached to an outgoing call.
    pub fn to_grpc(&self) -> Result<MetadataMap, MetadataError> {
        let mut map = MetadataMap::new();

        for (key, values) in self.iter() {
            if SKIPPED_HEADERS.contains(&key) {
                continue;
            }

            if key.ends_with("-bin") {
                let metadata_key = BinaryMetadataKey::from_bytes(key.as_bytes()).map_err(
                    |source| MetadataError::InvalidKey {
                        key: key.to_string(),
                        source,
                    },
                )?;
                for value in values {
                    let bytes = BINARY_VALUE.decode(value.trim()).map_err(|source| {
                        MetadataError::InvalidBinaryValue {
                            key: key.to_string(),
                            source,
                        }
                    })?;
                    map.append_bin(metadata_key.clone(), BinaryMetadataValue::from_bytes(&bytes));
                }
                continue;
            }

            let metadata_key =
                AsciiMetadataKey::from_str(key).map_err(|source| MetadataError::InvalidKey {
                    key: key.to_string(),
                    source,
                })?;
            for value in values {
                let metadata_value = AsciiMetadataValue::from_str(value).map_err(|source| {
                    MetadataError::InvalidValue {
                        key: key.to_string(),
                        source,
                    }
                })?;
                map.append(metadata_key.clone(), metadata_value);
            }
        }

        Ok(map)
    }
}

impl From<&HeaderMap> for Metadata {
    fn from(headers: &HeaderMap) -> Self {
        Self::from_headers(headers)
    }
}

impl From<&MetadataMap> for Metadata {
    /// Collects the text entries of a gRPC metadata map. Binary entries are re-encoded as base64.
    fn from(map: &MetadataMap) -> Self {
        let mut metadata = Self::new();

        for entry in map.iter() {
            match entry {
                KeyAndValueRef::Ascii(key, value) => {
                    if let Ok(value) = value.to_str() {
                        metadata.append(key.as_str(), value);
                    }
                }
                KeyAndValueRef::Binary(key, value) => {
                    if let Ok(bytes) = value.to_bytes() {
                        metadata.append(key.as_str(), BINARY_VALUE.encode(bytes));
                    }
                }
            }
        }

        metadata
    }
}
