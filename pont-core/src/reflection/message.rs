//! # Typed Messages
//!
//! JSON conversion for [`DynamicMessage`]s, following the canonical Protobuf JSON mapping
//! implemented by `prost-reflect`.
use crate::error::ProxyError;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};

/// Decodes `input` into a new message of type `descriptor`.
///
/// An empty (or whitespace only) body is treated as `{}`. Unknown fields, malformed JSON and
/// trailing characters are all rejected with `MessageTypeMismatch`.
pub fn decode_json(
    descriptor: MessageDescriptor,
    input: &[u8],
) -> Result<DynamicMessage, ProxyError> {
    let input = if input.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        input
    };

    let mismatch = |err: serde_json::Error| {
        ProxyError::MessageTypeMismatch(format!(
            "input JSON does not match message type {}: {err}",
            descriptor.full_name()
        ))
    };

    let mut deserializer = serde_json::Deserializer::from_slice(input);
    let message = DynamicMessage::deserialize(descriptor.clone(), &mut deserializer)
        .map_err(mismatch)?;
    deserializer.end().map_err(mismatch)?;

    Ok(message)
}

/// Encodes `message` as JSON, leaving out fields that hold their default value.
pub fn encode_json(message: &DynamicMessage) -> Result<Vec<u8>, ProxyError> {
    serde_json::to_vec(message).map_err(|err| {
        ProxyError::Unknown(format!(
            "could not marshal message {} into JSON: {err}",
            message.descriptor().full_name()
        ))
    })
}
