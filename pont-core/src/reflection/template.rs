//! # JSON Templates
//!
//! Builds a default-populated JSON example for a message type, following the canonical
//! Protobuf JSON mapping, so that clients can see the shape of a request without having
//! the `.proto` files at hand.
//!
//! Nested and referenced types are expanded through the descriptor pool the message belongs
//! to. Repeated fields get a single element, maps a single entry, and only the first member of
//! each `oneof` is shown. A type that is already being expanded further up is rendered as `{}`
//! to cut recursive schemas.
//!
//! A `google.protobuf.Any` needs a payload type to be valid JSON. It packs an empty
//! `google.protobuf.Empty` when the pool knows that type; otherwise `Any` fields are left out.
use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

const ANY: &str = "google.protobuf.Any";
const EMPTY: &str = "google.protobuf.Empty";

/// Builds the JSON template for `message`.
pub fn make_template(message: &MessageDescriptor) -> Value {
    let mut path = Vec::new();
    message_template(message, &mut path)
}

fn message_template(message: &MessageDescriptor, path: &mut Vec<String>) -> Value {
    if let Some(value) = well_known_template(message) {
        return value;
    }

    if path.iter().any(|name| name == message.full_name()) {
        return Value::Object(Map::new());
    }
    path.push(message.full_name().to_string());

    let mut object = Map::new();
    let mut seen_oneofs = HashSet::new();

    for field in message.fields() {
        if is_unpackable_any(&field) {
            continue;
        }

        if let Some(oneof) = field.containing_oneof()
            && !oneof.is_synthetic()
            && !seen_oneofs.insert(oneof.full_name().to_string())
        {
            continue;
        }

        object.insert(field.json_name().to_string(), field_template(&field, path));
    }

    path.pop();
    Value::Object(object)
}

fn field_template(field: &FieldDescriptor, path: &mut Vec<String>) -> Value {
    if field.is_map() {
        let Kind::Message(entry) = field.kind() else {
            return Value::Object(Map::new());
        };
        let key = map_key_template(&entry.map_entry_key_field().kind());
        let value = kind_template(&entry.map_entry_value_field().kind(), path);

        let mut object = Map::new();
        object.insert(key, value);
        return Value::Object(object);
    }

    let value = kind_template(&field.kind(), path);

    if field.is_list() {
        Value::Array(vec![value])
    } else {
        value
    }
}

fn kind_template(kind: &Kind, path: &mut Vec<String>) -> Value {
    match kind {
        Kind::Double | Kind::Float => json!(0.0),
        Kind::Int32
        | Kind::Sint32
        | Kind::Sfixed32
        | Kind::Uint32
        | Kind::Fixed32 => json!(0),
        // 64 bit integers are strings in the JSON mapping
        Kind::Int64
        | Kind::Sint64
        | Kind::Sfixed64
        | Kind::Uint64
        | Kind::Fixed64 => json!("0"),
        Kind::Bool => json!(false),
        Kind::String | Kind::Bytes => json!(""),
        Kind::Enum(enum_desc) => {
            if enum_desc.full_name() == "google.protobuf.NullValue" {
                Value::Null
            } else {
                json!(enum_desc.default_value().name())
            }
        }
        Kind::Message(message) => message_template(message, path),
    }
}

/// Whether the field holds `Any` values that can't be given a payload.
fn is_unpackable_any(field: &FieldDescriptor) -> bool {
    let kind = match field.kind() {
        Kind::Message(entry) if field.is_map() => entry.map_entry_value_field().kind(),
        kind => kind,
    };

    match kind {
        Kind::Message(message) => message.full_name() == ANY && any_template(&message).is_none(),
        _ => false,
    }
}

fn any_template(any: &MessageDescriptor) -> Option<Value> {
    let empty = any.parent_pool().get_message_by_name(EMPTY)?;

    Some(json!({
        "@type": format!("type.googleapis.com/{}", empty.full_name()),
        "value": {}
    }))
}

fn map_key_template(kind: &Kind) -> String {
    match kind {
        Kind::Bool => "false".to_string(),
        Kind::String => String::new(),
        _ => "0".to_string(),
    }
}

/// Well-known types have their own JSON representation.
fn well_known_template(message: &MessageDescriptor) -> Option<Value> {
    let value = match message.full_name() {
        "google.protobuf.Timestamp" => json!("1970-01-01T00:00:00Z"),
        "google.protobuf.Duration" => json!("0s"),
        "google.protobuf.FieldMask" => json!(""),
        ANY => any_template(message).unwrap_or_else(|| json!({})),
        "google.protobuf.Struct" | EMPTY => json!({}),
        "google.protobuf.ListValue" => json!([]),
        "google.protobuf.Value" => Value::Null,
        "google.protobuf.DoubleValue" | "google.protobuf.FloatValue" => json!(0.0),
        "google.protobuf.Int64Value" | "google.protobuf.UInt64Value" => json!("0"),
        "google.protobuf.Int32Value" | "google.protobuf.UInt32Value" => json!(0),
        "google.protobuf.BoolValue" => json!(false),
        "google.protobuf.StringValue" | "google.protobuf.BytesValue" => json!(""),
        _ => return None,
    };

    Some(value)
}
