//! Live-object schema synthesis (spec §4.F step 1.a): "since CRD schemas may
//! be absent, the resolver also walks the actual object tree to synthesize
//! a lightweight schema when needed". This turns a concrete Kubernetes
//! object's JSON shape into the same `ResourceSchema`/`FieldDefinition` tree
//! [`crate::parser::SchemaParser`] produces from an OpenAPI document, but
//! infers types from the live JSON value kind rather than declared
//! `type`/`format` fields.
//!
//! Deliberately has no cache and no error type: unlike `SchemaParser::parse`
//! this never fails (every `serde_json::Value` has an unambiguous kind) and
//! is cheap enough to redo per object rather than memoize.

use kubegraph_model::{FieldDefinition, FieldType, ResourceSchema};
use serde_json::Value;

/// Caps recursion so a pathological object (or one containing a reference
/// cycle serialized as nested data) can't blow the stack.
const MAX_DEPTH: usize = 16;

/// Synthesizes a [`ResourceSchema`] from a live object's JSON value,
/// rooted to match the shape [`crate::parser::SchemaParser::parse`] would
/// have produced from that object's CRD schema, had one been available.
pub fn synthesize_schema(value: &Value) -> ResourceSchema {
    ResourceSchema::new(synthesize_field(value, 0))
}

fn synthesize_field(value: &Value, depth: usize) -> FieldDefinition {
    let field_type = match value {
        Value::String(_) => FieldType::String,
        Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
        Value::Number(_) => FieldType::Number,
        Value::Bool(_) => FieldType::Boolean,
        Value::Array(_) => FieldType::Array,
        Value::Object(_) => FieldType::Object,
        Value::Null => FieldType::Null,
    };

    let mut field = FieldDefinition::scalar(field_type);
    if depth >= MAX_DEPTH {
        return field;
    }

    match value {
        Value::Object(map) => {
            for (name, child) in map {
                field.properties.insert(name.clone(), synthesize_field(child, depth + 1));
            }
        }
        // Only the first element's shape is sampled: array items are
        // expected to be homogeneous, and the detector only needs one
        // representative `FieldDefinition` to walk per §4.B.
        Value::Array(items) => {
            if let Some(first) = items.first() {
                field.items = Some(Box::new(synthesize_field(first, depth + 1)));
            }
        }
        _ => {}
    }

    field
}
