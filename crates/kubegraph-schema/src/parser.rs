//! Schema Parser (spec §4.A): turns an OpenAPI v3 schema subtree into the
//! recursive `ResourceSchema`/`FieldDefinition` tree defined in
//! `kubegraph_model::schema`.
//!
//! Grounded on `kopium`'s `analyzer::analyze` (see `other_examples`), which
//! walks `JSONSchemaProps` the same way, but generalized to a
//! provider-agnostic `serde_json::Value` so this crate never needs to know
//! about `k8s-openapi` types.

use kubegraph_model::{FieldDefinition, FieldType, ResourceSchema};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaParseError {
    #[error("schema input was null")]
    SchemaNil,
    #[error("enum array was present but empty at {0}")]
    EnumEmpty(String),
    #[error("array type declared without items at {0}")]
    ArrayWithoutItems(String),
}

/// Parses OpenAPI v3 schema subtrees into `ResourceSchema`s.
///
/// Idempotent, deterministic, and pure (§4.A contract) except for an
/// internal memoization cache keyed by a content fingerprint, scoped to one
/// `SchemaParser` instance ("used only to avoid reparsing identical
/// subtrees within a single invocation").
#[derive(Debug, Default)]
pub struct SchemaParser {
    cache: HashMap<u64, FieldDefinition>,
    hits: usize,
    misses: usize,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hits(&self) -> usize {
        self.hits
    }

    pub fn cache_misses(&self) -> usize {
        self.misses
    }

    /// Parses the root of a schema subtree (e.g. a CRD version's `spec`).
    pub fn parse(&mut self, schema: &serde_json::Value) -> Result<ResourceSchema, SchemaParseError> {
        if schema.is_null() {
            return Err(SchemaParseError::SchemaNil);
        }
        let root = self.parse_field("$", schema)?;
        Ok(ResourceSchema::new(root))
    }

    fn parse_field(&mut self, path: &str, node: &serde_json::Value) -> Result<FieldDefinition, SchemaParseError> {
        let key = fingerprint(node);
        if let Some(cached) = self.cache.get(&key) {
            self.hits += 1;
            return Ok(cached.clone());
        }
        self.misses += 1;

        let field_type = infer_type(node);
        let description = node.get("description").and_then(|v| v.as_str()).map(str::to_string);
        let format = node.get("format").and_then(|v| v.as_str()).map(str::to_string);
        let pattern = node.get("pattern").and_then(|v| v.as_str()).map(str::to_string);

        let enum_values = match node.get("enum") {
            Some(serde_json::Value::Array(values)) => {
                if values.is_empty() {
                    return Err(SchemaParseError::EnumEmpty(path.to_string()));
                }
                values.iter().map(stringify_literal).collect()
            }
            Some(_) | None => Vec::new(),
        };

        let default = node.get("default").cloned();

        let required: std::collections::HashSet<String> = node
            .get("required")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
            .unwrap_or_default();

        let mut properties = indexmap::IndexMap::new();
        if let Some(serde_json::Value::Object(props)) = node.get("properties") {
            for (name, child) in props {
                let child_path = format!("{path}.{name}");
                match self.parse_field(&child_path, child) {
                    Ok(mut child_field) => {
                        child_field.required = required.contains(name);
                        properties.insert(name.clone(), child_field);
                    }
                    Err(err) => {
                        tracing::debug!(field = %child_path, error = %err, "skipping malformed schema subfield");
                    }
                }
            }
        }

        let items = match node.get("items") {
            Some(items_node) if !items_node.is_null() => {
                match self.parse_field(&format!("{path}[*]"), items_node) {
                    Ok(item_field) => Some(Box::new(item_field)),
                    Err(err) => {
                        tracing::debug!(field = %path, error = %err, "skipping malformed array items schema");
                        None
                    }
                }
            }
            _ => {
                if field_type == FieldType::Array {
                    return Err(SchemaParseError::ArrayWithoutItems(path.to_string()));
                }
                None
            }
        };

        let field = FieldDefinition {
            field_type,
            format,
            description,
            enum_values,
            pattern,
            default,
            required: false,
            properties,
            items,
        };

        self.cache.insert(key, field.clone());
        Ok(field)
    }
}

fn stringify_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Type-inference rules from spec §3: explicit `type` wins; else `properties`
/// implies object; `items` implies array; `enum` without type implies
/// string; specific formats narrow integer/number; everything else falls
/// back to string.
fn infer_type(node: &serde_json::Value) -> FieldType {
    if let Some(explicit) = node.get("type").and_then(|v| v.as_str()) {
        if let Some(t) = parse_explicit_type(explicit) {
            return t;
        }
    }
    if matches!(node.get("properties"), Some(serde_json::Value::Object(_))) {
        return FieldType::Object;
    }
    if node.get("items").is_some() {
        return FieldType::Array;
    }
    if matches!(node.get("enum"), Some(serde_json::Value::Array(_))) {
        return FieldType::String;
    }
    if let Some(format) = node.get("format").and_then(|v| v.as_str()) {
        match format {
            "int32" | "int64" => return FieldType::Integer,
            "float" | "double" => return FieldType::Number,
            "date" | "date-time" | "email" | "uri" | "uuid" | "byte" | "binary" => return FieldType::String,
            _ => {}
        }
    }
    FieldType::default()
}

fn parse_explicit_type(raw: &str) -> Option<FieldType> {
    match raw {
        "string" => Some(FieldType::String),
        "integer" => Some(FieldType::Integer),
        "number" => Some(FieldType::Number),
        "boolean" => Some(FieldType::Boolean),
        "array" => Some(FieldType::Array),
        "object" => Some(FieldType::Object),
        "null" => Some(FieldType::Null),
        _ => None,
    }
}

/// Content fingerprint used as the memoization cache key: a hash of
/// `(type, |properties|, |required|, |description|)` plus the recursive
/// serialized content, per spec §4.A.
fn fingerprint(node: &serde_json::Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    node.to_string().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_schema_is_rejected() {
        let mut parser = SchemaParser::new();
        assert_eq!(parser.parse(&serde_json::Value::Null), Err(SchemaParseError::SchemaNil));
    }

    #[test]
    fn empty_enum_array_is_an_error_but_does_not_abort_siblings() {
        let mut parser = SchemaParser::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "broken": { "type": "string", "enum": [] },
                "fine": { "type": "string" }
            }
        });
        let parsed = parser.parse(&schema).unwrap();
        assert!(!parsed.root.properties.contains_key("broken"));
        assert!(parsed.root.properties.contains_key("fine"));
    }

    #[test]
    fn array_without_items_is_rejected_for_that_field_only() {
        let mut parser = SchemaParser::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "items_missing": { "type": "array" },
                "ok": { "type": "array", "items": { "type": "string" } }
            }
        });
        let parsed = parser.parse(&schema).unwrap();
        assert!(!parsed.root.properties.contains_key("items_missing"));
        assert!(parsed.root.properties.contains_key("ok"));
    }

    #[test]
    fn format_infers_integer_and_number() {
        let mut parser = SchemaParser::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "port": { "format": "int32" },
                "ratio": { "format": "double" },
                "id": { "format": "uuid" }
            }
        });
        let parsed = parser.parse(&schema).unwrap();
        assert_eq!(parsed.root.properties["port"].field_type, FieldType::Integer);
        assert_eq!(parsed.root.properties["ratio"].field_type, FieldType::Number);
        assert_eq!(parsed.root.properties["id"].field_type, FieldType::String);
    }

    #[test]
    fn enum_without_explicit_type_is_string() {
        let mut parser = SchemaParser::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "phase": { "enum": ["Pending", "Running", "Failed"] }
            }
        });
        let parsed = parser.parse(&schema).unwrap();
        assert_eq!(parsed.root.properties["phase"].field_type, FieldType::String);
        assert_eq!(parsed.root.properties["phase"].enum_values.len(), 3);
    }

    #[test]
    fn required_list_is_attributed_to_named_children() {
        let mut parser = SchemaParser::new();
        let schema = json!({
            "type": "object",
            "required": ["region"],
            "properties": {
                "region": { "type": "string" },
                "providerConfigRef": { "type": "string" }
            }
        });
        let parsed = parser.parse(&schema).unwrap();
        assert!(parsed.root.properties["region"].required);
        assert!(!parsed.root.properties["providerConfigRef"].required);
    }

    #[test]
    fn reparsing_identical_subtree_hits_cache() {
        let mut parser = SchemaParser::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "type": "string" },
                "b": { "type": "string" }
            }
        });
        parser.parse(&schema).unwrap();
        let misses_after_first = parser.cache_misses();
        parser.parse(&schema).unwrap();
        assert!(parser.cache_hits() > 0);
        assert_eq!(parser.cache_misses(), misses_after_first);
    }
}
