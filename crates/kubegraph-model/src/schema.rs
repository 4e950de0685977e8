use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The inferred JSON-Schema-ish primitive kind of a field, per the
/// type-inference rules in spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl Default for FieldType {
    fn default() -> Self {
        // §3: "default fallback = string"
        FieldType::String
    }
}

/// A single node in the recursive field tree produced by the schema parser
/// (§4.A). Children are owned by their parent; the whole tree is dropped as
/// a unit when the owning `ResourceSchema` is dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub field_type: FieldType,
    pub format: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub enum_values: Vec<String>,
    pub pattern: Option<String>,
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub required: bool,
    /// Insertion-ordered so that field enumeration during detection and
    /// diagnostics is deterministic for a given schema document.
    #[serde(default)]
    pub properties: IndexMap<String, FieldDefinition>,
    pub items: Option<Box<FieldDefinition>>,
}

impl FieldDefinition {
    pub fn scalar(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Default::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.properties.is_empty() && self.items.is_none()
    }
}

/// A parsed OpenAPI v3 schema, rooted at a CRD version's `spec`/`status`
/// subtree (or whatever subtree the parser was handed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub root: FieldDefinition,
}

impl ResourceSchema {
    pub fn new(root: FieldDefinition) -> Self {
        Self { root }
    }

    /// Depth-first iterator over every field in the tree along with its
    /// dotted/`[*]` field path (see spec §4.B field-path construction).
    pub fn walk(&self) -> Vec<(String, &FieldDefinition)> {
        let mut out = Vec::new();
        walk_into("", &self.root, &mut out);
        out
    }
}

fn walk_into<'a>(prefix: &str, field: &'a FieldDefinition, out: &mut Vec<(String, &'a FieldDefinition)>) {
    for (name, child) in &field.properties {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        out.push((path.clone(), child));
        walk_into(&path, child, out);
        if let Some(items) = &child.items {
            let item_path = format!("{path}[*]");
            walk_into(&item_path, items, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_field_type_falls_back_to_string() {
        assert_eq!(FieldType::default(), FieldType::String);
    }

    #[test]
    fn walk_builds_dotted_and_bracketed_paths() {
        let mut containers_item = FieldDefinition::scalar(FieldType::Object);
        containers_item
            .properties
            .insert("configMapRef".to_string(), FieldDefinition::scalar(FieldType::String));

        let mut containers = FieldDefinition::scalar(FieldType::Array);
        containers.items = Some(Box::new(containers_item));

        let mut root = FieldDefinition::scalar(FieldType::Object);
        root.properties.insert("containers".to_string(), containers);

        let schema = ResourceSchema::new(root);
        let paths: Vec<_> = schema.walk().into_iter().map(|(p, _)| p).collect();
        assert!(paths.contains(&"containers".to_string()));
        assert!(paths.contains(&"containers[*].configMapRef".to_string()));
    }
}
