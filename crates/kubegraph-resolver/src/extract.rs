//! Reference value extraction (spec §4.E step 2): pulls the actual target
//! identity out of a source object at a detected reference's field path.

use kubegraph_model::{DetectionMethod, ReferenceField};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRef {
    pub name: String,
    pub namespace: Option<String>,
    pub kind: Option<String>,
    pub api_version: Option<String>,
}

enum Segment {
    Key(String),
    Wildcard,
}

fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(stripped) = part.strip_suffix("[*]") {
            if !stripped.is_empty() {
                segments.push(Segment::Key(stripped.to_string()));
            }
            segments.push(Segment::Wildcard);
        } else {
            segments.push(Segment::Key(part.to_string()));
        }
    }
    segments
}

fn navigate_all<'a>(root: &'a Value, segments: &[Segment]) -> Vec<&'a Value> {
    let mut current = vec![root];
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match segment {
                Segment::Key(key) => {
                    if let Some(child) = value.get(key) {
                        next.push(child);
                    }
                }
                Segment::Wildcard => {
                    if let Some(array) = value.as_array() {
                        next.extend(array.iter());
                    }
                }
            }
        }
        current = next;
    }
    current
}

/// Accepted shapes (§4.E step 2): bare string, `{name[, namespace]}`
/// object, or (handled separately) an owner reference slot.
fn shape_to_ref(value: &Value, source_namespace: Option<&str>) -> Option<ExtractedRef> {
    match value {
        Value::String(name) => Some(ExtractedRef {
            name: name.clone(),
            namespace: source_namespace.map(str::to_string),
            kind: None,
            api_version: None,
        }),
        Value::Object(_) => {
            let name = value.get("name")?.as_str()?.to_string();
            let namespace = value
                .get("namespace")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| source_namespace.map(str::to_string));
            let kind = value.get("kind").and_then(|v| v.as_str()).map(str::to_string);
            let api_version = value.get("apiVersion").and_then(|v| v.as_str()).map(str::to_string);
            Some(ExtractedRef { name, namespace, kind, api_version })
        }
        _ => None,
    }
}

/// Owner reference slot: take the first owner's `name` and its embedded
/// `apiVersion`/`kind` (§4.E step 2).
fn extract_owner_reference(source: &Value, source_namespace: Option<&str>) -> Option<ExtractedRef> {
    let owners = source.get("metadata")?.get("ownerReferences")?.as_array()?;
    let first = owners.first()?;
    let name = first.get("name")?.as_str()?.to_string();
    let kind = first.get("kind").and_then(|v| v.as_str()).map(str::to_string);
    let api_version = first.get("apiVersion").and_then(|v| v.as_str()).map(str::to_string);
    Some(ExtractedRef {
        name,
        namespace: source_namespace.map(str::to_string),
        kind,
        api_version,
    })
}

/// Extracts every reference value a detected field yields from `source`.
/// A plain scalar field yields at most one; a field path crossing an
/// array wildcard (e.g. `spec.containers[*].configMapRef`) can yield one
/// per array element.
pub fn extract_reference_values(source: &Value, field: &ReferenceField, source_namespace: Option<&str>) -> Vec<ExtractedRef> {
    if field.detection_method == DetectionMethod::OwnerReference {
        return extract_owner_reference(source, source_namespace).into_iter().collect();
    }
    let segments = parse_path(&field.field_path);
    navigate_all(source, &segments)
        .into_iter()
        .filter_map(|value| shape_to_ref(value, source_namespace))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubegraph_model::RefType;
    use serde_json::json;

    fn field(path: &str, method: DetectionMethod) -> ReferenceField {
        ReferenceField::new(path, "ref", RefType::Custom, 0.9, method)
    }

    #[test]
    fn extracts_bare_string_with_source_namespace() {
        let source = json!({"spec": {"providerConfigRef": "my-provider"}});
        let refs = extract_reference_values(&source, &field("spec.providerConfigRef", DetectionMethod::PatternMatch), Some("default"));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "my-provider");
        assert_eq!(refs[0].namespace.as_deref(), Some("default"));
    }

    #[test]
    fn extracts_explicit_namespace_from_object_shape() {
        let source = json!({"spec": {"parent": {"name": "x", "namespace": "other", "kind": "Widget"}}});
        let refs = extract_reference_values(&source, &field("spec.parent", DetectionMethod::StructureAnalysis), Some("default"));
        assert_eq!(refs[0].namespace.as_deref(), Some("other"));
        assert_eq!(refs[0].kind.as_deref(), Some("Widget"));
    }

    #[test]
    fn extracts_every_array_element_across_a_wildcard() {
        let source = json!({"spec": {"containers": [
            {"configMapRef": "cm-a"},
            {"configMapRef": "cm-b"}
        ]}});
        let refs = extract_reference_values(
            &source,
            &field("spec.containers[*].configMapRef", DetectionMethod::PatternMatch),
            Some("default"),
        );
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "cm-a");
        assert_eq!(refs[1].name, "cm-b");
    }

    #[test]
    fn owner_reference_slot_takes_the_first_owner() {
        let source = json!({
            "metadata": {
                "ownerReferences": [
                    {"apiVersion": "platform.kubecore.io/v1", "kind": "KubeCluster", "name": "prod"},
                    {"apiVersion": "v1", "kind": "Secret", "name": "ignored"}
                ]
            }
        });
        let refs = extract_reference_values(&source, &field("metadata.ownerReferences", DetectionMethod::OwnerReference), Some("default"));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "prod");
        assert_eq!(refs[0].kind.as_deref(), Some("KubeCluster"));
    }
}
