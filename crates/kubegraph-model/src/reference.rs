use serde::{Deserialize, Serialize};

/// The kind of relationship a detected reference represents (§3
/// `ReferenceField.refType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefType {
    OwnerRef,
    ConfigMap,
    Secret,
    Service,
    Pvc,
    Custom,
}

/// How a reference was discovered; carried on both the `ReferenceField` and
/// the resulting graph edge for provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    PatternMatch,
    DescriptionAnalysis,
    NamingHeuristic,
    StructureAnalysis,
    OwnerReference,
}

/// A field the reference detector believes points at another resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceField {
    pub field_path: String,
    pub field_name: String,
    pub target_kind: Option<String>,
    pub target_group: Option<String>,
    pub target_version: Option<String>,
    pub ref_type: RefType,
    /// In `[0, 1]`; enforced by `ReferenceField::new` and validated again by
    /// the traversal engine before an edge is followed (§3 I6).
    pub confidence: f64,
    pub detection_method: DetectionMethod,
}

impl ReferenceField {
    pub fn new(
        field_path: impl Into<String>,
        field_name: impl Into<String>,
        ref_type: RefType,
        confidence: f64,
        detection_method: DetectionMethod,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            field_name: field_name.into(),
            target_kind: None,
            target_group: None,
            target_version: None,
            ref_type,
            confidence: confidence.clamp(0.0, 1.0),
            detection_method,
        }
    }

    pub fn with_target(
        mut self,
        kind: Option<String>,
        group: Option<String>,
        version: Option<String>,
    ) -> Self {
        self.target_kind = kind;
        self.target_group = group;
        self.target_version = version;
        self
    }
}

/// A configured reference-detection rule (§3 `ReferencePattern`). Patterns
/// are tried in the order given; the first match wins for a given field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencePattern {
    /// Glob by default; treated as a regex when it contains `\`, `^`, or `$`.
    pub pattern: String,
    pub target_kind: Option<String>,
    pub target_group: Option<String>,
    pub ref_type: RefType,
    pub confidence: f64,
}

impl ReferencePattern {
    pub fn is_regex(&self) -> bool {
        self.pattern.contains('\\') || self.pattern.contains('^') || self.pattern.contains('$')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        let f = ReferenceField::new("spec.ref", "ref", RefType::Custom, 1.5, DetectionMethod::NamingHeuristic);
        assert_eq!(f.confidence, 1.0);
        let f = ReferenceField::new("spec.ref", "ref", RefType::Custom, -0.2, DetectionMethod::NamingHeuristic);
        assert_eq!(f.confidence, 0.0);
    }

    #[test]
    fn pattern_regex_detection_follows_special_characters() {
        let glob = ReferencePattern {
            pattern: "*Ref".into(),
            target_kind: None,
            target_group: None,
            ref_type: RefType::Custom,
            confidence: 0.8,
        };
        assert!(!glob.is_regex());

        let regex = ReferencePattern {
            pattern: r"^.*Ref$".into(),
            target_kind: None,
            target_group: None,
            ref_type: RefType::Custom,
            confidence: 0.8,
        };
        assert!(regex.is_regex());
    }
}
