//! Reference Detector (spec §4.B): classifies schema fields as references to
//! other resources, in four priority-ordered layers, keeping only the
//! single highest-confidence hit per field.

use heck::ToUpperCamelCase;
use kubegraph_model::{DetectionMethod, FieldDefinition, RefType, ReferenceField, ReferencePattern, ResourceSchema};
use regex::Regex;
use std::collections::HashMap;

const DESCRIPTION_TRIGGERS: &[&str] = &[
    "reference to",
    "references",
    "refers to",
    "points to",
    "name of the",
    "identifier of",
    "id of",
];

const NAME_SUFFIXES: &[&str] = &["ref", "reference", "id", "name"];
const NAME_PREFIXES: &[&str] = &["target", "source", "parent", "owner"];

/// Built-in kind lexicon consulted when a matching pattern doesn't name a
/// target kind explicitly (§4.B "built-in kind lexicon").
fn builtin_kind_lexicon() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("configmap", "ConfigMap"),
        ("secret", "Secret"),
        ("service", "Service"),
        ("serviceaccount", "ServiceAccount"),
        ("pvc", "PersistentVolumeClaim"),
        ("persistentvolumeclaim", "PersistentVolumeClaim"),
        ("kubecluster", "KubeCluster"),
        ("kubenv", "KubEnv"),
        ("githubprovider", "GithubProvider"),
        ("providerconfig", "ProviderConfig"),
    ])
}

#[derive(Debug, Clone, Default)]
pub struct DetectorStats {
    pub fields_analyzed: usize,
    pub references_found: usize,
    pub pattern_matches: usize,
    pub heuristic_matches: usize,
}

pub struct ReferenceDetector {
    patterns: Vec<ReferencePattern>,
    lexicon: HashMap<&'static str, &'static str>,
}

impl ReferenceDetector {
    pub fn new(patterns: Vec<ReferencePattern>) -> Self {
        Self {
            patterns,
            lexicon: builtin_kind_lexicon(),
        }
    }

    /// Walks every field in `schema` and returns the detected references
    /// plus the run's statistics.
    pub fn detect(&self, schema: &ResourceSchema) -> (Vec<ReferenceField>, DetectorStats) {
        let mut stats = DetectorStats::default();
        let mut out = Vec::new();

        for (raw_path, field) in schema.walk() {
            stats.fields_analyzed += 1;
            let field_name = last_segment(&raw_path);
            let candidates = self.candidates_for(&raw_path, &field_name, field);
            if let Some(best) = pick_best(candidates) {
                match best.detection_method {
                    DetectionMethod::PatternMatch => stats.pattern_matches += 1,
                    _ => stats.heuristic_matches += 1,
                }
                stats.references_found += 1;
                out.push(best);
            }
        }

        (out, stats)
    }

    fn candidates_for(&self, raw_path: &str, field_name: &str, field: &FieldDefinition) -> Vec<ReferenceField> {
        let field_path = normalize_field_path(raw_path);
        let mut candidates = Vec::new();

        if let Some(rf) = self.pattern_match(&field_path, field_name, field) {
            candidates.push(rf);
        }
        if let Some(rf) = description_heuristic(&field_path, field_name, field) {
            candidates.push(rf);
        }
        if let Some(rf) = naming_heuristic(&field_path, field_name, field) {
            candidates.push(rf);
        }
        if let Some(rf) = structure_heuristic(&field_path, field_name, field) {
            candidates.push(rf);
        }

        candidates
    }

    fn pattern_match(&self, field_path: &str, field_name: &str, field: &FieldDefinition) -> Option<ReferenceField> {
        for pattern in &self.patterns {
            if !name_matches(&pattern.pattern, field_name, pattern.is_regex()) {
                continue;
            }
            if !is_type_compatible(field) {
                continue;
            }

            let target_kind = pattern
                .target_kind
                .clone()
                .or_else(|| self.lexicon.get(field_name.to_lowercase().as_str()).map(|s| s.to_string()))
                .or_else(|| infer_kind_from_name(field_name));

            return Some(
                ReferenceField::new(
                    field_path,
                    field_name,
                    pattern.ref_type,
                    pattern.confidence,
                    DetectionMethod::PatternMatch,
                )
                .with_target(target_kind, pattern.target_group.clone(), None),
            );
        }
        None
    }
}

fn pick_best(mut candidates: Vec<ReferenceField>) -> Option<ReferenceField> {
    candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().next()
}

fn description_heuristic(field_path: &str, field_name: &str, field: &FieldDefinition) -> Option<ReferenceField> {
    let description = field.description.as_deref()?.to_lowercase();
    if DESCRIPTION_TRIGGERS.iter().any(|trigger| description.contains(trigger)) {
        return Some(ReferenceField::new(
            field_path,
            field_name,
            RefType::Custom,
            0.7,
            DetectionMethod::DescriptionAnalysis,
        ));
    }
    None
}

fn naming_heuristic(field_path: &str, field_name: &str, _field: &FieldDefinition) -> Option<ReferenceField> {
    let lower = field_name.to_lowercase();
    let suffix_hit = NAME_SUFFIXES.iter().any(|s| lower.ends_with(s));
    let prefix_hit = NAME_PREFIXES.iter().any(|p| lower.starts_with(p));
    if suffix_hit || prefix_hit {
        return Some(ReferenceField::new(
            field_path,
            field_name,
            RefType::Custom,
            0.6,
            DetectionMethod::NamingHeuristic,
        ));
    }
    None
}

fn structure_heuristic(field_path: &str, field_name: &str, field: &FieldDefinition) -> Option<ReferenceField> {
    if is_reference_shaped_object(field) {
        return Some(ReferenceField::new(
            field_path,
            field_name,
            RefType::Custom,
            0.8,
            DetectionMethod::StructureAnalysis,
        ));
    }
    None
}

fn is_reference_shaped_object(field: &FieldDefinition) -> bool {
    field.field_type == kubegraph_model::FieldType::Object && field.properties.contains_key("name")
}

fn is_type_compatible(field: &FieldDefinition) -> bool {
    match field.field_type {
        kubegraph_model::FieldType::String => true,
        kubegraph_model::FieldType::Object => is_reference_shaped_object(field),
        _ => false,
    }
}

fn name_matches(pattern: &str, field_name: &str, as_regex: bool) -> bool {
    if as_regex {
        return Regex::new(&format!("(?i){pattern}"))
            .map(|re| re.is_match(field_name))
            .unwrap_or(false);
    }
    glob_match_case_insensitive(pattern, field_name)
}

/// Simple glob matcher supporting `*` and `?`, case-insensitive, with a
/// literal-equality fallback when the pattern has no wildcard.
fn glob_match_case_insensitive(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();
    glob_match(pattern.as_bytes(), text.as_bytes())
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

fn infer_kind_from_name(field_name: &str) -> Option<String> {
    let stripped = field_name
        .strip_suffix("Ref")
        .or_else(|| field_name.strip_suffix("ref"))?;
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_upper_camel_case())
}

fn last_segment(path: &str) -> String {
    path.rsplit(['.', '[']).next().unwrap_or(path).trim_end_matches(']').trim_end_matches('*').to_string()
}

/// Kubernetes-convention field-path normalization (§4.B): a bare root-level
/// field name (no dot, no array marker) is prefixed with `spec.` since
/// reference fields conventionally live under a resource's spec.
fn normalize_field_path(path: &str) -> String {
    if !path.contains('.') && !path.contains('[') {
        format!("spec.{path}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubegraph_model::FieldType;

    fn kube_cluster_schema() -> ResourceSchema {
        let mut provider_config_ref = FieldDefinition::scalar(FieldType::String);
        provider_config_ref.description = Some("reference to the ProviderConfig".into());

        let mut github_provider_ref = FieldDefinition::scalar(FieldType::String);
        github_provider_ref.description = Some("name of the GithubProvider".into());

        let mut kub_env_ref = FieldDefinition::scalar(FieldType::String);
        kub_env_ref.description = Some("identifier of the KubEnv".into());

        let mut region = FieldDefinition::scalar(FieldType::String);
        region.required = true;

        let mut root = FieldDefinition::scalar(FieldType::Object);
        root.properties.insert("region".into(), region);
        root.properties.insert("providerConfigRef".into(), provider_config_ref);
        root.properties.insert("githubProviderRef".into(), github_provider_ref);
        root.properties.insert("kubEnvRef".into(), kub_env_ref);

        ResourceSchema::new(root)
    }

    fn patterns() -> Vec<ReferencePattern> {
        vec![
            ReferencePattern {
                pattern: "githubProviderRef".into(),
                target_kind: Some("GithubProvider".into()),
                target_group: Some("github.platform.kubecore.io".into()),
                ref_type: RefType::Custom,
                confidence: 0.95,
            },
            ReferencePattern {
                pattern: "kubEnvRef".into(),
                target_kind: Some("KubEnv".into()),
                target_group: None,
                ref_type: RefType::Custom,
                confidence: 0.9,
            },
            ReferencePattern {
                pattern: "*ConfigRef".into(),
                target_kind: None,
                target_group: None,
                ref_type: RefType::Custom,
                confidence: 0.85,
            },
        ]
    }

    #[test]
    fn kube_cluster_scenario_detects_three_refs_above_threshold() {
        let detector = ReferenceDetector::new(patterns());
        let (refs, stats) = detector.detect(&kube_cluster_schema());

        let by_name: HashMap<_, _> = refs.iter().map(|r| (r.field_name.clone(), r)).collect();

        let provider = by_name.get("providerConfigRef").expect("providerConfigRef detected");
        assert!(provider.confidence >= 0.85);

        let github = by_name.get("githubProviderRef").expect("githubProviderRef detected");
        assert!(github.confidence >= 0.9);
        assert_eq!(github.target_kind.as_deref(), Some("GithubProvider"));
        assert_eq!(github.target_group.as_deref(), Some("github.platform.kubecore.io"));

        let kubenv = by_name.get("kubEnvRef").expect("kubEnvRef detected");
        assert!(kubenv.confidence >= 0.9);
        assert_eq!(kubenv.target_kind.as_deref(), Some("KubEnv"));

        assert!(stats.references_found >= 3);
        assert!(stats.fields_analyzed >= 4);
    }

    #[test]
    fn nested_array_reference_gets_bracketed_field_path() {
        let mut config_map_ref = FieldDefinition::scalar(FieldType::String);
        config_map_ref.description = None;
        let mut container = FieldDefinition::scalar(FieldType::Object);
        container.properties.insert("configMapRef".into(), config_map_ref);
        let mut containers = FieldDefinition::scalar(FieldType::Array);
        containers.items = Some(Box::new(container));
        let mut spec = FieldDefinition::scalar(FieldType::Object);
        spec.properties.insert("containers".into(), containers);
        let mut root = FieldDefinition::scalar(FieldType::Object);
        root.properties.insert("spec".into(), spec);

        let detector = ReferenceDetector::new(vec![ReferencePattern {
            pattern: "configMapRef".into(),
            target_kind: Some("ConfigMap".into()),
            target_group: None,
            ref_type: RefType::ConfigMap,
            confidence: 0.9,
        }]);

        let (refs, _) = detector.detect(&ResourceSchema::new(root));
        let hit = refs
            .iter()
            .find(|r| r.field_name == "configMapRef")
            .expect("configMapRef detected");
        assert_eq!(hit.field_path, "spec.containers[*].configMapRef");
        assert_eq!(hit.ref_type, RefType::ConfigMap);
        assert_eq!(hit.target_kind.as_deref(), Some("ConfigMap"));
    }

    #[test]
    fn structure_heuristic_requires_a_name_property() {
        let mut owner = FieldDefinition::scalar(FieldType::Object);
        owner.properties.insert("name".into(), FieldDefinition::scalar(FieldType::String));
        owner.properties.insert("kind".into(), FieldDefinition::scalar(FieldType::String));

        let mut plain = FieldDefinition::scalar(FieldType::Object);
        plain.properties.insert("value".into(), FieldDefinition::scalar(FieldType::String));

        let mut root = FieldDefinition::scalar(FieldType::Object);
        root.properties.insert("parentObject".into(), owner);
        root.properties.insert("settings".into(), plain);

        let detector = ReferenceDetector::new(vec![]);
        let (refs, _) = detector.detect(&ResourceSchema::new(root));

        assert!(refs.iter().any(|r| r.field_name == "parentObject" && r.detection_method == DetectionMethod::StructureAnalysis));
        assert!(!refs.iter().any(|r| r.field_name == "settings"));
    }

    #[test]
    fn naming_heuristic_catches_prefixed_and_suffixed_fields() {
        let mut root = FieldDefinition::scalar(FieldType::Object);
        root.properties.insert("targetCluster".into(), FieldDefinition::scalar(FieldType::String));
        root.properties.insert("unrelatedValue".into(), FieldDefinition::scalar(FieldType::String));

        let detector = ReferenceDetector::new(vec![]);
        let (refs, _) = detector.detect(&ResourceSchema::new(root));

        assert!(refs.iter().any(|r| r.field_name == "targetCluster"));
        assert!(!refs.iter().any(|r| r.field_name == "unrelatedValue"));
    }

    #[test]
    fn glob_pattern_matches_case_insensitively() {
        assert!(glob_match_case_insensitive("*Ref", "providerConfigREF"));
        assert!(!glob_match_case_insensitive("*Ref", "providerConfig"));
    }
}
