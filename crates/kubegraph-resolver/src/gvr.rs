//! Group-Version-Resource construction (spec §4.E step 3): look up the
//! plural form from a registry seeded by discovery; fall back to an
//! English pluralization rule set plus a built-in special-case table.

use kubegraph_model::Gvr;
use std::collections::HashMap;

/// Special cases the regular pluralization rules get wrong, covering
/// Kubernetes core kinds and this platform's own CRDs (§4.E "a built-in
/// special-case table for Kubernetes core and platform kinds").
fn special_case_plurals() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("Endpoints", "endpoints"),
        ("NetworkPolicy", "networkpolicies"),
        ("Ingress", "ingresses"),
        ("StorageClass", "storageclasses"),
        ("PriorityClass", "priorityclasses"),
        ("PodSecurityPolicy", "podsecuritypolicies"),
        ("GithubProvider", "githubproviders"),
        ("KubEnv", "kubenvs"),
        ("KubeCluster", "kubeclusters"),
        ("ProviderConfig", "providerconfigs"),
    ])
}

/// English pluralization rule set from spec §4.E step 3: `-y -> -ies`,
/// `-s/-x/-z -> -es`, `-ch/-sh -> -es`, default `+s`.
pub fn pluralize(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if let Some(stem) = lower.strip_suffix('y') {
        if !ends_with_vowel_before_y(&lower) {
            return format!("{stem}ies");
        }
    }
    if lower.ends_with("ch") || lower.ends_with("sh") {
        return format!("{lower}es");
    }
    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with('z') {
        return format!("{lower}es");
    }
    format!("{lower}s")
}

fn ends_with_vowel_before_y(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    if bytes.len() < 2 {
        return false;
    }
    matches!(bytes[bytes.len() - 2], b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Cluster-scoped core kinds, consulted when discovery hasn't told us a
/// kind's scope (§4.E step 4: "Namespaced resources use `Namespace(ns).Get`;
/// cluster-scoped use `Get`").
const CLUSTER_SCOPED_CORE_KINDS: &[&str] = &[
    "Namespace",
    "Node",
    "PersistentVolume",
    "ClusterRole",
    "ClusterRoleBinding",
    "StorageClass",
    "PriorityClass",
    "CustomResourceDefinition",
];

/// Seeded by CRD discovery (`kind`/`group` -> plural + scope) so real
/// discovered CRDs always use their declared plural and scope; unknown
/// kinds fall back to the special-case table, then the regular
/// pluralization rules and the core cluster-scoped kind list.
#[derive(Debug, Clone, Default)]
pub struct PluralRegistry {
    known: HashMap<(String, String), (String, bool)>,
}

impl PluralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, group: impl Into<String>, kind: impl Into<String>, plural: impl Into<String>, namespaced: bool) {
        self.known.insert((group.into(), kind.into()), (plural.into(), namespaced));
    }

    pub fn resolve(&self, group: &str, kind: &str) -> String {
        if let Some((plural, _)) = self.known.get(&(group.to_string(), kind.to_string())) {
            return plural.clone();
        }
        let specials = special_case_plurals();
        if let Some(plural) = specials.get(kind) {
            return plural.to_string();
        }
        pluralize(kind)
    }

    pub fn is_namespaced(&self, group: &str, kind: &str) -> bool {
        if let Some((_, namespaced)) = self.known.get(&(group.to_string(), kind.to_string())) {
            return *namespaced;
        }
        !CLUSTER_SCOPED_CORE_KINDS.contains(&kind)
    }

    pub fn build_gvr(&self, group: &str, version: &str, kind: &str) -> Gvr {
        Gvr::new(group, version, self.resolve(group, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralize_handles_the_documented_suffix_rules() {
        assert_eq!(pluralize("Policy"), "policies");
        assert_eq!(pluralize("Bus"), "buses");
        assert_eq!(pluralize("Box"), "boxes");
        assert_eq!(pluralize("Match"), "matches");
        assert_eq!(pluralize("Dish"), "dishes");
        assert_eq!(pluralize("ConfigMap"), "configmaps");
        assert_eq!(pluralize("Day"), "days"); // vowel before y: no -ies
    }

    #[test]
    fn registry_prefers_discovered_plural_over_heuristics() {
        let mut registry = PluralRegistry::new();
        registry.register("platform.kubecore.io", "KubeCluster", "kubeclusters", true);
        assert_eq!(registry.resolve("platform.kubecore.io", "KubeCluster"), "kubeclusters");
        assert_eq!(registry.resolve("other.io", "KubeCluster"), "kubeclusters"); // special case table
    }

    #[test]
    fn registry_falls_back_to_pluralization_for_unknown_kinds() {
        let registry = PluralRegistry::new();
        assert_eq!(registry.resolve("example.com", "Widget"), "widgets");
    }

    #[test]
    fn cluster_scoped_core_kinds_are_not_namespaced_by_default() {
        let registry = PluralRegistry::new();
        assert!(!registry.is_namespaced("", "Namespace"));
        assert!(registry.is_namespaced("", "ConfigMap"));
    }
}
