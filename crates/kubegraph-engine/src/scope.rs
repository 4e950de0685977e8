//! Scope filter (spec §4.F): decides resource and reference admission.
//! Every exclusion increments a named reason counter for diagnostics, and
//! the decision is a pure function of the candidate and the configured
//! rules (§8 P8 "Scope filter idempotence: `filter(filter(X)) = filter(X)`").

use crate::config::ScopeFilterConfig;
use glob::{MatchOptions, Pattern};
use std::collections::HashMap;
use std::sync::Mutex;

const MATCH_OPTS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

fn glob_match(pattern: &str, value: &str) -> bool {
    Pattern::new(pattern).map(|p| p.matches_with(value, MATCH_OPTS)).unwrap_or(false)
}

/// The identity facts a scope decision needs about a candidate resource.
#[derive(Debug, Clone, Copy)]
pub struct ScopeCandidate<'a> {
    pub api_group: &'a str,
    pub kind: &'a str,
    pub namespace: Option<&'a str>,
}

pub struct ScopeFilter {
    config: ScopeFilterConfig,
    exclusion_reasons: Mutex<HashMap<&'static str, usize>>,
}

impl ScopeFilter {
    pub fn new(config: ScopeFilterConfig) -> Self {
        Self {
            config,
            exclusion_reasons: Mutex::new(HashMap::new()),
        }
    }

    /// §3 GLOSSARY "Platform resource": API group matches a configured
    /// platform glob, or kind is in the platform kind set.
    pub fn is_platform(&self, api_group: &str, kind: &str) -> bool {
        self.config.platform_kinds.iter().any(|k| k.eq_ignore_ascii_case(kind))
            || self.config.platform_api_group_patterns.iter().any(|p| glob_match(p, api_group))
    }

    /// Resource admission: §4.F's `platformOnly` / include-exclude API
    /// group, kind, and namespace rules, in the order the spec lists them.
    /// Returns the first violated reason, or `Ok(())` if the candidate is
    /// admitted.
    pub fn admit_resource(&self, candidate: &ScopeCandidate<'_>) -> Result<(), &'static str> {
        if self.config.platform_only && !self.is_platform(candidate.api_group, candidate.kind) {
            return self.reject("not_platform");
        }
        if !self.config.include_api_groups.is_empty()
            && !self.config.include_api_groups.iter().any(|p| glob_match(p, candidate.api_group))
        {
            return self.reject("api_group_not_included");
        }
        if self.config.exclude_api_groups.iter().any(|p| glob_match(p, candidate.api_group)) {
            return self.reject("api_group_excluded");
        }
        if !self.config.include_kinds.is_empty() && !self.config.include_kinds.iter().any(|k| k == candidate.kind) {
            return self.reject("kind_not_included");
        }
        if self.config.exclude_kinds.iter().any(|k| k == candidate.kind) {
            return self.reject("kind_excluded");
        }
        if let Some(ns) = candidate.namespace {
            if !self.config.include_namespaces.is_empty() && !self.config.include_namespaces.iter().any(|n| n == ns) {
                return self.reject("namespace_not_included");
            }
            if self.config.exclude_namespaces.iter().any(|n| n == ns) {
                return self.reject("namespace_excluded");
            }
        }
        Ok(())
    }

    /// Reference admission: `crossNamespaceEnabled` (§4.F "when false,
    /// non-owner references whose source and target namespaces differ are
    /// dropped"). Owner references are exempt, matching lifecycle-ownership
    /// semantics that ignore namespace scoping elsewhere in the spec.
    pub fn admit_reference(&self, is_owner_ref: bool, source_namespace: Option<&str>, target_namespace: Option<&str>) -> Result<(), &'static str> {
        if is_owner_ref || self.config.cross_namespace_enabled {
            return Ok(());
        }
        if let (Some(s), Some(t)) = (source_namespace, target_namespace) {
            if s != t {
                return self.reject("cross_namespace_disabled");
            }
        }
        Ok(())
    }

    pub fn exclusion_reasons(&self) -> HashMap<String, usize> {
        self.exclusion_reasons.lock().unwrap().iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn reject(&self, reason: &'static str) -> Result<(), &'static str> {
        *self.exclusion_reasons.lock().unwrap().entry(reason).or_insert(0) += 1;
        Err(reason)
    }
}
