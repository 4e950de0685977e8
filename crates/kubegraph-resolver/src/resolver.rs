//! Reference Resolver (spec §4.E): given a detected reference field on a
//! source object, fetches the target object(s) it points at.

use crate::cache::TtlCache;
use crate::error::ResolverError;
use crate::extract::{extract_reference_values, ExtractedRef};
use crate::gvr::PluralRegistry;
use kubegraph_client::DynamicClusterClient;
use kubegraph_model::{Gvr, ReferenceField, ResourceRef};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// A reference followed to a concrete target object.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub object: Value,
    pub gvr: Gvr,
    pub target_ref: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    gvr: Gvr,
    namespace: Option<String>,
    name: String,
}

/// Minimum confidence a reference must carry to be followed at all (§3 I6,
/// §4.E step 1). Below this the reference is never even attempted.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

pub struct ReferenceResolver<C> {
    client: Arc<C>,
    plurals: RwLock<PluralRegistry>,
    cache: TtlCache<CacheKey, ResolvedReference>,
    min_confidence: f64,
}

impl<C: DynamicClusterClient> ReferenceResolver<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, PluralRegistry::new(), DEFAULT_MIN_CONFIDENCE, crate::cache::DEFAULT_TTL)
    }

    pub fn with_config(client: Arc<C>, plurals: PluralRegistry, min_confidence: f64, cache_ttl: Duration) -> Self {
        Self {
            client,
            plurals: RwLock::new(plurals),
            cache: TtlCache::new(cache_ttl),
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    pub fn register_plural(&self, group: impl Into<String>, kind: impl Into<String>, plural: impl Into<String>, namespaced: bool) {
        self.plurals.write().unwrap().register(group, kind, plural, namespaced);
    }

    /// Implements §4.E's resolution protocol: validate the reference,
    /// extract its concrete values from `source_object`, build a GVR for
    /// each, and fetch it through the dynamic client — caching hits and
    /// classifying failures via `ResolverError::skip_reason`.
    pub async fn resolve(
        &self,
        source: &ResourceRef,
        source_object: &Value,
        reference: &ReferenceField,
    ) -> Result<Vec<ResolvedReference>, ResolverError> {
        if reference.field_path.is_empty() {
            return Err(ResolverError::InvalidReference {
                field_path: reference.field_path.clone(),
                reason: "empty field path".into(),
            });
        }
        if reference.confidence < self.min_confidence {
            return Err(ResolverError::InvalidReference {
                field_path: reference.field_path.clone(),
                reason: format!("confidence {:.2} below threshold {:.2}", reference.confidence, self.min_confidence),
            });
        }

        let extracted = extract_reference_values(source_object, reference, source.namespace.as_deref());
        if extracted.is_empty() {
            return Err(ResolverError::ExtractionFailed {
                field_path: reference.field_path.clone(),
            });
        }

        let mut resolved = Vec::with_capacity(extracted.len());
        for value in extracted {
            match self.resolve_one(source, reference, &value).await {
                Ok(r) => resolved.push(r),
                Err(err) => {
                    debug!(field_path = %reference.field_path, reason = err.skip_reason(), "reference fetch skipped");
                    return Err(err);
                }
            }
        }
        Ok(resolved)
    }

    async fn resolve_one(&self, source: &ResourceRef, reference: &ReferenceField, extracted: &ExtractedRef) -> Result<ResolvedReference, ResolverError> {
        let kind = extracted
            .kind
            .clone()
            .or_else(|| reference.target_kind.clone())
            .ok_or_else(|| ResolverError::InvalidReference {
                field_path: reference.field_path.clone(),
                reason: "no target kind known from extraction or pattern".into(),
            })?;
        let group = extracted
            .api_version
            .as_deref()
            .and_then(|av| av.split_once('/').map(|(g, _)| g.to_string()))
            .or_else(|| reference.target_group.clone())
            .unwrap_or_default();
        let version = extracted
            .api_version
            .as_deref()
            .and_then(|av| av.split_once('/').map(|(_, v)| v.to_string()))
            .or_else(|| reference.target_version.clone())
            .unwrap_or_else(|| "v1".to_string());

        let gvr = self.plurals.read().unwrap().build_gvr(&group, &version, &kind);
        let namespaced = self.plurals.read().unwrap().is_namespaced(&group, &kind);
        let namespace = if namespaced {
            extracted.namespace.clone().or_else(|| source.namespace.clone())
        } else {
            None
        };

        let key = CacheKey {
            gvr: gvr.clone(),
            namespace: namespace.clone(),
            name: extracted.name.clone(),
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let object = self
            .client
            .get_object(&gvr, namespace.as_deref(), &extracted.name)
            .await
            .map_err(|err| {
                warn!(target = %extracted.name, %gvr, "failed to fetch reference target");
                ResolverError::from(err)
            })?;

        let target_ref = ResourceRef::new(
            extracted.api_version.clone().unwrap_or_else(|| format!("{group}/{version}")),
            kind,
            namespace,
            extracted.name.clone(),
        );
        let resolved = ResolvedReference { object, gvr, target_ref };
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }
}
