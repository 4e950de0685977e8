//! CRD discovery: list, filter, parse, cache (§4.C).

use crate::cache::TtlCache;
use crate::error::DiscoveryError;
use crate::stats::{CrdError, DiscoveryStatistics};
use glob::{MatchOptions, Pattern};
use kubegraph_client::{CrdManifest, TypedClusterClient};
use kubegraph_model::crd::{CRDInfo, CRDMetadata};
use kubegraph_schema::SchemaParser;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const GROUP_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Enumerates CRDs via a `TypedClusterClient`, filters by group glob
/// patterns, selects storage versions, parses schemas, and caches the
/// result by `(name, resourceVersion)`.
pub struct CrdDiscoverer<C: TypedClusterClient> {
    client: Arc<C>,
    cache: Arc<TtlCache<(String, String), CRDInfo>>,
    parser: Arc<Mutex<SchemaParser>>,
    max_concurrency: usize,
    last_stats: RwLock<DiscoveryStatistics>,
}

impl<C: TypedClusterClient + 'static> CrdDiscoverer<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, DEFAULT_MAX_CONCURRENCY, DEFAULT_CACHE_TTL)
    }

    pub fn with_config(client: Arc<C>, max_concurrency: usize, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache: Arc::new(TtlCache::new(cache_ttl)),
            parser: Arc::new(Mutex::new(SchemaParser::new())),
            max_concurrency: max_concurrency.max(1),
            last_stats: RwLock::new(DiscoveryStatistics::default()),
        }
    }

    pub async fn discover_crds(&self, patterns: &[String]) -> Result<Vec<CRDInfo>, DiscoveryError> {
        self.discover_with_timeout(patterns, DEFAULT_TIMEOUT).await
    }

    pub async fn discover_with_timeout(
        &self,
        patterns: &[String],
        timeout: Duration,
    ) -> Result<Vec<CRDInfo>, DiscoveryError> {
        let token = CancellationToken::new();
        let watchdog_token = token.clone();
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            watchdog_token.cancel();
        });

        let start = Instant::now();
        let outcome = self.run_discovery(patterns, &token).await;
        watchdog.abort();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok((infos, mut stats)) => {
                stats.duration_ms = elapsed_ms;
                *self.last_stats.write().unwrap() = stats;
                Ok(infos)
            }
            Err(err) => {
                let mut stats = self.last_stats.read().unwrap().clone();
                stats.duration_ms = elapsed_ms;
                *self.last_stats.write().unwrap() = stats;
                Err(err)
            }
        }
    }

    pub fn get_discovery_statistics(&self) -> DiscoveryStatistics {
        self.last_stats.read().unwrap().clone()
    }

    async fn run_discovery(
        &self,
        patterns: &[String],
        token: &CancellationToken,
    ) -> Result<(Vec<CRDInfo>, DiscoveryStatistics), DiscoveryError> {
        let compiled: Vec<Pattern> = patterns.iter().filter_map(|p| Pattern::new(p).ok()).collect();

        let manifests = tokio::select! {
            res = self.client.list_crds(None) => res?,
            _ = token.cancelled() => return Err(DiscoveryError::Timeout { elapsed_ms: 0 }),
        };

        let mut stats = DiscoveryStatistics {
            crds_listed: manifests.len(),
            ..Default::default()
        };

        let matched: Vec<CrdManifest> = manifests
            .into_iter()
            .filter(|m| compiled.is_empty() || compiled.iter().any(|p| p.matches_with(&m.group, GROUP_MATCH_OPTIONS)))
            .collect();
        stats.crds_matched = matched.len();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<Option<Outcome>> = JoinSet::new();

        for manifest in matched {
            let semaphore = semaphore.clone();
            let task_token = token.clone();
            let cache = self.cache.clone();
            let parser = self.parser.clone();
            tasks.spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit.ok()?,
                    _ = task_token.cancelled() => return None,
                };
                Some(process_one(&cache, &parser, manifest))
            });
        }

        let mut infos = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let Some(outcome) = joined.unwrap_or(None) else {
                continue;
            };
            match outcome {
                Outcome::CacheHit(info) => {
                    stats.cache_hits += 1;
                    stats.crds_parsed += 1;
                    infos.push(info);
                }
                Outcome::Parsed(info) => {
                    stats.cache_misses += 1;
                    stats.crds_parsed += 1;
                    infos.push(info);
                }
                Outcome::ParsedWithSchemaError(info, err) => {
                    stats.cache_misses += 1;
                    stats.crds_parsed += 1;
                    stats.errors.push(err);
                    infos.push(info);
                }
                Outcome::Error(err) => {
                    stats.cache_misses += 1;
                    stats.errors.push(err);
                }
            }
        }

        Ok((infos, stats))
    }
}

enum Outcome {
    CacheHit(CRDInfo),
    Parsed(CRDInfo),
    ParsedWithSchemaError(CRDInfo, CrdError),
    Error(CrdError),
}

/// Runs the per-CRD pipeline (cache lookup, version selection, schema
/// parsing) outside of `&self` so it can run inside a spawned task without
/// holding a borrow across the `.await` in the caller's select.
fn process_one(
    cache: &TtlCache<(String, String), CRDInfo>,
    parser: &Mutex<SchemaParser>,
    manifest: CrdManifest,
) -> Outcome {
    let cache_key = (manifest.name.clone(), manifest.resource_version.clone());
    if let Some(cached) = cache.get(&cache_key) {
        return Outcome::CacheHit(cached);
    }

    let Some(version) = manifest.storage_or_last_version() else {
        return Outcome::Error(CrdError {
            crd_name: manifest.name.clone(),
            message: "CRD declares no versions".into(),
        });
    };

    let mut parse_error = None;
    let schema = match &version.schema {
        Some(raw) => {
            let mut parser = parser.lock().unwrap();
            match parser.parse(raw) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    tracing::debug!(crd = %manifest.name, error = %err, "schema parse failed, continuing without schema");
                    parse_error = Some(err.to_string());
                    None
                }
            }
        }
        None => None,
    };

    let info = CRDInfo {
        name: manifest.name.clone(),
        group: manifest.group.clone(),
        version: version.name.clone(),
        kind: manifest.names.kind.clone(),
        plural: manifest.names.plural.clone(),
        singular: manifest.names.singular.clone(),
        namespaced: matches!(manifest.scope, kubegraph_client::CrdScope::Namespaced),
        schema,
        metadata: CRDMetadata {
            labels: Default::default(),
            annotations: Default::default(),
            categories: manifest.names.categories.clone(),
            short_names: manifest.names.short_names.clone(),
        },
        parsed_at: chrono::Utc::now(),
        resource_version: manifest.resource_version.clone(),
    };

    cache.set(cache_key, info.clone());

    match parse_error {
        // Schema-less CRDInfo still counts as discovered; the parse failure
        // is recorded separately so `DiscoveryStatistics.errors` reflects it
        // without dropping the CRD from the result set (§7).
        Some(message) => Outcome::ParsedWithSchemaError(
            info,
            CrdError {
                crd_name: manifest.name,
                message,
            },
        ),
        None => Outcome::Parsed(info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubegraph_client::{CrdNames, CrdScope, CrdVersion, FakeClusterClient};
    use serde_json::json;

    fn crd(name: &str, group: &str) -> CrdManifest {
        CrdManifest {
            name: name.into(),
            group: group.into(),
            scope: CrdScope::Namespaced,
            names: CrdNames {
                kind: "KubeCluster".into(),
                plural: "kubeclusters".into(),
                singular: "kubecluster".into(),
                short_names: vec![],
                categories: vec![],
            },
            resource_version: "1".into(),
            versions: vec![CrdVersion {
                name: "v1".into(),
                served: true,
                storage: true,
                schema: Some(json!({"type": "object", "properties": {"region": {"type": "string"}}})),
            }],
        }
    }

    #[tokio::test]
    async fn discovers_and_parses_matching_crds() {
        let client = Arc::new(
            FakeClusterClient::new()
                .with_crd(crd("kubeclusters.platform.kubecore.io", "platform.kubecore.io"))
                .with_crd(crd("widgets.example.com", "example.com")),
        );
        let discoverer = CrdDiscoverer::new(client);

        let infos = discoverer
            .discover_crds(&["*.kubecore.io".to_string()])
            .await
            .unwrap();

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "kubeclusters.platform.kubecore.io");
        assert!(infos[0].schema.is_some());

        let stats = discoverer.get_discovery_statistics();
        assert_eq!(stats.crds_listed, 2);
        assert_eq!(stats.crds_matched, 1);
        assert_eq!(stats.crds_parsed, 1);
    }

    #[tokio::test]
    async fn second_discovery_of_same_resource_version_hits_cache() {
        let client = Arc::new(
            FakeClusterClient::new().with_crd(crd("kubeclusters.platform.kubecore.io", "platform.kubecore.io")),
        );
        let discoverer = CrdDiscoverer::new(client);

        discoverer.discover_crds(&[]).await.unwrap();
        discoverer.discover_crds(&[]).await.unwrap();

        let stats = discoverer.get_discovery_statistics();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 0);
    }

    #[tokio::test]
    async fn empty_pattern_list_matches_every_crd() {
        let client = Arc::new(
            FakeClusterClient::new()
                .with_crd(crd("a.example.com", "example.com"))
                .with_crd(crd("b.other.io", "other.io")),
        );
        let discoverer = CrdDiscoverer::new(client);
        let infos = discoverer.discover_crds(&[]).await.unwrap();
        assert_eq!(infos.len(), 2);
    }

    /// A `TypedClusterClient` whose list call never returns inside the
    /// virtual-time window this test exercises, standing in for a cluster
    /// that is unreachable within the caller's deadline.
    struct SlowClient;

    #[async_trait::async_trait]
    impl kubegraph_client::TypedClusterClient for SlowClient {
        async fn list_crds(&self, _label_selector: Option<&str>) -> Result<Vec<CrdManifest>, kubegraph_client::ClientError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn vanishingly_short_deadline_returns_a_timeout_error() {
        let discoverer = CrdDiscoverer::new(Arc::new(SlowClient));

        let err = discoverer
            .discover_with_timeout(&["*.kubecore.io".to_string()], Duration::from_nanos(1))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"), "unexpected message: {err}");

        // §4.C "GetDiscoveryStatistics() still returns valid counters" even
        // though the call itself failed.
        let stats = discoverer.get_discovery_statistics();
        assert!(stats.duration_ms < u64::MAX);
    }
}
