//! Traversal Engine (spec §4.F): a caller hands the engine a list of root
//! objects plus a `TraversalConfig`; it runs a bounded concurrent
//! breadth-first expansion, wiring together CRD discovery, reference
//! detection, scope filtering, reference resolution, and graph building.
//!
//! Grounded on the teacher's `familiar-router` dispatch loop (bounded
//! concurrency via a semaphore-guarded `JoinSet`, a watchdog task that
//! cancels a shared token on timeout) generalized from routing a single
//! request to expanding one BFS frontier at a time.

use crate::cache::ExecutionCache;
use crate::config::{BatchKey, BatchingConfig, OnCycleDetected, RegistryMode, TraversalConfig, TraversalDirection};
use crate::error::EngineError;
use crate::metrics::{DepthStats, TraversalMetrics, TraversalStep};
use crate::scope::{ScopeCandidate, ScopeFilter};
use crate::tracker::ResourceTracker;
use kubegraph_client::ClusterClient;
use kubegraph_discovery::CrdDiscoverer;
use kubegraph_graph::{
    detect_cycles, has_cycle, reverse_bfs, validate_graph, CycleReport, DepthBoundedVisitation, Graph, GraphBuilder,
    ValidationResult,
};
use kubegraph_model::{DetectionMethod, EdgeMetadata, NodeMetadata, RefType, ReferenceField, ResourceEdge, ResourceNode, ResourceRef, ResourceSchema, Uid};
use kubegraph_resolver::{ReferenceResolver, ResolvedReference};
use kubegraph_schema::{synthesize_schema, ReferenceDetector};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A caller-supplied starting point: the object is handed in directly so
/// the engine never has to fetch a root it didn't discover itself.
#[derive(Debug, Clone)]
pub struct TraversalRoot {
    pub resource: ResourceRef,
    pub uid: Option<Uid>,
    pub object: Value,
}

impl TraversalRoot {
    pub fn new(resource: ResourceRef, object: Value) -> Self {
        let uid = object
            .get("metadata")
            .and_then(|m| m.get("uid"))
            .and_then(|u| u.as_str())
            .map(Uid::from);
        Self { resource, uid, object }
    }
}

/// Why `run_traversal` stopped expanding the frontier (§4.F "Termination").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Completed,
    MaxDepth,
    MaxResources,
    Timeout,
    CycleDetected,
}

/// Everything a single `run_traversal` call produces: the assembled graph,
/// its cycle report and validation result, the traversal's metrics and
/// per-depth path log, and why it stopped.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalResult {
    pub graph: Graph,
    pub metrics: TraversalMetrics,
    pub steps: Vec<TraversalStep>,
    pub cycles: CycleReport,
    pub validation: ValidationResult,
    pub termination_reason: TerminationReason,
    pub scope_exclusions: HashMap<String, usize>,
    /// Populated only when `config.direction` is `Reverse`/`Bidirectional`
    /// (§4.F "reverse BFS, or bidirectional (sequential forward then
    /// reverse)"): the node visitation order of a reverse walk from the
    /// roots over the graph the forward pass built, via
    /// `kubegraph_graph::reverse_bfs` over the maintained reverse adjacency
    /// (§3 I1). Empty under the default `Forward` direction.
    pub reverse_order: Vec<String>,
}

/// A pending BFS frontier entry: its canonical graph id, identity, the
/// object content fetched for it, and its position in the traversal.
#[derive(Debug, Clone)]
struct FrontierItem {
    id: String,
    resource: ResourceRef,
    object: Value,
    depth: u32,
    discovery_path: Vec<String>,
}

/// The result of expanding one frontier item: everything it adds to the
/// graph plus what it skipped, computed without touching the shared
/// `GraphBuilder` so many of these can run concurrently.
struct SourceExpansion {
    source_id: String,
    references_found: usize,
    cache_hits: usize,
    additions: Vec<(ResourceNode, ResourceEdge, FrontierItem)>,
    skipped: Vec<(String, String)>,
}

/// §4.E's documented cache key: "(sourceAPIVersion, sourceKind, sourceName,
/// fieldPath, targetKind, targetGroup)".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionCacheKey {
    source_api_version: String,
    source_kind: String,
    source_name: String,
    field_path: String,
    target_kind: String,
    target_group: String,
}

/// The execution-scoped caches §4.F describes ("schema parses, reference
/// extractions, and reference resolutions"), created once per
/// `run_traversal` call and shared by every frontier item across every
/// depth. `None` when `TraversalConfig.cache_enabled` is false.
#[derive(Clone)]
struct ExpansionCaches {
    schema: Option<Arc<ExecutionCache<(String, String), ResourceSchema>>>,
    extraction: Option<Arc<ExecutionCache<(String, String), Vec<ReferenceField>>>>,
    resolution: Option<Arc<ExecutionCache<ResolutionCacheKey, Vec<ResolvedReference>>>>,
}

impl ExpansionCaches {
    fn new(enabled: bool, ttl: std::time::Duration) -> Self {
        Self {
            schema: enabled.then(|| Arc::new(ExecutionCache::new(ttl))),
            extraction: enabled.then(|| Arc::new(ExecutionCache::new(ttl))),
            resolution: enabled.then(|| Arc::new(ExecutionCache::new(ttl))),
        }
    }
}

pub struct TraversalEngine<C: ClusterClient + 'static> {
    client: Arc<C>,
    config: TraversalConfig,
}

impl<C: ClusterClient + 'static> TraversalEngine<C> {
    pub fn new(client: Arc<C>, config: TraversalConfig) -> Self {
        Self { client, config }
    }

    /// Runs one full traversal from `roots`. Returns `Ok` with a (possibly
    /// partial, on `MaxDepth`/`MaxResources`) result on every non-fatal
    /// termination, and `Err` carrying the partial result for the two
    /// conditions §7 treats as fatal: deadline exceeded, and a cycle
    /// detected under `onCycleDetected = fail`.
    pub async fn run_traversal(&self, roots: Vec<TraversalRoot>) -> Result<TraversalResult, EngineError> {
        let start = Instant::now();
        let scope = Arc::new(ScopeFilter::new(self.config.scope_filter.clone()));
        let detector = Arc::new(ReferenceDetector::new(self.config.ref_patterns.clone()));
        let resolver = Arc::new(ReferenceResolver::with_config(
            self.client.clone(),
            Default::default(),
            self.config.min_confidence_threshold,
            self.config.cache_ttl,
        ));
        let schemas = Arc::new(self.discover_schemas().await);
        let caches = ExpansionCaches::new(self.config.cache_enabled, self.config.cache_ttl);

        let token = CancellationToken::new();
        let watchdog_token = token.clone();
        let timeout = self.config.traversal_timeout;
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            watchdog_token.cancel();
        });

        let mut builder = GraphBuilder::new();
        let tracker = ResourceTracker::new();
        let mut frontier = self.seed_roots(roots, &mut builder, &tracker, &scope);
        let root_ids: Vec<String> = frontier.iter().map(|item| item.id.clone()).collect();

        let mut steps = Vec::new();
        let mut metrics = TraversalMetrics::default();
        let mut termination = TerminationReason::Completed;
        let mut depth = 0u32;

        'outer: loop {
            if frontier.is_empty() {
                break;
            }
            if depth >= self.config.max_depth {
                termination = TerminationReason::MaxDepth;
                break;
            }
            if builder.graph().len() >= self.config.max_resources {
                termination = TerminationReason::MaxResources;
                break;
            }
            if token.is_cancelled() {
                termination = TerminationReason::Timeout;
                break;
            }

            let step_start = Instant::now();
            let frontier_size = frontier.len();
            let expansions = self
                .expand_frontier(frontier.drain(..).collect(), &detector, &resolver, &scope, &schemas, &caches, &token)
                .await;

            if token.is_cancelled() {
                termination = TerminationReason::Timeout;
                break;
            }

            let (next_frontier, depth_stats, step) = self.merge_expansions(
                expansions,
                depth,
                frontier_size,
                step_start,
                &mut builder,
                &tracker,
                &mut metrics,
            );
            metrics.references_found += step.references_found;
            metrics.references_followed += step.references_followed;
            metrics.per_depth.push(depth_stats);
            steps.push(step);

            if self.cycle_policy_triggered(builder.graph()) {
                match self.config.on_cycle_detected {
                    OnCycleDetected::Stop => {
                        termination = TerminationReason::CycleDetected;
                        break 'outer;
                    }
                    OnCycleDetected::Fail => {
                        watchdog.abort();
                        let result =
                            self.finalize(builder, steps, metrics, &scope, TerminationReason::CycleDetected, start, &root_ids);
                        return Err(EngineError::CycleDetected { partial: Box::new(result) });
                    }
                    OnCycleDetected::Continue => unreachable!("checked in cycle_policy_triggered"),
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        watchdog.abort();
        let result = self.finalize(builder, steps, metrics, &scope, termination, start, &root_ids);
        if result.termination_reason == TerminationReason::Timeout {
            let elapsed_ms = result.metrics.duration_ms;
            return Err(EngineError::Timeout { elapsed_ms, partial: Box::new(result) });
        }
        Ok(result)
    }

    fn seed_roots(
        &self,
        roots: Vec<TraversalRoot>,
        builder: &mut GraphBuilder,
        tracker: &ResourceTracker,
        scope: &ScopeFilter,
    ) -> Vec<FrontierItem> {
        let mut frontier = Vec::with_capacity(roots.len());
        for root in roots {
            let group = api_group(&root.resource.api_version);
            let platform = scope.is_platform(&group, &root.resource.kind);
            let node = ResourceNode {
                id: root.resource.node_id(),
                resource: root.resource.clone(),
                uid: root.uid,
                discovered_at: chrono::Utc::now(),
                discovery_depth: 0,
                discovery_path: Vec::new(),
                platform,
                metadata: NodeMetadata {
                    api_group: group,
                    kind: root.resource.kind.clone(),
                    namespace: root.resource.namespace.clone(),
                    name: root.resource.name.clone(),
                    ..Default::default()
                },
            };
            let canonical = builder.add_node(node);
            tracker.mark(&canonical);
            frontier.push(FrontierItem {
                id: canonical,
                resource: root.resource,
                object: root.object,
                depth: 0,
                discovery_path: Vec::new(),
            });
        }
        frontier
    }

    /// Dispatches to the batched or unbatched expansion strategy depending
    /// on `config.batching` (§4.F "Optional batching groups frontier items
    /// by size, depth, API group, kind, or namespace").
    #[allow(clippy::too_many_arguments)]
    async fn expand_frontier(
        &self,
        items: Vec<FrontierItem>,
        detector: &Arc<ReferenceDetector>,
        resolver: &Arc<ReferenceResolver<C>>,
        scope: &Arc<ScopeFilter>,
        schemas: &Arc<HashMap<(String, String), ResourceSchema>>,
        caches: &ExpansionCaches,
        token: &CancellationToken,
    ) -> Vec<SourceExpansion> {
        match self.config.batching.clone() {
            Some(batching) => {
                self.expand_frontier_batched(items, &batching, detector, resolver, scope, schemas, caches, token)
                    .await
            }
            None => self.expand_frontier_unbatched(items, detector, resolver, scope, schemas, caches, token).await,
        }
    }

    /// §5 "A semaphore caps concurrent in-flight cluster calls"; each
    /// frontier item is expanded on its own task, bounded by the
    /// semaphore, and cancelled in place if the deadline fires mid-flight.
    #[allow(clippy::too_many_arguments)]
    async fn expand_frontier_unbatched(
        &self,
        items: Vec<FrontierItem>,
        detector: &Arc<ReferenceDetector>,
        resolver: &Arc<ReferenceResolver<C>>,
        scope: &Arc<ScopeFilter>,
        schemas: &Arc<HashMap<(String, String), ResourceSchema>>,
        caches: &ExpansionCaches,
        token: &CancellationToken,
    ) -> Vec<SourceExpansion> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let mut tasks: JoinSet<Option<SourceExpansion>> = JoinSet::new();

        for item in items {
            let semaphore = semaphore.clone();
            let detector = detector.clone();
            let resolver = resolver.clone();
            let scope = scope.clone();
            let schemas = schemas.clone();
            let caches = caches.clone();
            let task_token = token.clone();
            tasks.spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit.ok()?,
                    _ = task_token.cancelled() => return None,
                };
                tokio::select! {
                    result = expand_source(item, detector, resolver, scope, schemas, caches) => Some(result),
                    _ = task_token.cancelled() => None,
                }
            });
        }

        let mut expansions = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(Some(expansion)) = joined {
                expansions.push(expansion);
            }
        }
        expansions
    }

    /// §4.F "Batching": groups the frontier by the configured key into
    /// chunks of at most `batch_size`, then dispatches one task per batch,
    /// bounded by `max_concurrent_batches` (§5 "a third pool, default 3").
    /// The client contract (§6) exposes only a per-object `get` — there is
    /// no batch-level list call to hand the grouped items to — so every
    /// batch's processor always falls back to resolving its items one by
    /// one ("a batch processor accepts the whole batch ... or falls back
    /// to per-resource processing on failure"); the grouping controls
    /// concurrency locality (same API group/kind/namespace/depth dispatched
    /// together) rather than the wire call itself.
    #[allow(clippy::too_many_arguments)]
    async fn expand_frontier_batched(
        &self,
        items: Vec<FrontierItem>,
        batching: &BatchingConfig,
        detector: &Arc<ReferenceDetector>,
        resolver: &Arc<ReferenceResolver<C>>,
        scope: &Arc<ScopeFilter>,
        schemas: &Arc<HashMap<(String, String), ResourceSchema>>,
        caches: &ExpansionCaches,
        token: &CancellationToken,
    ) -> Vec<SourceExpansion> {
        let batches = group_into_batches(items, batching);
        let batch_semaphore = Arc::new(Semaphore::new(batching.max_concurrent_batches.max(1)));
        let item_semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let mut tasks: JoinSet<Vec<SourceExpansion>> = JoinSet::new();

        for batch in batches {
            let batch_semaphore = batch_semaphore.clone();
            let item_semaphore = item_semaphore.clone();
            let detector = detector.clone();
            let resolver = resolver.clone();
            let scope = scope.clone();
            let schemas = schemas.clone();
            let caches = caches.clone();
            let batch_token = token.clone();

            tasks.spawn(async move {
                let _batch_permit = tokio::select! {
                    permit = batch_semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return Vec::new(),
                    },
                    _ = batch_token.cancelled() => return Vec::new(),
                };

                let mut per_item: JoinSet<Option<SourceExpansion>> = JoinSet::new();
                for item in batch {
                    let item_semaphore = item_semaphore.clone();
                    let detector = detector.clone();
                    let resolver = resolver.clone();
                    let scope = scope.clone();
                    let schemas = schemas.clone();
                    let caches = caches.clone();
                    let item_token = batch_token.clone();
                    per_item.spawn(async move {
                        let _permit = tokio::select! {
                            permit = item_semaphore.acquire_owned() => permit.ok()?,
                            _ = item_token.cancelled() => return None,
                        };
                        tokio::select! {
                            result = expand_source(item, detector, resolver, scope, schemas, caches) => Some(result),
                            _ = item_token.cancelled() => None,
                        }
                    });
                }

                let mut results = Vec::new();
                while let Some(joined) = per_item.join_next().await {
                    if let Ok(Some(expansion)) = joined {
                        results.push(expansion);
                    }
                }
                results
            });
        }

        let mut expansions = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(batch_results) = joined {
                expansions.extend(batch_results);
            }
        }
        expansions
    }

    /// The single-writer merge phase (§5 "the graph is mutated only
    /// through the builder"): folds every concurrently-computed expansion
    /// into the shared builder and tracker, respecting `MaxResources`.
    fn merge_expansions(
        &self,
        expansions: Vec<SourceExpansion>,
        depth: u32,
        frontier_size: usize,
        step_start: Instant,
        builder: &mut GraphBuilder,
        tracker: &ResourceTracker,
        metrics: &mut TraversalMetrics,
    ) -> (Vec<FrontierItem>, DepthStats, TraversalStep) {
        let mut next_frontier = Vec::new();
        let mut nodes_added = 0usize;
        let mut edges_added = 0usize;
        let mut references_found = 0usize;
        let mut references_followed = 0usize;

        for expansion in expansions {
            references_found += expansion.references_found;
            metrics.cache_hits += expansion.cache_hits;
            for (field_path, reason) in expansion.skipped {
                builder.record_skipped_reference(&expansion.source_id, field_path, reason);
                metrics.references_skipped += 1;
            }
            for (node, mut edge, mut next) in expansion.additions {
                if builder.graph().len() >= self.config.max_resources {
                    builder.record_skipped_reference(&expansion.source_id, edge.field_path.clone(), "max_resources".to_string());
                    metrics.references_skipped += 1;
                    continue;
                }
                let canonical = builder.add_node(node);
                edge.source = expansion.source_id.clone();
                edge.target = canonical.clone();
                if builder.add_edge(edge) {
                    edges_added += 1;
                    references_followed += 1;
                }
                if tracker.mark(&canonical) {
                    nodes_added += 1;
                    next.id = canonical;
                    next_frontier.push(next);
                }
            }
        }

        let duration_ms = step_start.elapsed().as_millis() as u64;
        let depth_stats = DepthStats {
            depth,
            frontier_size,
            nodes_added,
            edges_added,
            duration_ms,
        };
        let step = TraversalStep {
            depth,
            action: "expand_frontier".to_string(),
            references_found,
            references_followed,
            duration_ms,
        };
        (next_frontier, depth_stats, step)
    }

    /// §4.F "The engine always runs the cycle detector (if enabled) before
    /// returning" plus the optional mid-traversal check `onCycleDetected`
    /// (other than `continue`) requires.
    fn cycle_policy_triggered(&self, graph: &Graph) -> bool {
        self.config.cycle_detection_enabled
            && self.config.on_cycle_detected != OnCycleDetected::Continue
            && has_cycle(graph)
    }

    /// §6 `Mode`: `embedded` skips CRD discovery entirely (a pre-baked
    /// registry is an outer-shell concern); `dynamic`/`hybrid` discover CRD
    /// schemas up front so the detector prefers them over live synthesis.
    async fn discover_schemas(&self) -> HashMap<(String, String), ResourceSchema> {
        if self.config.mode == RegistryMode::Embedded {
            return HashMap::new();
        }
        let discoverer = CrdDiscoverer::new(self.client.clone());
        match discoverer
            .discover_with_timeout(&self.config.api_group_patterns, self.config.discovery_timeout)
            .await
        {
            Ok(infos) => infos
                .into_iter()
                .filter_map(|info| info.schema.clone().map(|schema| ((info.group.clone(), info.kind.clone()), schema)))
                .collect(),
            Err(err) if self.config.fallback_enabled => {
                warn!(error = %err, "CRD discovery failed, falling back to live schema synthesis");
                HashMap::new()
            }
            Err(err) => {
                warn!(error = %err, "CRD discovery failed and fallback is disabled; traversal proceeds schema-less");
                HashMap::new()
            }
        }
    }

    fn finalize(
        &self,
        builder: GraphBuilder,
        mut steps: Vec<TraversalStep>,
        mut metrics: TraversalMetrics,
        scope: &ScopeFilter,
        termination_reason: TerminationReason,
        start: Instant,
        root_ids: &[String],
    ) -> TraversalResult {
        let graph = builder.build();
        let cycles = if self.config.cycle_detection_enabled {
            detect_cycles(&graph, (self.config.max_depth as usize + 1) * 8)
        } else {
            CycleReport::default()
        };
        let validation = validate_graph(&graph);

        // §4.F "forward BFS (default), or reverse BFS, or bidirectional
        // (sequential forward then reverse)". The forward walk is what
        // built `graph` above; `Reverse`/`Bidirectional` additionally walk
        // the completed graph backwards from the same roots over the
        // maintained reverse adjacency (§3 I1).
        let reverse_order = if self.config.direction == TraversalDirection::Forward {
            Vec::new()
        } else {
            let reverse_start = Instant::now();
            let strategy = DepthBoundedVisitation { max_depth: self.config.max_depth };
            let result = reverse_bfs(&graph, root_ids, &strategy);
            steps.push(TraversalStep {
                depth: 0,
                action: "reverse_bfs".to_string(),
                references_found: 0,
                references_followed: result.order.len(),
                duration_ms: reverse_start.elapsed().as_millis() as u64,
            });
            result.order
        };

        metrics.nodes_discovered = graph.len();
        metrics.edges_discovered = graph.edges().len();
        metrics.duration_ms = start.elapsed().as_millis() as u64;

        TraversalResult {
            graph,
            metrics,
            steps,
            cycles,
            validation,
            termination_reason,
            scope_exclusions: scope.exclusion_reasons(),
            reverse_order,
        }
    }
}

fn api_group(api_version: &str) -> String {
    api_version.split_once('/').map(|(g, _)| g.to_string()).unwrap_or_default()
}

/// §4.F "group frontier items by the configured `BatchKey`, then chunk each
/// group to at most `batch_size`". Grouping preserves first-seen order so
/// batch dispatch order is deterministic for a given frontier.
fn group_into_batches(items: Vec<FrontierItem>, batching: &BatchingConfig) -> Vec<Vec<FrontierItem>> {
    if matches!(batching.group_by, BatchKey::Size) {
        return items.chunks(batching.batch_size.max(1)).map(|c| c.to_vec()).collect();
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<FrontierItem>> = HashMap::new();
    for item in items {
        let key = match batching.group_by {
            BatchKey::Size => unreachable!(),
            BatchKey::Depth => item.depth.to_string(),
            BatchKey::ApiGroup => api_group(&item.resource.api_version),
            BatchKey::Kind => item.resource.kind.clone(),
            BatchKey::Namespace => item.resource.namespace.clone().unwrap_or_default(),
        };
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(item);
    }

    let mut batches = Vec::new();
    for key in order {
        let group = groups.remove(&key).unwrap_or_default();
        batches.extend(group.chunks(batching.batch_size.max(1)).map(|c| c.to_vec()));
    }
    batches
}

fn has_owner_reference(object: &Value) -> bool {
    object
        .get("metadata")
        .and_then(|m| m.get("ownerReferences"))
        .and_then(|o| o.as_array())
        .is_some_and(|a| !a.is_empty())
}

/// §4.F step d: dedup candidate reference fields by `(fieldPath,
/// targetKind, targetGroup)`, keeping the first (highest-priority) hit for
/// each key.
fn dedupe_references(fields: Vec<ReferenceField>) -> Vec<ReferenceField> {
    let mut seen = HashSet::new();
    fields
        .into_iter()
        .filter(|f| seen.insert((f.field_path.clone(), f.target_kind.clone(), f.target_group.clone())))
        .collect()
}

/// Expands a single frontier item: detects references on its object
/// (falling back to live schema synthesis when no CRD schema is known),
/// lifts its owner reference if present, resolves every surviving
/// candidate, and scope-filters each resolved target. Runs outside the
/// shared builder so many of these can execute concurrently; the caller
/// merges the result back in under a single writer.
async fn expand_source<C: ClusterClient + 'static>(
    item: FrontierItem,
    detector: Arc<ReferenceDetector>,
    resolver: Arc<ReferenceResolver<C>>,
    scope: Arc<ScopeFilter>,
    schemas: Arc<HashMap<(String, String), ResourceSchema>>,
    caches: ExpansionCaches,
) -> SourceExpansion {
    let mut cache_hits = 0usize;
    let group = api_group(&item.resource.api_version);
    let schema_key = (group.clone(), item.resource.kind.clone());

    let schema = if let Some(hit) = caches.schema.as_ref().and_then(|c| c.get(&schema_key)) {
        cache_hits += 1;
        hit
    } else {
        let schema = schemas.get(&schema_key).cloned().unwrap_or_else(|| synthesize_schema(&item.object));
        if let Some(cache) = &caches.schema {
            cache.insert(schema_key.clone(), schema.clone());
        }
        schema
    };

    let mut fields = if let Some(hit) = caches.extraction.as_ref().and_then(|c| c.get(&schema_key)) {
        cache_hits += 1;
        hit
    } else {
        let (fields, _stats) = detector.detect(&schema);
        if let Some(cache) = &caches.extraction {
            cache.insert(schema_key, fields.clone());
        }
        fields
    };
    if has_owner_reference(&item.object) {
        fields.push(ReferenceField::new(
            "metadata.ownerReferences",
            "ownerReferences",
            RefType::OwnerRef,
            1.0,
            DetectionMethod::OwnerReference,
        ));
    }
    let candidates = dedupe_references(fields);
    let references_found = candidates.len();

    let mut additions = Vec::new();
    let mut skipped = Vec::new();

    for candidate in candidates {
        let is_owner = candidate.detection_method == DetectionMethod::OwnerReference;
        let field_path = candidate.field_path.clone();

        let resolution_key = ResolutionCacheKey {
            source_api_version: item.resource.api_version.clone(),
            source_kind: item.resource.kind.clone(),
            source_name: item.resource.name.clone(),
            field_path: field_path.clone(),
            target_kind: candidate.target_kind.clone().unwrap_or_default(),
            target_group: candidate.target_group.clone().unwrap_or_default(),
        };

        let cached = caches.resolution.as_ref().and_then(|c| c.get(&resolution_key));
        let resolved = if let Some(hit) = cached {
            cache_hits += 1;
            hit
        } else {
            match resolver.resolve(&item.resource, &item.object, &candidate).await {
                Ok(resolved) => {
                    if let Some(cache) = &caches.resolution {
                        cache.insert(resolution_key, resolved.clone());
                    }
                    resolved
                }
                Err(err) => {
                    debug!(field_path = %field_path, reason = err.skip_reason(), "reference not followed");
                    skipped.push((field_path, err.skip_reason().to_string()));
                    continue;
                }
            }
        };

        for target in resolved {
            let target_group = target.gvr.group.clone();
            let target_kind = target.target_ref.kind.clone();
            let target_ns = target.target_ref.namespace.clone();

            let candidate_scope = ScopeCandidate {
                api_group: &target_group,
                kind: &target_kind,
                namespace: target_ns.as_deref(),
            };
            if let Err(reason) = scope.admit_resource(&candidate_scope) {
                skipped.push((field_path.clone(), reason.to_string()));
                continue;
            }
            if let Err(reason) = scope.admit_reference(is_owner, item.resource.namespace.as_deref(), target_ns.as_deref()) {
                skipped.push((field_path.clone(), reason.to_string()));
                continue;
            }

            let target_id = target.target_ref.node_id();
            let mut discovery_path = if item.discovery_path.is_empty() {
                vec![item.id.clone()]
            } else {
                item.discovery_path.clone()
            };
            discovery_path.push(target_id.clone());

            let uid = target
                .object
                .get("metadata")
                .and_then(|m| m.get("uid"))
                .and_then(|u| u.as_str())
                .map(Uid::from);

            let platform = scope.is_platform(&target_group, &target_kind);

            let node = ResourceNode {
                id: target_id.clone(),
                resource: target.target_ref.clone(),
                uid,
                discovered_at: chrono::Utc::now(),
                discovery_depth: item.depth + 1,
                discovery_path: discovery_path.clone(),
                platform,
                metadata: NodeMetadata {
                    api_group: target_group,
                    kind: target_kind,
                    namespace: target_ns,
                    name: target.target_ref.name.clone(),
                    ..Default::default()
                },
            };

            let is_cross_namespace = match (item.resource.namespace.as_deref(), node.metadata.namespace.as_deref()) {
                (Some(s), Some(t)) => s != t,
                _ => false,
            };

            let edge = ResourceEdge {
                id: String::new(),
                source: item.id.clone(),
                target: target_id.clone(),
                relation_type: candidate.ref_type,
                field_path: field_path.clone(),
                field_name: candidate.field_name.clone(),
                confidence: candidate.confidence,
                detection_method: candidate.detection_method,
                discovered_at: chrono::Utc::now(),
                metadata: EdgeMetadata {
                    is_cross_namespace,
                    target_exists: true,
                    resolution_error: None,
                },
            };

            let next = FrontierItem {
                id: target_id,
                resource: target.target_ref,
                object: target.object,
                depth: item.depth + 1,
                discovery_path,
            };

            additions.push((node, edge, next));
        }
    }

    SourceExpansion {
        source_id: item.id,
        references_found,
        cache_hits,
        additions,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OnCycleDetected, ScopeFilterConfig, TraversalConfig};
    use kubegraph_client::FakeClusterClient;
    use kubegraph_model::{Gvr, ReferencePattern};
    use serde_json::json;
    use std::time::Duration;

    fn kube_cluster_config() -> TraversalConfig {
        TraversalConfig {
            mode: RegistryMode::Dynamic,
            ref_patterns: vec![ReferencePattern {
                pattern: "providerConfigRef".into(),
                target_kind: Some("ProviderConfig".into()),
                target_group: Some("aws.platform.kubecore.io".into()),
                ref_type: RefType::Custom,
                confidence: 0.9,
            }],
            scope_filter: ScopeFilterConfig {
                platform_only: false,
                ..Default::default()
            },
            max_depth: 2,
            traversal_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn follows_a_pattern_matched_reference_one_hop() {
        let provider_gvr = Gvr::new("aws.platform.kubecore.io", "v1", "providerconfigs");
        let client = Arc::new(FakeClusterClient::new().with_object(
            provider_gvr,
            None,
            "aws-default".into(),
            json!({"metadata": {"name": "aws-default"}, "spec": {"region": "us-east-1"}}),
        ));

        let engine = TraversalEngine::new(client, kube_cluster_config());
        let root = TraversalRoot::new(
            ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "prod"),
            json!({
                "metadata": {"name": "prod", "namespace": "default"},
                "spec": {"providerConfigRef": "aws-default"}
            }),
        );

        let result = engine.run_traversal(vec![root]).await.unwrap();
        assert_eq!(result.graph.len(), 2);
        assert_eq!(result.graph.edges().len(), 1);
        assert_eq!(result.termination_reason, TerminationReason::Completed);
        assert!(result.validation.is_valid());

        let root_id = ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "prod").node_id();
        let child = result.graph.nodes().find(|n| n.id != root_id).unwrap();
        assert_eq!(child.discovery_path, vec![root_id.clone(), child.id.clone()]);
        assert!(result.reverse_order.is_empty());
    }

    #[tokio::test]
    async fn discovery_path_starts_at_the_root_two_hops_deep() {
        let provider_gvr = Gvr::new("aws.platform.kubecore.io", "v1", "providerconfigs");
        let region_gvr = Gvr::new("aws.platform.kubecore.io", "v1", "regions");
        let client = Arc::new(
            FakeClusterClient::new()
                .with_object(
                    provider_gvr,
                    None,
                    "aws-default".into(),
                    json!({"metadata": {"name": "aws-default"}, "spec": {"regionRef": "us-east-1"}}),
                )
                .with_object(region_gvr, None, "us-east-1".into(), json!({"metadata": {"name": "us-east-1"}})),
        );
        let mut config = kube_cluster_config();
        config.max_depth = 3;
        config.ref_patterns.push(ReferencePattern {
            pattern: "regionRef".into(),
            target_kind: Some("Region".into()),
            target_group: Some("aws.platform.kubecore.io".into()),
            ref_type: RefType::Custom,
            confidence: 0.9,
        });

        let engine = TraversalEngine::new(client, config);
        let root = TraversalRoot::new(
            ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "prod"),
            json!({
                "metadata": {"name": "prod", "namespace": "default"},
                "spec": {"providerConfigRef": "aws-default"}
            }),
        );

        let result = engine.run_traversal(vec![root]).await.unwrap();
        assert_eq!(result.graph.len(), 3);

        let root_id = ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "prod").node_id();
        let region_id = ResourceRef::new("aws.platform.kubecore.io/v1", "Region", None, "us-east-1").node_id();
        let region_node = result.graph.node(&region_id).unwrap();

        // P5: path starts at a root, ends at the node itself, consecutive
        // pairs joined by an existing edge.
        assert_eq!(region_node.discovery_path.first(), Some(&root_id));
        assert_eq!(region_node.discovery_path.last(), Some(&region_id));
        assert_eq!(region_node.discovery_path.len(), 3);
        for pair in region_node.discovery_path.windows(2) {
            assert!(result.graph.edges().iter().any(|e| e.source == pair[0] && e.target == pair[1]));
        }
    }

    #[tokio::test]
    async fn reverse_direction_walks_the_built_graph_backwards() {
        let provider_gvr = Gvr::new("aws.platform.kubecore.io", "v1", "providerconfigs");
        let client = Arc::new(FakeClusterClient::new().with_object(
            provider_gvr,
            None,
            "aws-default".into(),
            json!({"metadata": {"name": "aws-default"}, "spec": {"region": "us-east-1"}}),
        ));
        let mut config = kube_cluster_config();
        config.direction = TraversalDirection::Reverse;
        let engine = TraversalEngine::new(client, config);
        let root = TraversalRoot::new(
            ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "prod"),
            json!({
                "metadata": {"name": "prod", "namespace": "default"},
                "spec": {"providerConfigRef": "aws-default"}
            }),
        );

        let result = engine.run_traversal(vec![root]).await.unwrap();
        assert_eq!(result.graph.len(), 2);
        assert!(!result.reverse_order.is_empty());
        assert!(result.steps.iter().any(|s| s.action == "reverse_bfs"));
    }

    #[tokio::test]
    async fn repeated_reference_to_the_same_target_is_served_from_cache() {
        let provider_gvr = Gvr::new("aws.platform.kubecore.io", "v1", "providerconfigs");
        let client = Arc::new(FakeClusterClient::new().with_object(
            provider_gvr,
            None,
            "aws-default".into(),
            json!({"metadata": {"name": "aws-default"}}),
        ));
        let mut config = kube_cluster_config();
        config.cache_enabled = true;
        config.max_depth = 2;
        let engine = TraversalEngine::new(client, config);

        let roots = vec![
            TraversalRoot::new(
                ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "a"),
                json!({"metadata": {"name": "a", "namespace": "default"}, "spec": {"providerConfigRef": "aws-default"}}),
            ),
            TraversalRoot::new(
                ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "b"),
                json!({"metadata": {"name": "b", "namespace": "default"}, "spec": {"providerConfigRef": "aws-default"}}),
            ),
        ];

        let result = engine.run_traversal(roots).await.unwrap();
        assert!(result.metrics.cache_hits > 0);
    }

    #[tokio::test]
    async fn batching_by_kind_still_resolves_every_reference() {
        let provider_gvr = Gvr::new("aws.platform.kubecore.io", "v1", "providerconfigs");
        let client = Arc::new(FakeClusterClient::new().with_object(
            provider_gvr,
            None,
            "aws-default".into(),
            json!({"metadata": {"name": "aws-default"}}),
        ));
        let mut config = kube_cluster_config();
        config.batching = Some(crate::config::BatchingConfig {
            group_by: BatchKey::Kind,
            batch_size: 1,
            max_concurrent_batches: 2,
        });
        let engine = TraversalEngine::new(client, config);

        let roots = vec![
            TraversalRoot::new(
                ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "a"),
                json!({"metadata": {"name": "a", "namespace": "default"}, "spec": {"providerConfigRef": "aws-default"}}),
            ),
            TraversalRoot::new(
                ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "b"),
                json!({"metadata": {"name": "b", "namespace": "default"}, "spec": {"providerConfigRef": "aws-default"}}),
            ),
        ];

        let result = engine.run_traversal(roots).await.unwrap();
        assert_eq!(result.graph.len(), 3);
        assert_eq!(result.graph.edges().len(), 2);
    }

    #[tokio::test]
    async fn stops_at_max_depth_without_failing() {
        let mut config = kube_cluster_config();
        config.max_depth = 0;
        let client = Arc::new(FakeClusterClient::new());
        let engine = TraversalEngine::new(client, config);
        let root = TraversalRoot::new(
            ResourceRef::new("platform.kubecore.io/v1", "KubeCluster", Some("default".into()), "prod"),
            json!({"metadata": {"name": "prod"}, "spec": {"providerConfigRef": "aws-default"}}),
        );

        let result = engine.run_traversal(vec![root]).await.unwrap();
        assert_eq!(result.termination_reason, TerminationReason::MaxDepth);
        assert_eq!(result.graph.len(), 1);
    }

    #[tokio::test]
    async fn owner_reference_is_followed_with_full_confidence() {
        let rs_gvr = Gvr::new("apps", "v1", "replicasets");
        let client = Arc::new(FakeClusterClient::new().with_object(
            rs_gvr,
            Some("default".into()),
            "web-rs".into(),
            json!({"metadata": {"name": "web-rs", "namespace": "default"}}),
        ));
        let mut config = kube_cluster_config();
        config.scope_filter.platform_only = false;
        let engine = TraversalEngine::new(client, config);
        let root = TraversalRoot::new(
            ResourceRef::new("v1", "Pod", Some("default".into()), "web-0"),
            json!({
                "metadata": {
                    "name": "web-0",
                    "namespace": "default",
                    "ownerReferences": [{"apiVersion": "apps/v1", "kind": "ReplicaSet", "name": "web-rs"}]
                }
            }),
        );

        let result = engine.run_traversal(vec![root]).await.unwrap();
        assert_eq!(result.graph.len(), 2);
        let edge = &result.graph.edges()[0];
        assert_eq!(edge.detection_method, DetectionMethod::OwnerReference);
        assert_eq!(edge.confidence, 1.0);
    }

    #[tokio::test]
    async fn fails_fast_when_a_cycle_is_detected_and_policy_is_fail() {
        let a_gvr = Gvr::new("example.com", "v1", "widgets");
        let client = Arc::new(
            FakeClusterClient::new()
                .with_object(
                    a_gvr.clone(),
                    Some("default".into()),
                    "a".into(),
                    json!({"metadata": {"name": "a"}, "spec": {"widgetRef": "b"}}),
                )
                .with_object(
                    a_gvr,
                    Some("default".into()),
                    "b".into(),
                    json!({"metadata": {"name": "b"}, "spec": {"widgetRef": "a"}}),
                ),
        );
        let mut config = kube_cluster_config();
        config.ref_patterns = vec![ReferencePattern {
            pattern: "widgetRef".into(),
            target_kind: Some("Widget".into()),
            target_group: Some("example.com".into()),
            ref_type: RefType::Custom,
            confidence: 0.9,
        }];
        config.scope_filter.platform_only = false;
        config.max_depth = 5;
        config.on_cycle_detected = OnCycleDetected::Fail;

        let engine = TraversalEngine::new(client, config);
        let root = TraversalRoot::new(
            ResourceRef::new("example.com/v1", "Widget", Some("default".into()), "a"),
            json!({"metadata": {"name": "a"}, "spec": {"widgetRef": "b"}}),
        );

        let err = engine.run_traversal(vec![root]).await.unwrap_err();
        assert!(matches!(err, EngineError::CycleDetected { .. }));
        assert!(err.partial().cycles.has_cycle);
    }
}
