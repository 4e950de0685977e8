//! Execution-scoped object cache (spec §4.F "execution-scoped cache").
//!
//! Unlike [`kubegraph_discovery::cache`]'s `TtlCache`, which lives as long
//! as its owning `CrdDiscoverer`/`ReferenceResolver`, this cache is created
//! fresh per [`crate::engine::TraversalEngine::run_traversal`] call and
//! dropped at the end of it. It exists to absorb duplicate `GetObject`
//! calls when the same target is reached through more than one reference
//! before the frontier tracker's dedup check has registered it (§2
//! SPEC_FULL "background cache sweeper as an explicit `JoinHandle` aborted
//! on drop").

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

pub struct ExecutionCache<K, V> {
    inner: Arc<Inner<K, V>>,
    sweeper: JoinHandle<()>,
}

impl<K, V> ExecutionCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// §4.F "A background sweeper fires at `TTL/4`".
    pub fn new(ttl: Duration) -> Self {
        let sweep_interval = (ttl / 4).max(Duration::from_millis(1));
        Self::with_sweep_interval(ttl, sweep_interval)
    }

    pub fn with_sweep_interval(ttl: Duration, sweep_interval: Duration) -> Self {
        let inner = Arc::new(Inner {
            entries: RwLock::new(HashMap::new()),
            ttl,
        });
        let sweeper_inner = inner.clone();
        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                interval.tick().await;
                let now = Instant::now();
                sweeper_inner.entries.write().unwrap().retain(|_, entry| entry.expires_at > now);
            }
        });
        Self { inner, sweeper }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.inner.entries.write().unwrap();
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.inner.ttl,
            },
        );
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.inner.entries.write().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().unwrap().len()
    }
}

impl<K, V> Drop for ExecutionCache<K, V> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}
