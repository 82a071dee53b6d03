use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use derive_more::Debug;
use nodeflow_core::{BoxedError, Inputs, Node, TAG_CACHE, Value, ValueMap};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{
    CacheConfig, CacheFormat, DEFAULT_CACHE_FORMAT, ExecutionContext, GraphAdapter,
    TRACING_TARGET, halt_on_failed_check, planned_node,
};
use crate::error::{Error, ExecutionError, Result};
use crate::graph::FunctionGraph;
use crate::planner::ExecutionPlan;

/// Memoized values keyed by node name and input fingerprint.
///
/// A node whose upstream value changed gets a new key, so stale entries are
/// never served; they age out through eviction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    node: String,
    fingerprint: String,
}

impl CacheKey {
    fn new(node: &str, inputs: &Inputs) -> Self {
        let sorted: BTreeMap<&str, &Value> = inputs.iter().collect();
        let mut hasher = Sha256::new();
        for (name, value) in sorted {
            hasher.update(name.as_bytes());
            hasher.update([0]);
            hasher.update(value.to_string().as_bytes());
            hasher.update([0]);
        }

        Self {
            node: node.to_owned(),
            fingerprint: hex::encode(hasher.finalize()),
        }
    }
}

#[derive(Debug, Default)]
struct CacheStore {
    entries: HashMap<CacheKey, Value>,
    order: VecDeque<CacheKey>,
}

impl CacheStore {
    fn insert(&mut self, key: CacheKey, value: Value, capacity: usize) {
        if self.entries.insert(key.clone(), value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    fn remove_node(&mut self, node: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.node != node);
        self.order.retain(|key| key.node != node);
        before - self.entries.len()
    }
}

/// Counters reported by [`CachingAdapter::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to compute the node.
    pub misses: u64,
    /// Values currently held in memory.
    pub entries: usize,
}

/// Where one cacheable node is looked up and stored.
enum Slot<'a> {
    Memory(CacheKey),
    Disk {
        path: PathBuf,
        format: &'a CacheFormat,
    },
}

/// Executes plan steps sequentially, memoizing node values.
///
/// Nodes tagged `cache` are memoized, or every function node when
/// [`CacheConfig::cache_all`] is set. Validators always run. Nodes listed
/// with [`CachingAdapter::with_force_compute`] are always recomputed, and a
/// node is recomputed whenever a dependency was computed in the same run.
///
/// Values stay in a bounded in-memory store unless [`CacheConfig::cache_path`]
/// is set. Then each node is persisted to `<cache_path>/<node>.<format>`, the
/// format being the node's `cache` tag value (`json` for untagged nodes under
/// `cache_all`). Persisted entries are keyed by node name only and survive
/// adapter instances; they are refreshed by forcing or invalidating a node.
#[derive(Debug)]
pub struct CachingAdapter {
    config: CacheConfig,
    force_compute: HashSet<String>,
    #[debug(skip)]
    formats: HashMap<String, CacheFormat>,
    #[debug(skip)]
    store: Mutex<CacheStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachingAdapter {
    /// Creates a caching adapter with an empty cache and the `json` format.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            force_compute: HashSet::new(),
            formats: HashMap::from([(DEFAULT_CACHE_FORMAT.to_owned(), CacheFormat::json())]),
            store: Mutex::new(CacheStore::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Always recomputes the given nodes.
    pub fn with_force_compute<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.force_compute.extend(names.into_iter().map(Into::into));
        self
    }

    /// Registers a persisted format under a `cache` tag value.
    pub fn with_format(mut self, name: impl Into<String>, format: CacheFormat) -> Self {
        self.formats.insert(name.into(), format);
        self
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Drops every memoized value of `node`, returning how many were held.
    ///
    /// Persisted files of the node are removed in every registered format.
    pub async fn invalidate(&self, node: &str) -> Result<usize> {
        let mut removed = self.store.lock().await.remove_node(node);

        if let Some(dir) = &self.config.cache_path {
            for format in self.formats.keys() {
                let path = dir.join(format!("{node}.{format}"));
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                    Err(error) => {
                        return Err(ExecutionError::CacheAccess {
                            node: node.to_owned(),
                            path,
                            source: error.into(),
                        }
                        .into());
                    }
                }
            }
        }

        tracing::debug!(target: TRACING_TARGET, node, removed, "Cache invalidated");
        Ok(removed)
    }

    /// Drops every value held in memory. Persisted files are kept.
    pub async fn clear(&self) {
        let mut store = self.store.lock().await;
        store.entries.clear();
        store.order.clear();
    }

    /// Returns hit, miss and size counters.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.store.lock().await.entries.len(),
        }
    }

    /// Returns the cache format of `node`, or `None` when it is not memoized.
    fn cache_format<'n>(&self, node: &'n Node) -> Option<&'n str> {
        if node.is_validator() {
            return None;
        }
        match node.tag(TAG_CACHE) {
            Some(format) => Some(format),
            None if self.config.cache_all => Some(DEFAULT_CACHE_FORMAT),
            None => None,
        }
    }

    fn format(&self, node: &str, format: &str) -> Result<&CacheFormat> {
        self.formats.get(format).ok_or_else(|| {
            Error::Configuration(format!("invalid cache format '{format}' on node '{node}'"))
        })
    }

    /// Fails before any node runs if a planned node names an unknown format.
    fn check_formats(&self, plan: &ExecutionPlan, graph: &FunctionGraph) -> Result<()> {
        if self.config.cache_path.is_none() {
            return Ok(());
        }
        for name in plan.steps() {
            let node = planned_node(graph, name)?;
            if let Some(format) = self.cache_format(node) {
                self.format(name, format)?;
            }
        }
        Ok(())
    }

    fn slot(&self, node: &str, format: &str, arguments: &Inputs) -> Result<Slot<'_>> {
        match &self.config.cache_path {
            Some(dir) => Ok(Slot::Disk {
                path: dir.join(format!("{node}.{format}")),
                format: self.format(node, format)?,
            }),
            None => Ok(Slot::Memory(CacheKey::new(node, arguments))),
        }
    }

    async fn load(&self, node: &str, slot: &Slot<'_>) -> Result<Option<Value>> {
        match slot {
            Slot::Memory(key) => Ok(self.store.lock().await.entries.get(key).cloned()),
            Slot::Disk { path, format } => {
                if !path.is_file() {
                    return Ok(None);
                }
                let value = (format.reader)(path.as_path()).map_err(|source| {
                    ExecutionError::CacheAccess {
                        node: node.to_owned(),
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(Some(value))
            }
        }
    }

    async fn save(&self, node: &str, slot: Slot<'_>, value: &Value) -> Result<()> {
        match slot {
            Slot::Memory(key) => {
                self.store
                    .lock()
                    .await
                    .insert(key, value.clone(), self.config.capacity);
            }
            Slot::Disk { path, format } => {
                let access = |source: BoxedError| ExecutionError::CacheAccess {
                    node: node.to_owned(),
                    path: path.clone(),
                    source,
                };
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir).map_err(|error| access(error.into()))?;
                }
                (format.writer)(value, path.as_path()).map_err(access)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GraphAdapter for CachingAdapter {
    fn name(&self) -> &'static str {
        "caching"
    }

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        graph: &FunctionGraph,
        inputs: &ValueMap,
    ) -> Result<ExecutionContext> {
        self.config.validate()?;
        self.check_formats(plan, graph)?;

        let mut context = ExecutionContext::seeded(inputs);
        let mut computed: HashSet<&str> = HashSet::new();

        for name in plan.steps() {
            let node = planned_node(graph, name)?;
            let arguments = context.inputs_for(node)?;
            let forced = self.force_compute.contains(name)
                || node
                    .dependencies()
                    .iter()
                    .any(|dependency| computed.contains(dependency.name.as_str()));

            let slot = match self.cache_format(node) {
                Some(format) => Some(self.slot(name, format, &arguments)?),
                None => None,
            };
            if let Some(slot) = &slot {
                let cached = if forced {
                    None
                } else {
                    self.load(name, slot).await?
                };
                if let Some(value) = cached {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(target: TRACING_TARGET, node = %name, "Cache hit");
                    context.record(name.clone(), value)?;
                    tokio::task::yield_now().await;
                    continue;
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
            }

            let value = node
                .call(&arguments)
                .map_err(|source| ExecutionError::node_failed(name, source))?;
            halt_on_failed_check(node, &value)?;

            if forced || slot.is_some() {
                computed.insert(name.as_str());
            }
            if let Some(slot) = slot {
                tracing::trace!(target: TRACING_TARGET, node = %name, forced, "Cache store");
                self.save(name, slot, &value).await?;
            }
            context.record(name.clone(), value)?;
            tokio::task::yield_now().await;
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use nodeflow_test::CallCounter;
    use serde_json::json;

    use super::*;
    use crate::adapter::CacheConfigBuilder;
    use crate::function::{FunctionDef, Param};
    use crate::graph::GraphBuilder;
    use crate::planner::Planner;

    struct Fixture {
        graph: FunctionGraph,
        source: CallCounter,
        doubled: CallCounter,
    }

    fn fixture() -> Fixture {
        let source = CallCounter::new();
        let doubled = CallCounter::new();
        let source_calls = source.clone();
        let doubled_calls = doubled.clone();

        let graph = GraphBuilder::new()
            .with_function(
                FunctionDef::new("source", vec![Param::new("seed")], move |inputs| {
                    source_calls.hit();
                    Ok(json!(inputs.get_i64("seed")? * 10))
                })
                .with_tag(TAG_CACHE, "json"),
            )
            .with_function(
                FunctionDef::new("doubled", vec![Param::new("source")], move |inputs| {
                    doubled_calls.hit();
                    Ok(json!(inputs.get_i64("source")? * 2))
                })
                .with_tag(TAG_CACHE, "json"),
            )
            .with_external_input("seed")
            .build()
            .unwrap();

        Fixture {
            graph,
            source,
            doubled,
        }
    }

    fn on_disk(dir: &Path) -> CacheConfig {
        CacheConfigBuilder::default().cache_path(dir).build().unwrap()
    }

    async fn execute(
        adapter: &CachingAdapter,
        graph: &FunctionGraph,
        requested: &str,
        seed: i64,
    ) -> Result<ExecutionContext> {
        let provided = ValueMap::from([("seed".to_owned(), json!(seed))]);
        let plan = Planner::new(graph).plan(&[requested.to_owned()], &provided)?;
        adapter.execute(&plan, graph, &provided).await
    }

    async fn run(adapter: &CachingAdapter, graph: &FunctionGraph, seed: i64) -> Value {
        let context = execute(adapter, graph, "doubled", seed).await.unwrap();
        context.get("doubled").cloned().expect("doubled should be recorded")
    }

    #[tokio::test]
    async fn tagged_nodes_are_served_from_cache() {
        let fixture = fixture();
        let adapter = CachingAdapter::new(CacheConfig::default());

        assert_eq!(run(&adapter, &fixture.graph, 1).await, json!(20));
        assert_eq!(run(&adapter, &fixture.graph, 1).await, json!(20));
        assert_eq!(fixture.source.count(), 1);
        assert_eq!(fixture.doubled.count(), 1);

        let stats = adapter.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.entries), (2, 2, 2));
    }

    #[tokio::test]
    async fn changed_inputs_recompute_downstream() {
        let fixture = fixture();
        let adapter = CachingAdapter::new(CacheConfig::default());

        run(&adapter, &fixture.graph, 1).await;
        assert_eq!(run(&adapter, &fixture.graph, 2).await, json!(40));
        assert_eq!(fixture.source.count(), 2);
        assert_eq!(fixture.doubled.count(), 2);
    }

    #[tokio::test]
    async fn forced_nodes_recompute_their_dependents() {
        let fixture = fixture();
        let adapter =
            CachingAdapter::new(CacheConfig::default()).with_force_compute(["source"]);

        run(&adapter, &fixture.graph, 1).await;
        run(&adapter, &fixture.graph, 1).await;
        assert_eq!(fixture.source.count(), 2);
        assert_eq!(fixture.doubled.count(), 2);
    }

    #[tokio::test]
    async fn invalidation_and_eviction_drop_entries() {
        let fixture = fixture();
        let adapter = CachingAdapter::new(CacheConfig::default());
        run(&adapter, &fixture.graph, 1).await;

        assert_eq!(adapter.invalidate("doubled").await.unwrap(), 1);
        run(&adapter, &fixture.graph, 1).await;
        assert_eq!(fixture.source.count(), 1);
        assert_eq!(fixture.doubled.count(), 2);

        let config = CacheConfigBuilder::default()
            .capacity(1_usize)
            .build()
            .unwrap();
        let small = CachingAdapter::new(config);
        run(&small, &fixture.graph, 1).await;
        assert_eq!(small.stats().await.entries, 1);

        adapter.clear().await;
        assert_eq!(adapter.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn persisted_values_outlive_the_adapter() {
        let dir = tempfile::TempDir::new().unwrap();
        let fixture = fixture();

        let first = CachingAdapter::new(on_disk(dir.path()));
        assert_eq!(run(&first, &fixture.graph, 1).await, json!(20));
        assert!(dir.path().join("source.json").is_file());
        assert!(dir.path().join("doubled.json").is_file());
        drop(first);

        let second = CachingAdapter::new(on_disk(dir.path()));
        assert_eq!(run(&second, &fixture.graph, 1).await, json!(20));
        assert_eq!(fixture.source.count(), 1);
        assert_eq!(fixture.doubled.count(), 1);

        let stats = second.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.entries), (2, 0, 0));
    }

    #[tokio::test]
    async fn recomputed_upstream_nodes_refresh_persisted_dependents() {
        let dir = tempfile::TempDir::new().unwrap();
        let fixture = fixture();
        run(&CachingAdapter::new(on_disk(dir.path())), &fixture.graph, 1).await;

        let forced = CachingAdapter::new(on_disk(dir.path())).with_force_compute(["source"]);
        assert_eq!(run(&forced, &fixture.graph, 2).await, json!(40));
        assert_eq!(fixture.source.count(), 2);
        assert_eq!(fixture.doubled.count(), 2);

        let reader = CachingAdapter::new(on_disk(dir.path()));
        assert_eq!(run(&reader, &fixture.graph, 1).await, json!(40));
        assert_eq!(fixture.doubled.count(), 2);
    }

    #[tokio::test]
    async fn invalidation_removes_persisted_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let fixture = fixture();
        let adapter = CachingAdapter::new(on_disk(dir.path()));
        run(&adapter, &fixture.graph, 1).await;

        assert_eq!(adapter.invalidate("doubled").await.unwrap(), 1);
        assert!(!dir.path().join("doubled.json").exists());
        run(&adapter, &fixture.graph, 1).await;
        assert_eq!(fixture.source.count(), 1);
        assert_eq!(fixture.doubled.count(), 2);
    }

    #[tokio::test]
    async fn unknown_formats_are_configuration_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let calls = CallCounter::new();
        let counted = calls.clone();
        let graph = GraphBuilder::new()
            .with_function(
                FunctionDef::new("seeded", vec![Param::new("seed")], move |inputs| {
                    counted.hit();
                    Ok(json!(inputs.get_i64("seed")?))
                })
                .with_tag(TAG_CACHE, "parquet"),
            )
            .with_external_input("seed")
            .build()
            .unwrap();

        let adapter = CachingAdapter::new(on_disk(dir.path()));
        let error = execute(&adapter, &graph, "seeded", 1).await.unwrap_err();
        assert!(matches!(error, Error::Configuration(ref message) if message.contains("parquet")));
        assert_eq!(calls.count(), 0);

        let in_memory = CachingAdapter::new(CacheConfig::default());
        execute(&in_memory, &graph, "seeded", 1).await.unwrap();
    }

    #[tokio::test]
    async fn registered_formats_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let calls = CallCounter::new();
        let counted = calls.clone();
        let graph = GraphBuilder::new()
            .with_function(
                FunctionDef::new("label", Vec::new(), move |_| {
                    counted.hit();
                    Ok(json!("north"))
                })
                .with_tag(TAG_CACHE, "txt"),
            )
            .build()
            .unwrap();
        let text = || {
            CacheFormat::new(
                |value, path| Ok(std::fs::write(path, value.as_str().unwrap_or_default())?),
                |path| Ok(Value::String(std::fs::read_to_string(path)?)),
            )
        };

        for _ in 0..2 {
            let adapter = CachingAdapter::new(on_disk(dir.path())).with_format("txt", text());
            let context = execute(&adapter, &graph, "label", 0).await.unwrap();
            assert_eq!(context.get("label"), Some(&json!("north")));
        }
        assert_eq!(calls.count(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("label.txt")).unwrap(),
            "north"
        );
    }
}
