//! An in-memory shard implementation.

use shardkv_api::*;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard};

/// MemShard configuration types.
mod config {
    /// Configuration parameters for [MemShardFactory](super::MemShardFactory).
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct MemShardConfig {
        /// The most entries a single range scan will return, regardless
        /// of the limit requested. Zero means no cap.
        ///
        /// Default: 0.
        pub max_range_limit: u32,
    }

    /// Module-level configuration for MemShard.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct MemShardModConfig {
        /// MemShard configuration.
        pub mem_shard: MemShardConfig,
    }

    impl shardkv_api::ModConfig for MemShardModConfig {}
}

pub use config::*;

/// A factory for in-memory shards.
///
/// Every shard created holds its own ordered map. Nothing is persisted,
/// so this is useful for embedding and for tests.
#[derive(Debug)]
pub struct MemShardFactory {}

impl MemShardFactory {
    /// Construct a new MemShardFactory.
    pub fn create() -> DynShardFactory {
        let out: DynShardFactory = Arc::new(Self {});
        out
    }
}

impl ShardFactory for MemShardFactory {
    fn default_config(&self, config: &mut Config) -> SkResult<()> {
        config.set_module_config(&MemShardModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> SkResult<()> {
        config.get_module_config::<MemShardModConfig>().map(|_| ())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
        info: ShardInfo,
    ) -> BoxFut<'static, SkResult<DynShard>> {
        Box::pin(async move {
            let config: MemShardModConfig =
                builder.config.get_module_config()?;
            let out: DynShard = Arc::new(MemShard::new(info, config.mem_shard));
            Ok(out)
        })
    }
}

/// A shard holding its data in an in-memory ordered map.
pub struct MemShard {
    info: ShardInfo,
    config: MemShardConfig,
    data: Mutex<BTreeMap<String, String>>,
}

impl std::fmt::Debug for MemShard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemShard")
            .field("info", &self.info)
            .finish()
    }
}

impl MemShard {
    /// Construct a new, empty in-memory shard.
    pub fn new(info: ShardInfo, config: MemShardConfig) -> Self {
        Self {
            info,
            config,
            data: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> SkResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.data.lock().map_err(|_| {
            SkError::other(format!("shard {} data lock poisoned", self.info.name))
        })
    }

    fn effective_limit(&self, limit: usize) -> usize {
        match self.config.max_range_limit {
            0 => limit,
            max => limit.min(max as usize),
        }
    }

    fn scan<T>(
        &self,
        start_key: &str,
        limit: usize,
        f: impl Fn(&String, &String) -> T,
    ) -> SkResult<Vec<T>> {
        let limit = self.effective_limit(limit);
        Ok(self
            .lock()?
            .range::<str, _>((Bound::Included(start_key), Bound::Unbounded))
            .take(limit)
            .map(|(k, v)| f(k, v))
            .collect())
    }
}

impl Shard for MemShard {
    fn info(&self) -> &ShardInfo {
        &self.info
    }

    fn get(&self, key: String) -> BoxFut<'_, SkResult<Option<String>>> {
        let r = self.lock().map(|data| data.get(&key).cloned());
        Box::pin(async move { r })
    }

    fn set(&self, key: String, value: String) -> BoxFut<'_, SkResult<()>> {
        let r = self.lock().map(|mut data| {
            data.insert(key, value);
        });
        Box::pin(async move { r })
    }

    fn append(
        &self,
        key: String,
        value: String,
    ) -> BoxFut<'_, SkResult<u64>> {
        let r = self.lock().map(|mut data| {
            let stored = data.entry(key).or_default();
            stored.push_str(&value);
            stored.len() as u64
        });
        Box::pin(async move { r })
    }

    fn range_keys(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<Vec<String>>> {
        let r = self.scan(&start_key, limit, |k, _| k.clone());
        Box::pin(async move { r })
    }

    fn range_entries(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<Vec<(String, String)>>> {
        let r = self.scan(&start_key, limit, |k, v| (k.clone(), v.clone()));
        Box::pin(async move { r })
    }

    fn close(&self) -> BoxFut<'_, SkResult<()>> {
        tracing::trace!(shard = %self.info.name, "closing mem shard");
        Box::pin(async move { Ok(()) })
    }
}
