//! The core sharded client implementation provided by shardkv.

use crate::aggregator::Aggregator;
use shardkv_api::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

/// CoreSharded configuration types.
pub mod config {
    /// Configuration parameters for [CoreShardedFactory](super::CoreShardedFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreShardedConfig {
        /// How long a forward range round waits for shards to answer,
        /// in milliseconds, when the caller does not give a deadline.
        /// Shards that have not answered by then are left out of the
        /// result. Must be greater than zero.
        ///
        /// Default: 5000.
        pub range_deadline_ms: u32,
    }

    impl Default for CoreShardedConfig {
        fn default() -> Self {
            Self {
                range_deadline_ms: shardkv_api::DEFAULT_RANGE_DEADLINE_MS,
            }
        }
    }

    impl CoreShardedConfig {
        /// Get the range deadline as a [std::time::Duration].
        pub fn range_deadline(&self) -> std::time::Duration {
            std::time::Duration::from_millis(self.range_deadline_ms as u64)
        }
    }

    /// Module-level configuration for CoreSharded.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreShardedModConfig {
        /// CoreSharded configuration.
        pub core_sharded: CoreShardedConfig,
    }

    impl shardkv_api::ModConfig for CoreShardedModConfig {}
}

pub use config::*;

/// The core sharded client factory.
/// You probably will have no reason to use something other than this.
/// This abstraction is mainly here for testing purposes.
#[derive(Debug)]
pub struct CoreShardedFactory {}

impl CoreShardedFactory {
    /// Construct a new CoreShardedFactory.
    pub fn create() -> DynShardedFactory {
        let out: DynShardedFactory = Arc::new(Self {});
        out
    }
}

impl ShardedFactory for CoreShardedFactory {
    fn default_config(&self, config: &mut Config) -> SkResult<()> {
        config.set_module_config(&CoreShardedModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> SkResult<()> {
        let config: CoreShardedModConfig = config.get_module_config()?;
        if config.core_sharded.range_deadline_ms == 0 {
            return Err(SkError::other("rangeDeadlineMs must be greater than zero"));
        }
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
        shards: Vec<ShardInfo>,
    ) -> BoxFut<'static, SkResult<DynSharded>> {
        Box::pin(async move {
            let config: CoreShardedModConfig =
                builder.config.get_module_config()?;

            let mut handles = Vec::with_capacity(shards.len());
            for info in shards.iter() {
                handles.push(
                    builder.shard.create(builder.clone(), info.clone()).await?,
                );
            }
            let registry = ShardRegistry::new(handles)?;
            let selector =
                builder.selector.create(builder.clone(), shards)?;

            let out: DynSharded = Arc::new(CoreSharded::new(
                config.core_sharded,
                registry,
                selector,
            ));
            Ok(out)
        })
    }
}

/// A sharded client over a fixed registry.
///
/// Single-key commands go to the shard picked by the selector. Forward
/// range commands go to every shard through an [Aggregator].
#[derive(Debug)]
pub struct CoreSharded {
    aggregator: Aggregator,
    selector: DynShardSelector,
}

impl CoreSharded {
    /// Construct a client from already constructed parts.
    pub fn new(
        config: CoreShardedConfig,
        registry: ShardRegistry,
        selector: DynShardSelector,
    ) -> Self {
        tracing::info!(
            shards = registry.len(),
            range_deadline = ?config.range_deadline(),
            "sharded client ready"
        );
        Self {
            aggregator: Aggregator::new(registry, config.range_deadline()),
            selector,
        }
    }

    /// The aggregator used for forward range commands.
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}

impl Sharded for CoreSharded {
    fn registry(&self) -> &ShardRegistry {
        self.aggregator.registry()
    }

    fn shard_for(&self, key: &str) -> DynShard {
        let registry = self.aggregator.registry();
        let index = self.selector.resolve(key) % registry.len();
        registry.all_shards()[index].clone()
    }

    fn get(&self, key: String) -> BoxFut<'_, SkResult<Option<String>>> {
        Box::pin(async move { self.shard_for(&key).get(key).await })
    }

    fn set(&self, key: String, value: String) -> BoxFut<'_, SkResult<()>> {
        Box::pin(async move { self.shard_for(&key).set(key, value).await })
    }

    fn append(
        &self,
        key: String,
        value: String,
    ) -> BoxFut<'_, SkResult<u64>> {
        Box::pin(async move { self.shard_for(&key).append(key, value).await })
    }

    fn forward_keys_with_deadline(
        &self,
        start_key: String,
        limit: usize,
        deadline: Option<Duration>,
    ) -> BoxFut<'_, SkResult<BTreeSet<String>>> {
        Box::pin(async move {
            let request = RangeRequest::new(start_key, limit);
            self.aggregator.forward_keys(&request, deadline).await
        })
    }

    fn forward_keys_and_values_with_deadline(
        &self,
        start_key: String,
        limit: usize,
        deadline: Option<Duration>,
    ) -> BoxFut<'_, SkResult<BTreeMap<String, String>>> {
        Box::pin(async move {
            let request = RangeRequest::new(start_key, limit);
            self.aggregator
                .forward_keys_and_values(&request, deadline)
                .await
        })
    }

    fn disconnect(&self) -> BoxFut<'_, SkResult<()>> {
        Box::pin(async move {
            let mut first_err = None;
            let mut failed = 0;
            for shard in self.registry().all_shards() {
                if let Err(err) = shard.close().await {
                    tracing::warn!(
                        shard = %shard.info().name,
                        ?err,
                        "failed to close shard"
                    );
                    failed += 1;
                    first_err.get_or_insert(err);
                }
            }

            match first_err {
                None => Ok(()),
                Some(err) => Err(SkError::other_src(
                    format!("failed to close {failed} shard(s)"),
                    err,
                )),
            }
        })
    }
}
