//! The top-level sharded client api.

use crate::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

/// A client that spreads a key space across a fixed set of shards.
///
/// Single-key commands are routed to exactly one shard. Forward range
/// iteration is fanned out to every shard and merged into one globally
/// ordered, deduplicated, size-bounded result.
pub trait Sharded: 'static + Send + Sync + std::fmt::Debug {
    /// The shards this client fans out to.
    fn registry(&self) -> &ShardRegistry;

    /// The shard owning `key`.
    fn shard_for(&self, key: &str) -> DynShard;

    /// The info of the shard owning `key`.
    fn shard_info_for(&self, key: &str) -> ShardInfo {
        self.shard_for(key).info().clone()
    }

    /// Get the value stored at `key` from its owning shard.
    fn get(&self, key: String) -> BoxFut<'_, SkResult<Option<String>>>;

    /// Set the value stored at `key` on its owning shard.
    fn set(&self, key: String, value: String) -> BoxFut<'_, SkResult<()>>;

    /// Append to the value stored at `key` on its owning shard.
    /// Returns the length in bytes of the value after the append.
    fn append(&self, key: String, value: String)
        -> BoxFut<'_, SkResult<u64>>;

    /// Up to `limit` keys greater than or equal to `start_key`, across
    /// all shards, in ascending order. Uses the configured deadline.
    ///
    /// Shards that fail or do not answer before the deadline contribute
    /// nothing; this is not reported as an error. Only a failure to
    /// dispatch the shard requests at all is returned as an error.
    fn forward_keys(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<BTreeSet<String>>> {
        self.forward_keys_with_deadline(start_key, limit, None)
    }

    /// As [Sharded::forward_keys], overriding the configured deadline
    /// when `deadline` is `Some`.
    fn forward_keys_with_deadline(
        &self,
        start_key: String,
        limit: usize,
        deadline: Option<Duration>,
    ) -> BoxFut<'_, SkResult<BTreeSet<String>>>;

    /// Up to `limit` key-value pairs with keys greater than or equal to
    /// `start_key`, across all shards, in ascending key order.
    /// Uses the configured deadline.
    ///
    /// The same partial-failure rules as [Sharded::forward_keys] apply.
    fn forward_keys_and_values(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<BTreeMap<String, String>>> {
        self.forward_keys_and_values_with_deadline(start_key, limit, None)
    }

    /// As [Sharded::forward_keys_and_values], overriding the configured
    /// deadline when `deadline` is `Some`.
    fn forward_keys_and_values_with_deadline(
        &self,
        start_key: String,
        limit: usize,
        deadline: Option<Duration>,
    ) -> BoxFut<'_, SkResult<BTreeMap<String, String>>>;

    /// Close every shard. All shards are attempted even if some fail.
    fn disconnect(&self) -> BoxFut<'_, SkResult<()>>;
}

/// Trait-object [Sharded].
pub type DynSharded = Arc<dyn Sharded>;

/// A factory for constructing [Sharded] instances.
pub trait ShardedFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> SkResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &Config) -> SkResult<()>;

    /// Construct a sharded client over the nodes described by `shards`,
    /// in registry order.
    fn create(
        &self,
        builder: Arc<Builder>,
        shards: Vec<ShardInfo>,
    ) -> BoxFut<'static, SkResult<DynSharded>>;
}

/// Trait-object [ShardedFactory].
pub type DynShardedFactory = Arc<dyn ShardedFactory>;
