//! Shard related types.
//!
//! A [Shard] is a handle to one independent backend node holding a
//! disjoint portion of the overall key space.

use crate::*;
use std::sync::Arc;

fn default_weight() -> u32 {
    1
}

/// Describes one backend node.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardInfo {
    /// A human-readable name for the shard, used in logs.
    pub name: String,

    /// The relative share of the key space this shard should own when
    /// routing single-key commands. Must be greater than zero.
    ///
    /// Default: 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl ShardInfo {
    /// Construct a shard info with the default weight.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: default_weight(),
        }
    }

    /// Construct a shard info with an explicit weight.
    pub fn with_weight(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Represents one backend node.
///
/// Every method may block on network I/O and may fail.
pub trait Shard: 'static + Send + Sync + std::fmt::Debug {
    /// The info this shard was constructed from.
    fn info(&self) -> &ShardInfo;

    /// Get the value stored at `key`.
    fn get(&self, key: String) -> BoxFut<'_, SkResult<Option<String>>>;

    /// Set the value stored at `key`, replacing any existing value.
    fn set(&self, key: String, value: String) -> BoxFut<'_, SkResult<()>>;

    /// Append `value` to the value stored at `key`, creating it if absent.
    /// Returns the length in bytes of the value after the append.
    fn append(&self, key: String, value: String)
        -> BoxFut<'_, SkResult<u64>>;

    /// Return up to `limit` of this shard's keys that are greater than or
    /// equal to `start_key`, in ascending byte-wise order.
    fn range_keys(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<Vec<String>>>;

    /// Return up to `limit` of this shard's key-value pairs whose key is
    /// greater than or equal to `start_key`, in ascending key order.
    fn range_entries(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<Vec<(String, String)>>>;

    /// Close the connection to the backend node.
    fn close(&self) -> BoxFut<'_, SkResult<()>>;
}

/// Trait-object [Shard].
pub type DynShard = Arc<dyn Shard>;

/// A factory for constructing [Shard] instances.
pub trait ShardFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> SkResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &Config) -> SkResult<()>;

    /// Construct a shard handle for the node described by `info`.
    fn create(
        &self,
        builder: Arc<Builder>,
        info: ShardInfo,
    ) -> BoxFut<'static, SkResult<DynShard>>;
}

/// Trait-object [ShardFactory].
pub type DynShardFactory = Arc<dyn ShardFactory>;
