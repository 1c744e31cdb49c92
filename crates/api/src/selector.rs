//! Shard selection for single-key commands.

use crate::*;
use std::sync::Arc;

/// Picks the shard owning a key.
///
/// Implementations must be deterministic for their lifetime: the same key
/// always resolves to the same registry index.
pub trait ShardSelector: 'static + Send + Sync + std::fmt::Debug {
    /// The registry index of the shard owning `key`.
    fn resolve(&self, key: &str) -> usize;
}

/// Trait-object [ShardSelector].
pub type DynShardSelector = Arc<dyn ShardSelector>;

/// A factory for constructing [ShardSelector] instances.
pub trait ShardSelectorFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> SkResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &Config) -> SkResult<()>;

    /// Construct a selector over `shards`, given in registry order.
    fn create(
        &self,
        builder: Arc<Builder>,
        shards: Vec<ShardInfo>,
    ) -> SkResult<DynShardSelector>;
}

/// Trait-object [ShardSelectorFactory].
pub type DynShardSelectorFactory = Arc<dyn ShardSelectorFactory>;
