//! Builder-related types.

use crate::*;
use std::sync::Arc;

/// The general shardkv builder.
/// This contains both configuration and factory instances,
/// allowing construction of runtime module instances.
#[derive(Debug)]
pub struct Builder {
    /// The module configuration to be used when building modules.
    /// This can be loaded from disk or modified before freezing the builder.
    pub config: Config,

    /// The [ShardFactory] to be used for creating a [Shard] handle
    /// for each configured node.
    pub shard: DynShardFactory,

    /// The [ShardSelectorFactory] to be used for creating the
    /// [ShardSelector] that routes single-key commands.
    pub selector: DynShardSelectorFactory,

    /// The [ShardedFactory] to be used for creating the [Sharded]
    /// client itself.
    pub sharded: DynShardedFactory,
}

impl Builder {
    /// Construct a default config given the configured module factories.
    /// Note, this should be called before [Builder::build].
    pub fn with_default_config(mut self) -> SkResult<Self> {
        {
            let Self {
                config,
                shard,
                selector,
                sharded,
            } = &mut self;

            shard.default_config(config)?;
            selector.default_config(config)?;
            sharded.default_config(config)?;
        }

        Ok(self)
    }

    /// Validate the config with every configured module factory.
    pub fn validate_config(&self) -> SkResult<()> {
        self.shard.validate_config(&self.config)?;
        self.selector.validate_config(&self.config)?;
        self.sharded.validate_config(&self.config)?;

        Ok(())
    }

    /// Generate a sharded client over the nodes described by `shards`,
    /// in registry order.
    pub async fn build(self, shards: Vec<ShardInfo>) -> SkResult<DynSharded> {
        self.validate_config()?;
        let builder = Arc::new(self);
        builder.sharded.create(builder.clone(), shards).await
    }
}
