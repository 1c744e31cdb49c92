#![deny(missing_docs)]
//! Shardkv client-side partitioning over independent backend shards.
//!
//! Single-key commands are routed to the one shard that owns the key.
//! Forward range iteration is scattered to every shard concurrently and
//! the answers that arrive before the round deadline are merged into one
//! globally ordered, deduplicated, size-bounded result.

use shardkv_api::*;

pub mod aggregator;
pub use aggregator::{Aggregator, ScatterOutcome};

mod merge;

/// Construct a default builder.
///
/// - `shard` - The default shard module is [factories::MemShardFactory].
/// - `selector` - The default selector is
///   [factories::CoreShardSelectorFactory].
/// - `sharded` - The default client is [factories::CoreShardedFactory].
pub fn default_builder() -> Builder {
    Builder {
        config: Config::default(),
        shard: factories::MemShardFactory::create(),
        selector: factories::CoreShardSelectorFactory::create(),
        sharded: factories::CoreShardedFactory::create(),
    }
}

pub mod factories;
