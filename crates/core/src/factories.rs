//! Factories for generating instances of shardkv modules.

pub mod core_sharded;
pub use core_sharded::{CoreSharded, CoreShardedFactory};

pub mod core_shard_selector;
pub use core_shard_selector::{CoreShardSelector, CoreShardSelectorFactory};

pub mod mem_shard;
pub use mem_shard::{MemShard, MemShardFactory};
