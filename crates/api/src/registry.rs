//! The fixed, ordered collection of shards a client fans out to.

use crate::*;
use std::sync::Arc;

/// The ordered set of [Shard]s for the lifetime of a client.
///
/// The registry is set once at construction and never mutated afterward,
/// so it can be shared by any number of concurrent calls without locking.
/// Cloning is cheap: the shard list is reference counted.
#[derive(Debug, Clone)]
pub struct ShardRegistry(Arc<[DynShard]>);

impl ShardRegistry {
    /// Construct a registry from an ordered list of shard handles.
    ///
    /// Errors if `shards` is empty, or if any shard has a zero weight.
    pub fn new(shards: Vec<DynShard>) -> SkResult<Self> {
        if shards.is_empty() {
            return Err(SkError::other(
                "a shard registry requires at least one shard",
            ));
        }
        if let Some(shard) = shards.iter().find(|s| s.info().weight == 0) {
            return Err(SkError::other(format!(
                "shard {} has a weight of zero",
                shard.info().name
            )));
        }
        Ok(Self(shards.into()))
    }

    /// All shards in registry order.
    pub fn all_shards(&self) -> &[DynShard] {
        &self.0
    }

    /// The shard at registry position `index`.
    pub fn get(&self, index: usize) -> Option<&DynShard> {
        self.0.get(index)
    }

    /// The infos of all shards, in registry order.
    pub fn infos(&self) -> Vec<ShardInfo> {
        self.0.iter().map(|s| s.info().clone()).collect()
    }

    /// The number of shards.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a successfully constructed registry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug)]
    struct InfoOnly(ShardInfo);

    impl Shard for InfoOnly {
        fn info(&self) -> &ShardInfo {
            &self.0
        }

        fn get(&self, _key: String) -> BoxFut<'_, SkResult<Option<String>>> {
            Box::pin(async { Ok(None) })
        }

        fn set(
            &self,
            _key: String,
            _value: String,
        ) -> BoxFut<'_, SkResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn append(
            &self,
            _key: String,
            _value: String,
        ) -> BoxFut<'_, SkResult<u64>> {
            Box::pin(async { Ok(0) })
        }

        fn range_keys(
            &self,
            _start_key: String,
            _limit: usize,
        ) -> BoxFut<'_, SkResult<Vec<String>>> {
            Box::pin(async { Ok(vec![]) })
        }

        fn range_entries(
            &self,
            _start_key: String,
            _limit: usize,
        ) -> BoxFut<'_, SkResult<Vec<(String, String)>>> {
            Box::pin(async { Ok(vec![]) })
        }

        fn close(&self) -> BoxFut<'_, SkResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn shard(info: ShardInfo) -> DynShard {
        Arc::new(InfoOnly(info))
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(ShardRegistry::new(vec![]).is_err());
    }

    #[test]
    fn zero_weight_is_rejected() {
        let err = ShardRegistry::new(vec![
            shard(ShardInfo::new("a")),
            shard(ShardInfo::with_weight("b", 0)),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("shard b"));
    }

    #[test]
    fn registry_keeps_order() {
        let registry = ShardRegistry::new(vec![
            shard(ShardInfo::new("a")),
            shard(ShardInfo::new("b")),
            shard(ShardInfo::new("c")),
        ])
        .unwrap();

        assert_eq!(3, registry.len());
        assert!(!registry.is_empty());
        assert_eq!(
            vec!["a", "b", "c"],
            registry
                .all_shards()
                .iter()
                .map(|s| s.info().name.as_str())
                .collect::<Vec<_>>()
        );
        assert_eq!("b", registry.get(1).unwrap().info().name);
        assert!(registry.get(3).is_none());

        // clones share the same shard list
        let other = registry.clone();
        assert!(Arc::ptr_eq(&registry.all_shards()[0], &other.all_shards()[0]));
    }
}
