//! The core shard selector implementation provided by shardkv.
//!
//! Keys are hashed (sha256 unless configured otherwise) and the first 8
//! bytes of the digest, read as a big-endian integer, pick a slot in a
//! weighted slot table. Each
//! shard occupies as many slots as its weight.
//!
//! This is a plain modulo scheme. Changing the shard list remaps most keys.

use shardkv_api::*;
use sha2::{Digest, Sha256, Sha512};
use std::sync::Arc;

/// CoreShardSelector configuration types.
pub mod config {
    /// The hash function a [CoreShardSelector](super::CoreShardSelector)
    /// applies to keys.
    #[derive(
        Debug,
        Default,
        Clone,
        Copy,
        PartialEq,
        Eq,
        serde::Serialize,
        serde::Deserialize,
    )]
    #[serde(rename_all = "camelCase")]
    pub enum KeyHash {
        /// SHA-256.
        #[default]
        Sha256,
        /// SHA-512.
        Sha512,
    }

    /// Configuration parameters for
    /// [CoreShardSelectorFactory](super::CoreShardSelectorFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreShardSelectorConfig {
        /// When true, a key containing a tag delimited by `key_tag_open`
        /// and `key_tag_close` is routed by its tag alone, so keys sharing
        /// a tag land on the same shard.
        ///
        /// Default: false.
        pub use_key_tags: bool,

        /// Opening key tag delimiter. Default: "{".
        pub key_tag_open: String,

        /// Closing key tag delimiter. Default: "}".
        pub key_tag_close: String,

        /// The hash applied to keys. All clients sharing a set of shards
        /// must use the same one.
        ///
        /// Default: sha256.
        pub key_hash: KeyHash,
    }

    impl Default for CoreShardSelectorConfig {
        fn default() -> Self {
            Self {
                use_key_tags: false,
                key_tag_open: "{".into(),
                key_tag_close: "}".into(),
                key_hash: KeyHash::default(),
            }
        }
    }

    /// Module-level configuration for CoreShardSelector.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreShardSelectorModConfig {
        /// CoreShardSelector configuration.
        pub core_shard_selector: CoreShardSelectorConfig,
    }

    impl shardkv_api::ModConfig for CoreShardSelectorModConfig {}
}

use config::*;

/// The core shard selector factory.
#[derive(Debug)]
pub struct CoreShardSelectorFactory {}

impl CoreShardSelectorFactory {
    /// Construct a new CoreShardSelectorFactory.
    pub fn create() -> DynShardSelectorFactory {
        let out: DynShardSelectorFactory = Arc::new(Self {});
        out
    }
}

impl ShardSelectorFactory for CoreShardSelectorFactory {
    fn default_config(&self, config: &mut Config) -> SkResult<()> {
        config.set_module_config(&CoreShardSelectorModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> SkResult<()> {
        let config: CoreShardSelectorModConfig = config.get_module_config()?;
        let config = config.core_shard_selector;
        if config.use_key_tags
            && (config.key_tag_open.is_empty()
                || config.key_tag_close.is_empty())
        {
            return Err(SkError::other(
                "key tag delimiters must not be empty when key tags are used",
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
        shards: Vec<ShardInfo>,
    ) -> SkResult<DynShardSelector> {
        let config: CoreShardSelectorModConfig =
            builder.config.get_module_config()?;
        let out: DynShardSelector = Arc::new(CoreShardSelector::new(
            config.core_shard_selector,
            &shards,
        )?);
        Ok(out)
    }
}

/// Weighted hash-modulo shard selection.
#[derive(Debug)]
pub struct CoreShardSelector {
    config: CoreShardSelectorConfig,
    slots: Vec<usize>,
}

impl CoreShardSelector {
    /// Construct a selector over `shards`, given in registry order.
    pub fn new(
        config: CoreShardSelectorConfig,
        shards: &[ShardInfo],
    ) -> SkResult<Self> {
        let mut slots = Vec::new();
        for (index, info) in shards.iter().enumerate() {
            if info.weight == 0 {
                return Err(SkError::other(format!(
                    "shard {} has a weight of zero",
                    info.name
                )));
            }
            slots.extend(std::iter::repeat(index).take(info.weight as usize));
        }
        if slots.is_empty() {
            return Err(SkError::other("cannot select from zero shards"));
        }
        Ok(Self { config, slots })
    }

    /// The portion of `key` used for hashing.
    pub fn key_tag<'a>(&self, key: &'a str) -> &'a str {
        if !self.config.use_key_tags {
            return key;
        }
        key_tag(key, &self.config.key_tag_open, &self.config.key_tag_close)
    }
}

impl ShardSelector for CoreShardSelector {
    fn resolve(&self, key: &str) -> usize {
        let tag = self.key_tag(key).as_bytes();
        let hash = match self.config.key_hash {
            KeyHash::Sha256 => digest_head::<Sha256>(tag),
            KeyHash::Sha512 => digest_head::<Sha512>(tag),
        };
        self.slots[(hash % self.slots.len() as u64) as usize]
    }
}

/// The first 8 bytes of the digest of `data`, as a big-endian integer.
fn digest_head<D: Digest>(data: &[u8]) -> u64 {
    let digest = D::digest(data);
    let mut head = [0_u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// The body of the first `open`...`close` tag in `key`, or the whole key
/// if it holds no non-empty tag.
fn key_tag<'a>(key: &'a str, open: &str, close: &str) -> &'a str {
    let Some(start) = key.find(open).map(|i| i + open.len()) else {
        return key;
    };
    match key[start..].find(close) {
        Some(len) if len > 0 => &key[start..start + len],
        _ => key,
    }
}
