#![deny(missing_docs)]
//! Shardkv API contains the shardkv module traits and the basic types
//! required to define the api of those traits.
//!
//! If you want to use shardkv itself, please see the shardkv_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod builder;
pub use builder::*;

pub mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod range;
pub use range::*;

pub mod registry;
pub use registry::*;

pub mod selector;
pub use selector::*;

pub mod shard;
pub use shard::*;

pub mod sharded;
pub use sharded::*;
