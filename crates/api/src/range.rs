//! Types for forward key-range iteration across shards.

use std::time::Duration;

/// [DEFAULT_RANGE_DEADLINE] in milliseconds, as used in configuration.
pub const DEFAULT_RANGE_DEADLINE_MS: u32 = 5000;

/// The deadline applied to a whole scatter-gather round when the caller
/// does not provide one.
pub const DEFAULT_RANGE_DEADLINE: Duration =
    Duration::from_millis(DEFAULT_RANGE_DEADLINE_MS as u64);

/// A forward range request, sent identically to every shard in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    /// Only keys greater than or equal to this are returned.
    /// An empty start key means "from the beginning".
    pub start_key: String,

    /// The maximum number of entries in the final merged result.
    ///
    /// This is also the limit each individual shard is asked for, so a
    /// round may hold up to `limit * shard_count` entries before
    /// truncation.
    pub limit: usize,
}

impl RangeRequest {
    /// Construct a new range request.
    pub fn new(start_key: impl Into<String>, limit: usize) -> Self {
        Self {
            start_key: start_key.into(),
            limit,
        }
    }
}

/// An entry returned by a shard range scan.
pub trait RangeItem: 'static + Send + std::fmt::Debug {
    /// The key this entry is ordered by.
    fn key(&self) -> &str;
}

impl RangeItem for String {
    fn key(&self) -> &str {
        self
    }
}

impl RangeItem for (String, String) {
    fn key(&self) -> &str {
        &self.0
    }
}
