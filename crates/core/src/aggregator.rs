//! Scatter-gather aggregation of forward range queries.
//!
//! A round sends the same [RangeRequest] to every shard in the registry as
//! independent tokio tasks, then waits once, for all of them or until the
//! round deadline, whichever comes first. Each task owns exactly one slot
//! in the round; slots are only read after the wait, so no collection is
//! shared between concurrent workers.
//!
//! Shards that error, panic, or have not answered at the deadline leave
//! their slot empty and contribute nothing. The round as a whole only
//! fails when the requests cannot be dispatched at all.

use crate::merge::{merge, normalize};
use futures::FutureExt;
use shardkv_api::*;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// The state of one shard's slot in a scatter round.
#[derive(Debug)]
enum Slot<T> {
    Pending,
    Responded(Vec<T>),
    Failed,
    Panicked,
}

/// How the shards of one scatter round fared.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScatterOutcome {
    /// Shards that answered before the deadline.
    pub responded: usize,
    /// Shards whose query returned an error.
    pub failed: usize,
    /// Shards whose query panicked.
    pub panicked: usize,
    /// Shards still outstanding when the deadline elapsed.
    pub abandoned: usize,
}

/// Fans forward range queries out to every shard of a registry and merges
/// the answers.
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: ShardRegistry,
    default_deadline: Duration,
}

impl Aggregator {
    /// Construct an aggregator over `registry`. Rounds that are not given
    /// an explicit deadline use `default_deadline`.
    pub fn new(registry: ShardRegistry, default_deadline: Duration) -> Self {
        Self {
            registry,
            default_deadline,
        }
    }

    /// The registry this aggregator fans out to.
    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    /// The deadline used when a round is not given one.
    pub fn default_deadline(&self) -> Duration {
        self.default_deadline
    }

    /// The smallest `request.limit` keys at or after `request.start_key`
    /// across all shards that answered in time.
    pub async fn forward_keys(
        &self,
        request: &RangeRequest,
        deadline: Option<Duration>,
    ) -> SkResult<BTreeSet<String>> {
        let (keys, _) = self.forward_keys_round(request, deadline).await?;
        Ok(keys.into_iter().collect())
    }

    /// The smallest `request.limit` key-value pairs at or after
    /// `request.start_key` across all shards that answered in time.
    pub async fn forward_keys_and_values(
        &self,
        request: &RangeRequest,
        deadline: Option<Duration>,
    ) -> SkResult<BTreeMap<String, String>> {
        let (entries, _) = self.forward_entries_round(request, deadline).await?;
        Ok(entries.into_iter().collect())
    }

    /// As [Aggregator::forward_keys], but returns the merged run together
    /// with the round outcome.
    pub async fn forward_keys_round(
        &self,
        request: &RangeRequest,
        deadline: Option<Duration>,
    ) -> SkResult<(Vec<String>, ScatterOutcome)> {
        let start_key = request.start_key.clone();
        let limit = request.limit;
        self.round(
            request,
            deadline,
            move |shard| -> BoxFut<'static, SkResult<Vec<String>>> {
                let start_key = start_key.clone();
                Box::pin(
                    async move { shard.range_keys(start_key, limit).await },
                )
            },
        )
        .await
    }

    /// As [Aggregator::forward_keys_and_values], but returns the merged
    /// run together with the round outcome.
    pub async fn forward_entries_round(
        &self,
        request: &RangeRequest,
        deadline: Option<Duration>,
    ) -> SkResult<(Vec<(String, String)>, ScatterOutcome)> {
        let start_key = request.start_key.clone();
        let limit = request.limit;
        self.round(
            request,
            deadline,
            move |shard| -> BoxFut<'static, SkResult<Vec<(String, String)>>> {
                let start_key = start_key.clone();
                Box::pin(
                    async move { shard.range_entries(start_key, limit).await },
                )
            },
        )
        .await
    }

    async fn round<T, F>(
        &self,
        request: &RangeRequest,
        deadline: Option<Duration>,
        query: F,
    ) -> SkResult<(Vec<T>, ScatterOutcome)>
    where
        T: RangeItem,
        F: Fn(DynShard) -> BoxFut<'static, SkResult<Vec<T>>>
            + Send
            + Sync
            + 'static,
    {
        // a zero limit can only ever produce an empty result
        if request.limit == 0 {
            tracing::trace!("range limit is zero, not querying shards");
            return Ok((Vec::new(), ScatterOutcome::default()));
        }

        let deadline = deadline.unwrap_or(self.default_deadline);
        let (slots, outcome) = self.scatter(deadline, query).await?;

        tracing::debug!(
            start_key = %request.start_key,
            limit = request.limit,
            ?deadline,
            ?outcome,
            "range scatter round complete"
        );

        let partials = slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Responded(partial) => {
                    normalize(&request.start_key, request.limit, partial)
                }
                _ => Vec::new(),
            })
            .collect();

        Ok((merge(partials, request.limit), outcome))
    }

    async fn scatter<T, F>(
        &self,
        deadline: Duration,
        query: F,
    ) -> SkResult<(Vec<Slot<T>>, ScatterOutcome)>
    where
        T: RangeItem,
        F: Fn(DynShard) -> BoxFut<'static, SkResult<Vec<T>>>
            + Send
            + Sync
            + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SkError::dispatch_src(
                "no tokio runtime available to dispatch shard range queries",
                e,
            )
        })?;

        // a deadline too far out to represent is no deadline at all
        let deadline_at = tokio::time::Instant::now().checked_add(deadline);
        let query = Arc::new(query);

        // every request is started before any result is awaited
        let mut tasks = tokio::task::JoinSet::new();
        for (index, shard) in self.registry.all_shards().iter().enumerate() {
            let name = shard.info().name.clone();
            let shard = shard.clone();
            let query = query.clone();
            tasks.spawn_on(
                async move {
                    let fut = AssertUnwindSafe(async move { query(shard).await });
                    let slot = match fut.catch_unwind().await {
                        Ok(Ok(partial)) => Slot::Responded(partial),
                        Ok(Err(err)) => {
                            tracing::warn!(
                                shard = %name,
                                ?err,
                                "shard range query failed, ignoring its results"
                            );
                            Slot::Failed
                        }
                        Err(_) => Slot::Panicked,
                    };
                    (index, slot)
                },
                &runtime,
            );
        }

        let mut slots: Vec<Slot<T>> =
            (0..self.registry.len()).map(|_| Slot::Pending).collect();

        let join_all = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, slot)) => slots[index] = slot,
                    Err(err) => {
                        tracing::warn!(?err, "shard range task did not complete");
                    }
                }
            }
        };
        let all_joined = match deadline_at {
            Some(deadline_at) => {
                tokio::time::timeout_at(deadline_at, join_all).await.is_ok()
            }
            None => {
                join_all.await;
                true
            }
        };

        // dropping the join set aborts any request that is still outstanding
        drop(tasks);

        let mut outcome = ScatterOutcome::default();
        for (index, slot) in slots.iter().enumerate() {
            let name = self
                .registry
                .get(index)
                .map(|s| s.info().name.as_str())
                .unwrap_or_default();
            match slot {
                Slot::Pending => {
                    tracing::debug!(shard = name, "no range response before deadline");
                    outcome.abandoned += 1;
                }
                Slot::Responded(_) => outcome.responded += 1,
                Slot::Failed => outcome.failed += 1,
                Slot::Panicked => {
                    tracing::warn!(shard = name, "shard range query panicked");
                    outcome.panicked += 1;
                }
            }
        }

        if !all_joined {
            tracing::warn!(
                abandoned = outcome.abandoned,
                ?deadline,
                "deadline elapsed before every shard answered a range query"
            );
        }

        Ok((slots, outcome))
    }
}
