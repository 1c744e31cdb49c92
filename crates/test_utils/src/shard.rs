//! Scripted shards for exercising partial-failure paths.
//!
//! A [ScriptedShard] serves a fixed in-memory data set, but its range
//! scans can be told to answer late, fail, hang forever, panic, or return
//! badly ordered results.

use shardkv_api::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a [ScriptedShard] answers range scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Answer immediately and correctly.
    Respond,
    /// Answer correctly after the given delay.
    Delay(Duration),
    /// Return an error. Close also fails.
    Fail,
    /// Never answer.
    Hang,
    /// Panic while answering.
    Panic,
    /// Ignore the start key and limit and return every entry in
    /// descending order.
    Misbehave,
}

/// A shard backed by a fixed data set with scripted range behavior.
#[derive(Debug)]
pub struct ScriptedShard {
    info: ShardInfo,
    behavior: Behavior,
    data: Mutex<BTreeMap<String, String>>,
    range_calls: AtomicUsize,
    last_limit: Mutex<Option<usize>>,
    cancelled: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl ScriptedShard {
    /// Construct a shard named `name` holding `entries`, that answers
    /// immediately.
    pub fn new<'a>(
        name: &str,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            info: ShardInfo::new(name),
            behavior: Behavior::Respond,
            data: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            range_calls: AtomicUsize::new(0),
            last_limit: Mutex::new(None),
            cancelled: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    /// Construct a shard holding only keys, each with an empty value.
    pub fn with_keys<'a>(
        name: &str,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::new(name, keys.into_iter().map(|k| (k, "")))
    }

    /// Set how range scans are answered.
    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Freeze this shard into a shareable handle.
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// How many range scans have been requested.
    pub fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }

    /// How many range scans were dropped before they finished.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The limit of the most recent range scan.
    pub fn last_limit(&self) -> Option<usize> {
        *self.last_limit.lock().unwrap()
    }

    /// Whether [Shard::close] has been called successfully.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn scan(&self, start_key: &str, limit: usize) -> Vec<(String, String)> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_limit.lock().unwrap() = Some(limit);

        let data = self.data.lock().unwrap();
        if self.behavior == Behavior::Misbehave {
            return data
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }

        data.range(start_key.to_string()..)
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn answer<T: Send + 'static>(&self, out: T) -> BoxFut<'_, SkResult<T>> {
        let behavior = self.behavior;
        let guard = CancelGuard {
            cancelled: self.cancelled.clone(),
            finished: false,
        };
        Box::pin(async move {
            let mut guard = guard;
            let out = match behavior {
                Behavior::Respond | Behavior::Misbehave => Ok(out),
                Behavior::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(out)
                }
                Behavior::Fail => Err(SkError::other("scripted shard failure")),
                Behavior::Hang => std::future::pending().await,
                Behavior::Panic => panic!("scripted shard panic"),
            };
            guard.finished = true;
            out
        })
    }
}

/// Counts range scans that are dropped before they finish.
struct CancelGuard {
    cancelled: Arc<AtomicUsize>,
    finished: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Shard for ScriptedShard {
    fn info(&self) -> &ShardInfo {
        &self.info
    }

    fn get(&self, key: String) -> BoxFut<'_, SkResult<Option<String>>> {
        let r = self.data.lock().unwrap().get(&key).cloned();
        Box::pin(async move { Ok(r) })
    }

    fn set(&self, key: String, value: String) -> BoxFut<'_, SkResult<()>> {
        self.data.lock().unwrap().insert(key, value);
        Box::pin(async move { Ok(()) })
    }

    fn append(
        &self,
        key: String,
        value: String,
    ) -> BoxFut<'_, SkResult<u64>> {
        let mut data = self.data.lock().unwrap();
        let stored = data.entry(key).or_default();
        stored.push_str(&value);
        let len = stored.len() as u64;
        Box::pin(async move { Ok(len) })
    }

    fn range_keys(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<Vec<String>>> {
        let keys = self
            .scan(&start_key, limit)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        self.answer(keys)
    }

    fn range_entries(
        &self,
        start_key: String,
        limit: usize,
    ) -> BoxFut<'_, SkResult<Vec<(String, String)>>> {
        let entries = self.scan(&start_key, limit);
        self.answer(entries)
    }

    fn close(&self) -> BoxFut<'_, SkResult<()>> {
        Box::pin(async move {
            if self.behavior == Behavior::Fail {
                return Err(SkError::other("scripted shard close failure"));
            }
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}
