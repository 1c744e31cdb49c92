//! K-way merge of per-shard range results.
//!
//! Each shard returns a run of entries sorted ascending by key. The runs are
//! merged with a min-heap keyed by `(key, shard_index)`, keeping only the
//! smallest `limit` distinct keys overall.
//!
//! If the same key is returned by more than one shard, the entry from the
//! lowest-indexed shard in the registry is kept. Under a correct
//! partitioning scheme this never happens, so callers must not rely on
//! which value wins.

use shardkv_api::RangeItem;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Bring one shard's partial result into the shape the merge expects.
///
/// Drops entries before `start_key`, sorts the run if the shard returned
/// it out of order, keeps the first of any repeated key, and truncates
/// to `limit`.
pub(crate) fn normalize<T: RangeItem>(
    start_key: &str,
    limit: usize,
    mut partial: Vec<T>,
) -> Vec<T> {
    partial.retain(|item| item.key() >= start_key);
    if !partial.windows(2).all(|w| w[0].key() <= w[1].key()) {
        // stable, so the first occurrence of a repeated key stays first
        partial.sort_by(|a, b| a.key().cmp(b.key()));
    }
    partial.dedup_by(|later, earlier| later.key() == earlier.key());
    partial.truncate(limit);
    partial
}

/// The head of one shard's run inside the merge heap.
struct Head<T> {
    item: T,
    shard: usize,
}

impl<T: RangeItem> PartialEq for Head<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: RangeItem> Eq for Head<T> {}

impl<T: RangeItem> PartialOrd for Head<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: RangeItem> Ord for Head<T> {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        (other.item.key(), other.shard).cmp(&(self.item.key(), self.shard))
    }
}

/// Merge `partials` (indexed by registry position, each sorted ascending
/// with no repeated keys) into one strictly ascending run of at most
/// `limit` entries.
pub(crate) fn merge<T: RangeItem>(partials: Vec<Vec<T>>, limit: usize) -> Vec<T> {
    let total: usize = partials.iter().map(Vec::len).sum();
    let mut runs: Vec<std::vec::IntoIter<T>> =
        partials.into_iter().map(Vec::into_iter).collect();

    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (shard, run) in runs.iter_mut().enumerate() {
        if let Some(item) = run.next() {
            heap.push(Head { item, shard });
        }
    }

    let mut out: Vec<T> = Vec::with_capacity(limit.min(total));
    while out.len() < limit {
        let Some(Head { item, shard }) = heap.pop() else {
            break;
        };

        if let Some(next) = runs[shard].next() {
            heap.push(Head { item: next, shard });
        }

        // equal keys pop in shard order, so the first one seen wins
        if out.last().is_some_and(|last| last.key() == item.key()) {
            continue;
        }

        out.push(item);
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;
    use std::collections::BTreeMap;

    fn kv(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_keeps_smallest_keys_with_values() {
        let merged = merge(
            vec![vec![kv("a", "1"), kv("c", "3")], vec![kv("b", "2"), kv("d", "4")]],
            3,
        );
        assert_eq!(vec![kv("a", "1"), kv("b", "2"), kv("c", "3")], merged);
    }

    #[test]
    fn merge_without_truncation_returns_union() {
        let merged = merge(vec![keys(&["a", "e"]), keys(&["b"]), vec![]], 10);
        assert_eq!(keys(&["a", "b", "e"]), merged);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let merged: Vec<String> = merge(vec![vec![], vec![]], 5);
        assert!(merged.is_empty());

        let merged: Vec<String> = merge(vec![], 5);
        assert!(merged.is_empty());
    }

    #[test]
    fn merge_limit_zero_is_empty() {
        let merged = merge(vec![keys(&["a"])], 0);
        assert!(merged.is_empty());
    }

    #[test]
    fn duplicate_key_keeps_lowest_shard_entry() {
        let merged = merge(
            vec![
                vec![kv("b", "from-0")],
                vec![kv("a", "from-1"), kv("b", "from-1")],
                vec![kv("b", "from-2"), kv("c", "from-2")],
            ],
            10,
        );
        assert_eq!(
            vec![kv("a", "from-1"), kv("b", "from-0"), kv("c", "from-2")],
            merged
        );

        // the tie-break does not depend on which shard ran out first
        let merged = merge(
            vec![
                vec![kv("a", "from-0"), kv("z", "from-0")],
                vec![kv("z", "from-1")],
            ],
            10,
        );
        assert_eq!(vec![kv("a", "from-0"), kv("z", "from-0")], merged);
    }

    #[test]
    fn duplicates_do_not_count_toward_limit() {
        let merged =
            merge(vec![keys(&["a", "b"]), keys(&["a", "b"]), keys(&["c"])], 3);
        assert_eq!(keys(&["a", "b", "c"]), merged);
    }

    #[test]
    fn keys_order_bytewise() {
        let merged =
            merge(vec![keys(&["B", "a"]), keys(&["", "Z", "\u{e9}"])], 10);
        assert_eq!(keys(&["", "B", "Z", "a", "\u{e9}"]), merged);
    }

    #[test]
    fn normalize_repairs_misbehaving_shard() {
        let partial = vec![
            kv("d", "1"),
            kv("a", "2"),
            kv("c", "3"),
            kv("c", "4"),
            kv("b", "5"),
            kv("e", "6"),
        ];
        assert_eq!(
            vec![kv("b", "5"), kv("c", "3"), kv("d", "1")],
            normalize("b", 3, partial)
        );
    }

    #[test]
    fn normalize_leaves_good_run_untouched() {
        let partial = keys(&["m", "n", "o"]);
        assert_eq!(partial.clone(), normalize("", 10, partial));
    }

    #[test]
    fn randomized_merge_matches_btree_union() {
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let shard_count = rng.gen_range(1..6);
            let limit = rng.gen_range(0..40);
            let start_key = format!("k{:02}", rng.gen_range(0..30));

            let mut expected = BTreeMap::new();
            let mut partials = Vec::new();
            for shard in 0..shard_count {
                let mut partial = Vec::new();
                for _ in 0..rng.gen_range(0..30) {
                    let key = format!("k{:02}", rng.gen_range(0..60));
                    partial.push((key, format!("s{shard}")));
                }
                let partial = normalize(&start_key, limit, partial);
                for (k, v) in partial.iter() {
                    expected.entry(k.clone()).or_insert_with(|| v.clone());
                }
                partials.push(partial);
            }

            let merged = merge(partials, limit);

            assert!(merged.len() <= limit);
            assert!(merged.windows(2).all(|w| w[0].0 < w[1].0));
            assert!(merged.iter().all(|(k, _)| k.as_str() >= start_key.as_str()));

            let expected: Vec<(String, String)> =
                expected.into_iter().take(limit).collect();
            assert_eq!(expected, merged);
        }
    }
}
