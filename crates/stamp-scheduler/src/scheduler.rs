use std::time::Duration;

use stamp_crypto::SupportedDigest;
use stamp_merkle::{
    calculate_node, compute_consistency_proof, compute_inclusion_proof, verify_consistency_proof,
    verify_inclusion_proof, NodeCache, NoCache, SliceOracle,
};
use stamp_schema::{
    consistency_to_json, inclusion_to_json, format_compact_head, CanonicalProof, HeadRecordJson,
    IntervalHeadJson, IntervalRecord,
};
use tracing::{info, instrument, warn};

use crate::broadcast::BroadcastSink;
use crate::error::SchedulerError;
use crate::main_tree::{MainTreeOracle, StagedLeaf};
use crate::store::SubmissionStore;
use crate::HeadWaiter;

const MTH_CHANNEL: &str = "mth-live";

/// The interval scheduler (spec.md §4.D): one call to [`tick`] atomically
/// seals every currently-unsealed submission into a new interval, extends
/// the main tree by one leaf, and publishes the resulting head.
pub struct IntervalScheduler<D: SupportedDigest> {
    store: Box<dyn SubmissionStore<D> + Send + Sync>,
    cache: Box<dyn NodeCache<D> + Send + Sync>,
    broadcast: Box<dyn BroadcastSink + Send + Sync>,
    waiter: HeadWaiter,
    authority: String,
    main_tree: MainTreeOracle<D>,
}

impl<D: SupportedDigest> IntervalScheduler<D> {
    pub fn new(
        authority: impl Into<String>,
        store: Box<dyn SubmissionStore<D> + Send + Sync>,
        cache: Box<dyn NodeCache<D> + Send + Sync>,
        broadcast: Box<dyn BroadcastSink + Send + Sync>,
        head_queue_depth: usize,
    ) -> Self {
        Self {
            store,
            cache,
            broadcast,
            waiter: HeadWaiter::new(head_queue_depth),
            authority: authority.into(),
            main_tree: MainTreeOracle::new(),
        }
    }

    pub fn waiter(&self) -> &HeadWaiter {
        &self.waiter
    }

    /// Runs one tick of the spec.md §4.D algorithm, always sealing a new
    /// interval — even an empty one when there was nothing unsealed to seal
    /// (spec.md §4.D step 3, §8 scenario 1).
    ///
    /// Everything between the lock in `select_unsealed_for_update` and the
    /// commit in `seal` is one transaction: any error from `seal` rolls the
    /// store back here, in the one place that calls it, rather than at each
    /// fallible step inside it. That keeps a partially-built tick from ever
    /// leaving the store's lock held past this call, or the in-memory main
    /// tree (`self.main_tree`) ahead of what the store actually committed —
    /// `seal` only ever mutates it via `self.main_tree.push`, and only after
    /// every self-verification step inside `seal` has already succeeded.
    #[instrument(skip(self), fields(authority = %self.authority))]
    pub async fn tick(&self, now: &str) -> Result<HeadRecordJson, SchedulerError> {
        match self.seal(now).await {
            Ok(head) => Ok(head),
            Err(e) => {
                self.store.rollback().await?;
                Err(e)
            }
        }
    }

    async fn seal(&self, now: &str) -> Result<HeadRecordJson, SchedulerError> {
        // Steps 1-2: open the transaction, lock and read unsealed rows. An
        // empty set still seals an empty interval (spec.md §4.D step 3:
        // "may be empty — proceed anyway to produce an empty-interval
        // head"), so there is no early return here.
        let rows = self.store.select_unsealed_for_update().await?;

        // Step 3: build the interval tree from the locked rows, already
        // sorted by (timestamp, leaf_hash) per I5.
        let leaf_bytes: Vec<Vec<u8>> = rows.iter().map(|r| r.leaf_hash.bytes().to_vec()).collect();
        let (ith_node, _seed) = stamp_merkle::from_sequence::<D>(&leaf_bytes);
        let ith = ith_node.value.clone();

        // Step 4: assign the next dense interval index.
        let k = match self.store.max_interval_index().await? {
            Some(previous) => previous + 1,
            None => 0,
        };

        // Step 5: insert the interval row (visible within this tick to
        // update_submission_proof's deferred FK).
        self.store
            .insert_interval(IntervalRecord {
                index: k,
                timestamp: now.to_string(),
                ith: ith.clone(),
            })
            .await?;

        // Step 6: extend the main tree. The old main-tree width is exactly
        // `k` (there were k intervals with indices 0..k-1), so the new
        // width after sealing leaf k is k + 1. The real oracle isn't
        // mutated yet — `staged` serves leaf k without it, so a failure
        // below leaves `self.main_tree` at its last-committed width.
        let old_width = self.main_tree.width();
        debug_assert_eq!(old_width, k, "interval index must track main tree width");
        let new_width = k + 1;
        let staged = StagedLeaf::new(&self.main_tree, k, &ith);
        let mth_node = calculate_node(&staged, self.cache.as_ref(), 0, new_width)?;
        let mth = mth_node.value.clone();
        let compact_head = format_compact_head(&self.authority, k, &mth);

        // Step 7: per-submission inclusion proof within the interval tree,
        // self-verified before it is ever written back.
        let interval_oracle = SliceOracle::new(&leaf_bytes);
        for (i, row) in rows.iter().enumerate() {
            let proof =
                compute_inclusion_proof(&interval_oracle, &NoCache, i as u64, rows.len() as u64)?;
            if !verify_inclusion_proof(i as u64, &leaf_bytes[i], &proof, &ith) {
                return Err(SchedulerError::ProofMismatch(format!(
                    "interval inclusion proof for submission {} failed self-verification",
                    row.id
                )));
            }
            let canonical = CanonicalProof {
                a: proof.leaf_index,
                path: proof.neighbours.clone(),
                ith: ith.clone(),
                mth: compact_head.clone(),
            };
            let bytes = stamp_schema::to_canonical_bytes(&canonical)?;
            self.store
                .update_submission_proof(row.id, k, bytes)
                .await?;
        }

        // Step 8: consistency proof from the previous main tree width to
        // the new one, once there was a previous tree to be consistent with.
        let consistency_json = if k >= 2 {
            let old_root = calculate_node(&staged, self.cache.as_ref(), 0, k)?.value;
            let proof = compute_consistency_proof(&staged, self.cache.as_ref(), k, new_width)?;
            let verified = verify_consistency_proof(k, &old_root, new_width, &mth, &proof)?;
            if !verified {
                return Err(SchedulerError::ProofMismatch(format!(
                    "consistency proof {k} -> {new_width} failed self-verification"
                )));
            }
            Some(consistency_to_json(k - 1, k, &proof))
        } else {
            None
        };

        // Step 9: inclusion proof of the new interval's own leaf in the main
        // tree, also self-verified.
        let main_inclusion = compute_inclusion_proof(&staged, self.cache.as_ref(), k, new_width)?;
        if !verify_inclusion_proof(k, ith.bytes(), &main_inclusion, &mth) {
            return Err(SchedulerError::ProofMismatch(format!(
                "main tree inclusion proof for interval {k} failed self-verification"
            )));
        }

        // Step 10: commit. Only now is the tick guaranteed to succeed, so
        // only now does the in-memory main tree gain its new leaf and does
        // the store transaction release its lock.
        self.store.commit().await?;
        self.main_tree.push(ith.clone());

        let head = HeadRecordJson {
            version: "1".to_string(),
            authority: self.authority.clone(),
            interval: IntervalHeadJson {
                index: k,
                timestamp: now.to_string(),
                ith: stamp_crypto::b64url_encode(ith.bytes()),
                version: "1".to_string(),
                typ: "it".to_string(),
            },
            mth: stamp_crypto::b64url_encode(mth.bytes()),
            inclusion: inclusion_to_json(k, &main_inclusion),
            consistency: consistency_json,
        };

        // Steps 11-12: publish. A broadcast failure is logged and does not
        // unwind the already-committed tick (spec.md §4.D Failure handling).
        match stamp_schema::to_json(&head) {
            Ok(bytes) => {
                if let Err(e) = self.broadcast.publish(MTH_CHANNEL, bytes.into_bytes()).await {
                    warn!(error = %e, "failed to publish head to broadcast sink");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode head record for broadcast"),
        }
        self.waiter.publish(head.clone());

        info!(interval = k, width = new_width, "sealed interval");
        Ok(head)
    }

    /// Runs [`tick`] on a fixed schedule until `shutdown` resolves, matching
    /// the teacher's `tokio::time::interval` + `MissedTickBehavior::Delay`
    /// loop: a slow tick delays the next one rather than firing a burst of
    /// catch-up ticks.
    pub async fn run(&self, tick_interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = crate::now_rfc3339();
                    if let Err(e) = self.tick(&now).await {
                        warn!(error = %e, "scheduler tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use sha2::Sha512;
    use stamp_cache::{CachingNodeCache, InMemoryKv};
    use stamp_crypto::Hash;
    use stamp_merkle::{verify_consistency_proof, ConsistencyProof, MerkleError};
    use stamp_schema::{CanonicalProof, SubmissionRecord};
    use uuid::Uuid;

    use super::*;
    use crate::broadcast::{InMemoryBroadcastSink, DEFAULT_HEAD_QUEUE_DEPTH};
    use crate::store::InMemoryStore;

    /// A cache whose `get` always misses, forcing every `calculate_node`
    /// call through `put`, and whose `put` detects a disagreeing write the
    /// way [`stamp_cache::CachingNodeCache`] does. `corrupt` flips a stored
    /// value directly, bypassing that check, to simulate the out-of-band
    /// corruption scenario 4 needs: a real cache hit can never itself
    /// observe a mismatch (it returns before anything is recomputed), so a
    /// deliberately always-missing cache is the only way to force the
    /// comparison scheduler self-verification relies on to actually run.
    #[derive(Clone)]
    struct CorruptibleCache {
        stored: Arc<Mutex<HashMap<(u64, u64), Vec<u8>>>>,
    }

    impl CorruptibleCache {
        fn new() -> Self {
            Self {
                stored: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        fn corrupt(&self, start: u64, end: u64) {
            let mut stored = self.stored.lock().unwrap();
            let value = stored
                .get_mut(&(start, end))
                .expect("address must already be cached before it can be corrupted");
            value[0] ^= 0xff;
        }
    }

    impl NodeCache<Sha512> for CorruptibleCache {
        fn get(&self, _start: u64, _end: u64) -> Result<Option<Hash<Sha512>>, MerkleError> {
            Ok(None)
        }

        fn put(&self, start: u64, end: u64, value: Hash<Sha512>) -> Result<(), MerkleError> {
            let mut stored = self.stored.lock().unwrap();
            match stored.get(&(start, end)) {
                Some(existing) if existing.as_slice() != value.bytes() => {
                    Err(MerkleError::CacheCorruption { start, end })
                }
                Some(_) => Ok(()),
                None => {
                    stored.insert((start, end), value.bytes().to_vec());
                    Ok(())
                }
            }
        }
    }

    /// Builds a scheduler over a fresh [`InMemoryStore`], returning it
    /// alongside an `Arc` handle so a test can inspect store state the
    /// `SubmissionStore` trait itself doesn't expose (e.g. a sealed
    /// submission's written-back proof).
    fn scheduler_with_cache(
        cache: Box<dyn NodeCache<Sha512> + Send + Sync>,
    ) -> (IntervalScheduler<Sha512>, Arc<InMemoryStore<Sha512>>) {
        let store = Arc::new(InMemoryStore::<Sha512>::new());
        let scheduler = IntervalScheduler::new(
            "example.org",
            Box::new(store.clone()),
            cache,
            Box::new(InMemoryBroadcastSink::new()),
            DEFAULT_HEAD_QUEUE_DEPTH,
        );
        (scheduler, store)
    }

    fn caching_scheduler() -> (IntervalScheduler<Sha512>, Arc<InMemoryStore<Sha512>>) {
        scheduler_with_cache(Box::new(CachingNodeCache::with_threshold(
            InMemoryKv::new(Duration::from_secs(3600)),
            0,
        )))
    }

    fn submission(timestamp: &str, data: &[u8]) -> SubmissionRecord<Sha512> {
        let leaf_hash = stamp_schema::leaf_hash(data, timestamp).unwrap();
        SubmissionRecord::new_unsealed(Uuid::new_v4(), timestamp.to_string(), leaf_hash, None)
    }

    const TS: &str = "2026-07-30T00:00:00.000000Z";

    fn decode_hash(s: &str) -> Hash<Sha512> {
        Hash::try_from(stamp_crypto::b64url_decode(s).unwrap()).unwrap()
    }

    // Scenario 1 (spec.md §8): empty store -> tick -> interval 0 exists with
    // ITH = hash of the empty sequence; MTH is the root of a one-leaf tree
    // over that ITH; consistency is null.
    #[tokio::test]
    async fn empty_store_seals_an_empty_interval() {
        let (scheduler, _store) = caching_scheduler();
        let head = scheduler.tick(TS).await.unwrap();

        assert_eq!(head.interval.index, 0);
        let empty_ith = stamp_crypto::empty_tree::<Sha512>().value;
        assert_eq!(head.interval.ith, stamp_crypto::b64url_encode(empty_ith.bytes()));

        let expected_mth = stamp_crypto::from_leaf::<Sha512>(0, empty_ith.bytes()).value;
        assert_eq!(head.mth, stamp_crypto::b64url_encode(expected_mth.bytes()));
        assert!(head.consistency.is_none());
    }

    // Scenario 2 (spec.md §8): three submissions sharing one timestamp seal
    // into interval 0 at positions 0, 1, 2 in leaf-hash order.
    #[tokio::test]
    async fn identical_timestamp_submissions_seal_in_leaf_hash_order() {
        let (scheduler, store) = caching_scheduler();

        let mut rows = vec![submission(TS, b"a"), submission(TS, b"b"), submission(TS, b"c")];
        rows.sort_by(|a, b| a.leaf_hash.bytes().cmp(b.leaf_hash.bytes()));
        for row in &rows {
            store.insert_submission(row.clone()).await.unwrap();
        }

        let head = scheduler.tick(TS).await.unwrap();
        assert_eq!(head.interval.index, 0);

        for (expected_position, row) in rows.iter().enumerate() {
            let sealed = store.submission_by_id(row.id);
            assert_eq!(sealed.interval, Some(0));
            let proof: CanonicalProof<Sha512> =
                stamp_schema::from_canonical_bytes(sealed.proof.as_deref().unwrap()).unwrap();
            assert_eq!(proof.a, expected_position as u64);
        }
    }

    // Scenario 3 (spec.md §8): a consistency proof from width 1 to width 2
    // verifies against the two published MTHs.
    #[tokio::test]
    async fn consistency_proof_from_width_one_to_two_verifies() {
        let (scheduler, store) = caching_scheduler();

        let head_one = scheduler.tick(TS).await.unwrap();
        store
            .insert_submission(submission(TS, b"second-interval"))
            .await
            .unwrap();
        let head_two = scheduler.tick(TS).await.unwrap();

        assert_eq!(head_two.interval.index, 1);
        let consistency = head_two.consistency.as_ref().unwrap();

        let old_mth = decode_hash(&head_one.mth);
        let new_mth = decode_hash(&head_two.mth);
        let proof = ConsistencyProof {
            old_width: 1,
            new_width: 2,
            nodes: consistency.nodes.iter().map(|n| decode_hash(n)).collect(),
        };
        assert!(verify_consistency_proof(1, &old_mth, 2, &new_mth, &proof).unwrap());
    }

    // Scenario 4 (spec.md §8): a corrupted cache entry surfaces
    // `CacheCorruption` on the next tick that needs to recompute through it,
    // and the tick does not commit (the unsealed submission is still there
    // to retry).
    #[tokio::test]
    async fn corrupt_cache_entry_blocks_the_next_tick_and_does_not_publish() {
        let cache = CorruptibleCache::new();
        let (scheduler, store) = scheduler_with_cache(Box::new(cache.clone()));

        scheduler.tick(TS).await.unwrap();
        // Width 1, address (0, 1) is now cached; corrupt it out of band.
        cache.corrupt(0, 1);

        store
            .insert_submission(submission(TS, b"second-interval"))
            .await
            .unwrap();
        let err = scheduler.tick(TS).await.unwrap_err();
        assert!(matches!(err, SchedulerError::CacheCorruption { start: 0, end: 1 }));

        // The failed tick rolled back: the submission is still unsealed and
        // available to retry.
        let unsealed = store.select_unsealed_for_update().await.unwrap();
        store.rollback().await.unwrap();
        assert_eq!(unsealed.len(), 1);
    }
}
