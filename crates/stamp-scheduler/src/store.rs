use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stamp_crypto::SupportedDigest;
use stamp_schema::{IntervalRecord, SubmissionRecord};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::SchedulerError;

/// The submission-store interface the scheduler consumes (spec.md §6).
/// `select_unsealed_for_update` is the lock point: it must not return for a
/// second caller until the first caller commits or rolls back, modeling
/// `SELECT ... FOR UPDATE` against the unsealed rows.
#[async_trait]
pub trait SubmissionStore<D: SupportedDigest>: Send + Sync {
    async fn insert_submission(&self, record: SubmissionRecord<D>) -> Result<(), SchedulerError>;

    /// Locks and returns unsealed rows ordered by `(timestamp, leaf_hash)`
    /// (spec.md I5), held until `commit` or `rollback`.
    async fn select_unsealed_for_update(&self) -> Result<Vec<SubmissionRecord<D>>, SchedulerError>;

    async fn max_interval_index(&self) -> Result<Option<u64>, SchedulerError>;

    /// Deferred-FK write (spec.md §6): visible to `update_submission_proof`
    /// within the same tick even though the transaction hasn't committed.
    async fn insert_interval(&self, interval: IntervalRecord<D>) -> Result<(), SchedulerError>;

    async fn update_submission_proof(
        &self,
        id: Uuid,
        interval: u64,
        proof: Vec<u8>,
    ) -> Result<(), SchedulerError>;

    async fn commit(&self) -> Result<(), SchedulerError>;
    async fn rollback(&self) -> Result<(), SchedulerError>;
}

struct State<D: SupportedDigest> {
    submissions: HashMap<Uuid, SubmissionRecord<D>>,
    intervals: Vec<IntervalRecord<D>>,
}

/// The in-memory reference store (grounded on the teacher's
/// `MemoryDataStore`): sufficient to run the scheduler end to end in tests
/// and the demo binary, with no durable backend.
pub struct InMemoryStore<D: SupportedDigest> {
    state: Mutex<State<D>>,
    tick_lock: Arc<AsyncMutex<()>>,
    tick_guard: Mutex<Option<OwnedMutexGuard<()>>>,
}

impl<D: SupportedDigest> Default for InMemoryStore<D> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                submissions: HashMap::new(),
                intervals: Vec::new(),
            }),
            tick_lock: Arc::new(AsyncMutex::new(())),
            tick_guard: Mutex::new(None),
        }
    }
}

impl<D: SupportedDigest> InMemoryStore<D> {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn submission_by_id(&self, id: Uuid) -> SubmissionRecord<D> {
        self.state.lock().unwrap().submissions.get(&id).cloned().unwrap()
    }
}

#[async_trait]
impl<D: SupportedDigest> SubmissionStore<D> for InMemoryStore<D> {
    async fn insert_submission(&self, record: SubmissionRecord<D>) -> Result<(), SchedulerError> {
        self.state.lock().unwrap().submissions.insert(record.id, record);
        Ok(())
    }

    async fn select_unsealed_for_update(&self) -> Result<Vec<SubmissionRecord<D>>, SchedulerError> {
        let guard = self.tick_lock.clone().lock_owned().await;
        *self.tick_guard.lock().unwrap() = Some(guard);

        let state = self.state.lock().unwrap();
        let mut rows: Vec<SubmissionRecord<D>> = state
            .submissions
            .values()
            .filter(|s| s.interval.is_none())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.timestamp.as_str(), a.leaf_hash.bytes()).cmp(&(b.timestamp.as_str(), b.leaf_hash.bytes()))
        });
        Ok(rows)
    }

    async fn max_interval_index(&self) -> Result<Option<u64>, SchedulerError> {
        Ok(self.state.lock().unwrap().intervals.last().map(|i| i.index))
    }

    async fn insert_interval(&self, interval: IntervalRecord<D>) -> Result<(), SchedulerError> {
        self.state.lock().unwrap().intervals.push(interval);
        Ok(())
    }

    async fn update_submission_proof(
        &self,
        id: Uuid,
        interval: u64,
        proof: Vec<u8>,
    ) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .submissions
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::StoreConflict(format!("unknown submission {id}")))?;
        record.interval = Some(interval);
        record.proof = Some(proof);
        Ok(())
    }

    async fn commit(&self) -> Result<(), SchedulerError> {
        *self.tick_guard.lock().unwrap() = None;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().unwrap();
        for interval_record in state.intervals.pop() {
            // undo the just-inserted interval row and any proofs written
            // against it, matching "any failure in steps 1-11 rolls back
            // the transaction" (spec.md §4.D Failure handling).
            for record in state.submissions.values_mut() {
                if record.interval == Some(interval_record.index) {
                    record.interval = None;
                    record.proof = None;
                }
            }
        }
        drop(state);
        *self.tick_guard.lock().unwrap() = None;
        Ok(())
    }
}

/// Forwards to the shared store, so a test (or any other caller that needs
/// a handle into `InMemoryStore` alongside the scheduler's own boxed copy)
/// can hand the scheduler an `Arc` and keep one for itself.
#[async_trait]
impl<D: SupportedDigest> SubmissionStore<D> for Arc<InMemoryStore<D>> {
    async fn insert_submission(&self, record: SubmissionRecord<D>) -> Result<(), SchedulerError> {
        (**self).insert_submission(record).await
    }

    async fn select_unsealed_for_update(&self) -> Result<Vec<SubmissionRecord<D>>, SchedulerError> {
        (**self).select_unsealed_for_update().await
    }

    async fn max_interval_index(&self) -> Result<Option<u64>, SchedulerError> {
        (**self).max_interval_index().await
    }

    async fn insert_interval(&self, interval: IntervalRecord<D>) -> Result<(), SchedulerError> {
        (**self).insert_interval(interval).await
    }

    async fn update_submission_proof(
        &self,
        id: Uuid,
        interval: u64,
        proof: Vec<u8>,
    ) -> Result<(), SchedulerError> {
        (**self).update_submission_proof(id, interval, proof).await
    }

    async fn commit(&self) -> Result<(), SchedulerError> {
        (**self).commit().await
    }

    async fn rollback(&self) -> Result<(), SchedulerError> {
        (**self).rollback().await
    }
}
