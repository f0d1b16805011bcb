use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use courtside_backend::db::settlement_store::{SettlementStore, StoreError};
use courtside_backend::models::prediction::Prediction;
use courtside_backend::models::settlement::{CommitReceipt, SettlementBatch};
use courtside_backend::models::user::UserScore;

#[derive(Debug, Clone, Default)]
struct State {
    predictions: HashMap<Uuid, Prediction>,
    users: HashMap<String, UserScore>,
    settled_matches: HashSet<String>,
}

/// `SettlementStore` backed by a mutex. Commits are staged on a copy of the
/// state and swapped in at the end, so a failing commit leaves nothing behind.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    failing_reads: AtomicUsize,
    failing_commits: AtomicUsize,
    commit_calls: AtomicUsize,
    settle_after_fetch: Mutex<Vec<Uuid>>,
}

impl InMemoryStore {
    pub fn with_predictions(predictions: Vec<Prediction>) -> Self {
        let store = Self::default();
        for prediction in predictions {
            store.insert_prediction(prediction);
        }
        store
    }

    pub fn insert_prediction(&self, prediction: Prediction) {
        let mut state = self.state.lock().unwrap();
        state.predictions.insert(prediction.id, prediction);
    }

    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Simulate another writer settling `prediction_id` between the engine's
    /// read and its commit.
    pub fn settle_behind_engine(&self, prediction_id: Uuid) {
        self.settle_after_fetch.lock().unwrap().push(prediction_id);
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn prediction(&self, id: Uuid) -> Prediction {
        self.state.lock().unwrap().predictions[&id].clone()
    }

    pub fn user(&self, user_id: &str) -> Option<UserScore> {
        self.state.lock().unwrap().users.get(user_id).cloned()
    }

    pub fn users(&self) -> Vec<UserScore> {
        self.state.lock().unwrap().users.values().cloned().collect()
    }

    pub fn is_match_settled(&self, match_id: &str) -> bool {
        self.state.lock().unwrap().settled_matches.contains(match_id)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SettlementStore for InMemoryStore {
    async fn fetch_predictions_for_match(&self, match_id: &str) -> Result<Vec<Prediction>, StoreError> {
        tokio::task::yield_now().await;
        if Self::take_failure(&self.failing_reads) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }

        let mut state = self.state.lock().unwrap();
        let mut predictions: Vec<Prediction> = state
            .predictions
            .values()
            .filter(|p| p.match_id == match_id)
            .cloned()
            .collect();
        predictions.sort_by_key(|p| p.created_at);

        for id in self.settle_after_fetch.lock().unwrap().drain(..) {
            if let Some(prediction) = state.predictions.get_mut(&id) {
                prediction.is_correct = Some(false);
                prediction.settled_at = Some(Utc::now());
            }
        }
        Ok(predictions)
    }

    async fn commit_settlement(&self, batch: &SettlementBatch) -> Result<CommitReceipt, StoreError> {
        tokio::task::yield_now().await;
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_commits) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        let mut state = self.state.lock().unwrap();
        if state.settled_matches.contains(&batch.match_id) {
            return Ok(CommitReceipt::already_settled());
        }

        let mut staged = state.clone();
        let mut applied = HashSet::new();
        for outcome in &batch.outcomes {
            if let Some(prediction) = staged.predictions.get_mut(&outcome.prediction_id) {
                if prediction.match_id == batch.match_id && prediction.is_correct.is_none() {
                    prediction.is_correct = Some(outcome.is_correct);
                    prediction.points = outcome.points;
                    prediction.settled_at = Some(Utc::now());
                    applied.insert(outcome.prediction_id);
                }
            }
        }

        let deltas = batch.deltas_for(&applied);
        for delta in &deltas {
            if !delta.is_consistent() {
                return Err(StoreError::InvalidDelta {
                    user_id: delta.user_id.clone(),
                    reason: "inconsistent counters".into(),
                });
            }
            staged
                .users
                .entry(delta.user_id.clone())
                .or_insert_with(|| UserScore::empty(delta.user_id.clone()))
                .apply(delta);
        }
        staged.settled_matches.insert(batch.match_id.clone());
        *state = staged;

        Ok(CommitReceipt {
            predictions_applied: applied.len(),
            predictions_already_settled: batch.outcomes.len() - applied.len(),
            deltas_applied: deltas,
            match_already_settled: false,
        })
    }
}
