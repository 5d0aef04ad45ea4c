//! Scripted in-memory store for reconciler tests.

use super::{Collection, RecordStore};
use crate::error::SyncError;
use crate::models::{Dataset, RecordKind};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockStore {
    responses: Mutex<VecDeque<Result<Dataset, SyncError>>>,
    writes: Mutex<Vec<(RecordKind, usize)>>,
    fail_on: Option<RecordKind>,
    resets: Mutex<usize>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next `fetch_all` result. Once the queue is drained every
    /// fetch returns an empty dataset.
    pub fn push_fetch(&self, result: Result<Dataset, SyncError>) {
        self.responses.lock().unwrap().push_back(result);
    }

    pub fn with_fetch(self, data: Dataset) -> Self {
        self.push_fetch(Ok(data));
        self
    }

    /// Make every write of `kind` fail with a transport error.
    pub fn failing_on(mut self, kind: RecordKind) -> Self {
        self.fail_on = Some(kind);
        self
    }

    /// Collections written so far, in order, with their row counts.
    pub fn writes(&self) -> Vec<(RecordKind, usize)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn reset_count(&self) -> usize {
        *self.resets.lock().unwrap()
    }
}

#[async_trait]
impl RecordStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_all(&self) -> Result<Dataset, SyncError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Dataset::default()))
    }

    async fn replace_collection(&self, records: Collection<'_>) -> Result<(), SyncError> {
        if self.fail_on == Some(records.kind()) {
            return Err(SyncError::Transport(anyhow::anyhow!("HTTP 500")));
        }
        self.writes.lock().unwrap().push((records.kind(), records.len()));
        Ok(())
    }

    async fn reset(&self) -> Result<(), SyncError> {
        *self.resets.lock().unwrap() += 1;
        Ok(())
    }
}
