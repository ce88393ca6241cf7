//! Request queue capability and its in-memory implementation
//!
//! The queue owns the lifecycle of a request: pending, in progress, handled.
//! Requests are deduplicated by their unique key; a request that fails is
//! reclaimed back into the pending list until the retry budget runs out.

use crate::record::Request;
use crate::SyncError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Outcome of adding a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueOperationInfo {
    /// Identifier of the (possibly pre-existing) request
    pub request_id: String,

    /// A request with the same unique key was already in the queue
    pub was_already_present: bool,

    /// That request was already handled
    pub was_already_handled: bool,
}

/// Tracks pending, in-progress and handled requests
#[async_trait]
pub trait RequestQueue: Send + Sync {
    /// Adds a request unless one with the same unique key exists
    async fn add_request(&self, request: Request) -> Result<QueueOperationInfo, SyncError>;

    /// Takes the next pending request and marks it in progress
    async fn fetch_next_request(&self) -> Result<Option<Request>, SyncError>;

    /// Marks an in-progress request as handled
    async fn mark_request_handled(&self, request: &Request) -> Result<(), SyncError>;

    /// Returns an in-progress request to the pending list
    async fn reclaim_request(&self, request: Request) -> Result<(), SyncError>;

    /// True when nothing is pending and nothing is in progress
    async fn is_finished(&self) -> Result<bool, SyncError>;

    /// Number of requests pending or in progress
    async fn unfinished_count(&self) -> Result<usize, SyncError>;

    /// Number of handled requests
    async fn handled_count(&self) -> Result<usize, SyncError>;
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Request>,
    ids_by_key: HashMap<String, String>,
    in_progress: HashSet<String>,
    handled: HashSet<String>,
    next_id: u64,
}

/// A request queue held in memory for the lifetime of one crawl session
#[derive(Debug, Default)]
pub struct MemoryRequestQueue {
    state: Mutex<QueueState>,
}

impl MemoryRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, QueueState>, SyncError> {
        self.state
            .lock()
            .map_err(|_| SyncError::Queue("request queue lock poisoned".to_string()))
    }
}

#[async_trait]
impl RequestQueue for MemoryRequestQueue {
    async fn add_request(&self, mut request: Request) -> Result<QueueOperationInfo, SyncError> {
        let mut state = self.lock()?;

        if let Some(existing) = state.ids_by_key.get(&request.unique_key) {
            return Ok(QueueOperationInfo {
                request_id: existing.clone(),
                was_already_present: true,
                was_already_handled: state.handled.contains(existing),
            });
        }

        state.next_id += 1;
        let id = state.next_id.to_string();
        request.id = Some(id.clone());
        state.ids_by_key.insert(request.unique_key.clone(), id.clone());
        state.pending.push_back(request);

        Ok(QueueOperationInfo {
            request_id: id,
            was_already_present: false,
            was_already_handled: false,
        })
    }

    async fn fetch_next_request(&self) -> Result<Option<Request>, SyncError> {
        let mut state = self.lock()?;
        let Some(request) = state.pending.pop_front() else {
            return Ok(None);
        };
        if let Some(id) = &request.id {
            state.in_progress.insert(id.clone());
        }
        Ok(Some(request))
    }

    async fn mark_request_handled(&self, request: &Request) -> Result<(), SyncError> {
        let id = request_id(request)?;
        let mut state = self.lock()?;
        if !state.in_progress.remove(id) {
            return Err(SyncError::Queue(format!(
                "request {} ({}) is not in progress",
                id, request.url
            )));
        }
        state.handled.insert(id.to_string());
        Ok(())
    }

    async fn reclaim_request(&self, request: Request) -> Result<(), SyncError> {
        let id = request_id(&request)?.to_string();
        let mut state = self.lock()?;
        if !state.in_progress.remove(&id) {
            return Err(SyncError::Queue(format!(
                "request {} ({}) is not in progress",
                id, request.url
            )));
        }
        state.pending.push_back(request);
        Ok(())
    }

    async fn is_finished(&self) -> Result<bool, SyncError> {
        let state = self.lock()?;
        Ok(state.pending.is_empty() && state.in_progress.is_empty())
    }

    async fn unfinished_count(&self) -> Result<usize, SyncError> {
        let state = self.lock()?;
        Ok(state.pending.len() + state.in_progress.len())
    }

    async fn handled_count(&self) -> Result<usize, SyncError> {
        Ok(self.lock()?.handled.len())
    }
}

fn request_id(request: &Request) -> Result<&str, SyncError> {
    request
        .id
        .as_deref()
        .ok_or_else(|| SyncError::Queue(format!("request {} has no id", request.url)))
}
