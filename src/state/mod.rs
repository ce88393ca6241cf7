//! State module for tracking page progress
//!
//! This module provides the page state machine used by the page pipeline.
//!
//! # Components
//!
//! - `PageState`: the states of one page visit (pending, rendering, extracting, ...)
//! - `PageTracker`: a page's current state with checked transitions

mod page_state;

pub use page_state::PageState;

use crate::SyncError;

/// Tracks the state of one page and rejects transitions the pipeline never makes
#[derive(Debug)]
pub struct PageTracker {
    url: String,
    state: PageState,
}

impl PageTracker {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: PageState::Pending,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Moves to `next`, failing with `InvalidTransition` if the move is not allowed
    pub fn advance(&mut self, next: PageState) -> Result<(), SyncError> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Marks the page failed from whatever active state it is in
    pub fn fail(&mut self) {
        if self.state.is_active() {
            tracing::trace!("{}: {} -> {}", self.url, self.state, PageState::Failed);
            self.state = PageState::Failed;
        }
    }
}
