/// Page state definitions for tracking one page visit
///
/// This module defines the states a page passes through while the page
/// pipeline processes it, and the transitions allowed between them.
use std::fmt;

/// Represents the current state of a page in the page pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Request handed out by the queue, nothing done yet
    Pending,

    /// Page is being fetched and rendered, including the readiness wait
    Rendering,

    /// Page function is running
    Extracting,

    /// Records are being checked against the required attributes
    Validating,

    /// Surviving records are being written to the dataset
    Persisting,

    /// Outbound links are being discovered and enqueued
    LinkDiscovering,

    // ===== Terminal States =====
    /// Page was fully processed
    Done,

    /// Page processing failed
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if this is an active state (page may still be processed)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the pipeline may move from this state to `next`
    ///
    /// The pipeline is strictly linear; link discovery may be skipped when
    /// cascading is disabled, and every active state may fail.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;

        match (self, next) {
            (state, Failed) => state.is_active(),
            (Pending, Rendering)
            | (Rendering, Extracting)
            | (Extracting, Validating)
            | (Validating, Persisting)
            | (Persisting, LinkDiscovering)
            | (Persisting, Done)
            | (LinkDiscovering, Done) => true,
            _ => false,
        }
    }

    /// Returns the lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rendering => "rendering",
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::Persisting => "persisting",
            Self::LinkDiscovering => "link_discovering",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Rendering,
            Self::Extracting,
            Self::Validating,
            Self::Persisting,
            Self::LinkDiscovering,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
