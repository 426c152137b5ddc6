//! Session lifecycle state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Lifecycle state of a [`Session`](super::Session)
///
/// ```text
/// Uninitialized -> Discovering -> Connecting -> Connected
///                                     ^            |
///                                     |            v
///                                     +---- Reconnecting
/// ```
///
/// Any state may move to `Closed`, which is terminal. A failed `start`
/// returns from `Discovering` or `Connecting` to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Discovering,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl SessionState {
    /// Whether the state machine allows `self -> next`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use SessionState::{Closed, Connected, Connecting, Discovering, Reconnecting, Uninitialized};

        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Uninitialized, Discovering)
            | (Discovering, Connecting | Uninitialized)
            | (Connecting, Connected | Uninitialized)
            | (Connected, Reconnecting)
            | (Reconnecting, Connecting) => true,
            _ => false,
        }
    }

    /// Apply a transition, returning the new state if it is allowed
    #[must_use]
    pub const fn transition(self, next: Self) -> Option<Self> {
        if self.can_transition_to(next) {
            Some(next)
        } else {
            None
        }
    }

    /// Loops are running or about to run
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Discovering | Self::Connecting | Self::Connected | Self::Reconnecting
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Discovering => "discovering",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus change notifications
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<SessionState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Uninitialized);
        Self { tx }
    }

    pub(crate) fn get(&self) -> SessionState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Move to `next` if allowed. Returns whether the state changed.
    pub(crate) fn advance(&self, next: SessionState) -> bool {
        let mut from = SessionState::Uninitialized;
        let changed = self.tx.send_if_modified(|current| {
            from = *current;
            match current.transition(next) {
                Some(state) => {
                    *current = state;
                    true
                }
                None => false,
            }
        });

        if changed {
            tracing::debug!(from = %from, to = %next, "Session state changed");
        } else if from != next {
            tracing::trace!(from = %from, to = %next, "Ignoring state transition");
        }
        changed
    }
}
