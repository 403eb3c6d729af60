//! Session lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use strum::{Display, FromRepr};

use crate::error::SessionError;

/// State of a digest session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum SessionState {
    Init = 0,
    Acquiring,
    Scanning,
    Assembling,
    Streaming,
    Complete,
    Error,
    Cancelled,
}

impl SessionState {
    /// Whether the session has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }

    /// Whether `next` may follow `self`.
    ///
    /// The happy path moves forward one step at a time; `ERROR` and
    /// `CANCELLED` can interrupt any state that has not ended.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Init, Acquiring)
            | (Acquiring, Scanning)
            | (Scanning, Assembling)
            | (Assembling, Streaming)
            | (Streaming, Complete) => true,
            (from, Error | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Session state shared between the control path and the worker.
#[derive(Debug, Clone)]
pub struct SessionStateCell(Arc<AtomicU8>);

impl Default for SessionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateCell {
    /// A cell in `INIT`.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SessionState::Init as u8)))
    }

    /// Current state.
    pub fn get(&self) -> SessionState {
        SessionState::from_repr(self.0.load(Ordering::Acquire)).unwrap_or(SessionState::Error)
    }

    /// Move to `next`, returning the previous state.
    pub fn transition(&self, next: SessionState) -> Result<SessionState, SessionError> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = SessionState::from_repr(current).unwrap_or(SessionState::Error);
            if !from.can_transition_to(next) {
                return Err(SessionError::InvalidTransition { from, to: next });
            }
            match self.0.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    tracing::debug!(%from, to = %next, "Session transition");
                    return Ok(from);
                }
                Err(actual) => current = actual,
            }
        }
    }
}
