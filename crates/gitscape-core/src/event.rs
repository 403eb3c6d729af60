//! Progress events and the sink the blocking computation reports into.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::document::DigestDocument;

/// Percentages owned by each stage of a session.
pub mod stage {
    /// Acquisition starts.
    pub const ACQUIRING: u8 = 0;
    /// Repository is available locally.
    pub const ACQUIRED: u8 = 10;
    /// Traversal in progress.
    pub const SCANNING: u8 = 15;
    /// Directory tree rendered; content assembly owns the rest.
    pub const TREE_BUILT: u8 = 20;
    /// Digest finished.
    pub const DONE: u8 = 100;
}

/// Event relayed from a digest session to its consumer.
///
/// Within one session percentages never decrease, and exactly one terminal
/// event (`Complete` or `Error`) is delivered, always last.
///
/// Serialized as a JSON object tagged by `type` (`progress`,
/// `digest_complete`, `error`); every variant carries a `percentage`,
/// terminal ones always 100.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Intermediate progress.
    Progress { message: String, percentage: u8 },
    /// The finished digest.
    Complete { digest: DigestDocument },
    /// The session failed.
    Error { message: String },
}

impl ProgressEvent {
    /// Create a progress event, clamping the percentage to 100.
    pub fn progress(message: impl Into<String>, percentage: u8) -> Self {
        Self::Progress {
            message: message.into(),
            percentage: percentage.min(100),
        }
    }

    /// Create an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    /// Percentage carried by the event; terminal events count as 100.
    pub fn percentage(&self) -> u8 {
        match self {
            Self::Progress { percentage, .. } => *percentage,
            Self::Complete { .. } | Self::Error { .. } => 100,
        }
    }
}

impl Serialize for ProgressEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProgressEvent", 3)?;
        match self {
            Self::Progress { message, .. } => {
                state.serialize_field("type", "progress")?;
                state.serialize_field("message", message)?;
            }
            Self::Complete { digest } => {
                state.serialize_field("type", "digest_complete")?;
                state.serialize_field("digest", digest)?;
            }
            Self::Error { message } => {
                state.serialize_field("type", "error")?;
                state.serialize_field("message", message)?;
            }
        }
        state.serialize_field("percentage", &self.percentage())?;
        state.end()
    }
}

/// Receiver of progress reports from the traversal and assembly code.
pub trait ProgressSink {
    /// Report progress. `percentage` is in `0..=100`.
    fn report(&mut self, message: &str, percentage: u8);

    /// Whether the work should stop at the next checkpoint.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn report(&mut self, message: &str, percentage: u8) {
        (**self).report(message, percentage);
    }

    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&mut self, _message: &str, _percentage: u8) {}
}

/// Sink adapter that keeps reported percentages non-decreasing.
#[derive(Debug)]
pub struct ProgressTracker<S> {
    inner: S,
    last: u8,
}

impl<S: ProgressSink> ProgressTracker<S> {
    /// Wrap a sink.
    pub fn new(inner: S) -> Self {
        Self { inner, last: 0 }
    }

    /// Start from a floor, e.g. after progress reported elsewhere.
    pub fn starting_at(inner: S, floor: u8) -> Self {
        Self {
            inner,
            last: floor.min(100),
        }
    }

    /// Last percentage forwarded.
    pub fn last(&self) -> u8 {
        self.last
    }

    /// Unwrap the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ProgressSink> ProgressSink for ProgressTracker<S> {
    fn report(&mut self, message: &str, percentage: u8) {
        let percentage = percentage.min(100).max(self.last);
        self.last = percentage;
        self.inner.report(message, percentage);
    }

    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}
