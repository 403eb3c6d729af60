//! Digest sessions for gitscape.
//!
//! A session takes one source repository from locator to delivered digest:
//! it acquires the repository, runs the scanner and assembler on a blocking
//! worker and relays every progress event to an [`EventConsumer`] through a
//! bounded channel. The control path stays async; the worker never waits on
//! anything but file I/O and channel backpressure.
//!
//! Lifecycle: `INIT → ACQUIRING → SCANNING → ASSEMBLING → STREAMING`, ending
//! in `COMPLETE`, `ERROR` or `CANCELLED` (see [`SessionState`]).

mod acquire;
mod bridge;
mod error;
mod service;
mod state;

pub use acquire::{AcquiredRepository, Acquirer, Credentials, RepositoryAcquirer, SourceLocator};
pub use bridge::{
    BoxFuture, BridgeMessage, ChannelSink, ConsumerClosed, EventConsumer, ForwardOutcome,
    ForwardReport, spawn_forwarder,
};
pub use error::SessionError;
pub use service::{DigestRequest, DigestService, SessionReport};
pub use state::{SessionState, SessionStateCell};

// Re-export core types for convenience
pub use gitscape_core::{
    AcquisitionError, DigestConfig, DigestDocument, DigestError, ProgressEvent, SectionKind,
};
