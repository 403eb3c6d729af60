//! Session entry points.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use gitscape_core::{
    AcquisitionError, DigestConfig, DigestDocument, ProgressEvent, ProgressSink, ProgressTracker,
    stage,
};
use gitscape_digest::DigestAssembler;
use gitscape_scan::RepoScanner;

use crate::acquire::{AcquiredRepository, Acquirer, Credentials, RepositoryAcquirer, SourceLocator};
use crate::bridge::{BridgeMessage, ChannelSink, EventConsumer, ForwardOutcome, spawn_forwarder};
use crate::error::SessionError;
use crate::state::{SessionState, SessionStateCell};

/// What to digest.
#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub source: SourceLocator,
    pub credentials: Option<Credentials>,
    /// Directory inside the repository to use as the digest root.
    pub subpath: Option<PathBuf>,
}

impl DigestRequest {
    pub fn new(source: SourceLocator) -> Self {
        Self {
            source,
            credentials: None,
            subpath: None,
        }
    }

    /// Parse a source string into a request.
    pub fn parse(source: &str) -> Result<Self, AcquisitionError> {
        SourceLocator::parse(source).map(Self::new)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_subpath(mut self, subpath: impl Into<PathBuf>) -> Self {
        self.subpath = Some(subpath.into());
        self
    }
}

/// How a streaming session ended.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub final_state: SessionState,
    /// Events the consumer accepted, terminal event included.
    pub events_delivered: usize,
    /// Message of the error event, for `ERROR` sessions.
    pub error: Option<String>,
}

impl SessionReport {
    pub fn is_complete(&self) -> bool {
        self.final_state == SessionState::Complete
    }
}

/// Runs digest sessions with a fixed configuration.
pub struct DigestService<A = RepositoryAcquirer> {
    config: Arc<DigestConfig>,
    scanner: Arc<RepoScanner>,
    acquirer: Arc<A>,
    shutdown: CancellationToken,
}

impl DigestService<RepositoryAcquirer> {
    /// Create a service that acquires with libgit2.
    pub fn new(config: DigestConfig) -> Result<Self, SessionError> {
        Self::with_acquirer(config, RepositoryAcquirer::new())
    }
}

impl<A: Acquirer + 'static> DigestService<A> {
    /// Create a service with a custom acquisition collaborator.
    pub fn with_acquirer(config: DigestConfig, acquirer: A) -> Result<Self, SessionError> {
        config.validate()?;
        let scanner = RepoScanner::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            scanner: Arc::new(scanner),
            acquirer: Arc::new(acquirer),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Cancel every running and future session.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Request/response entry point: the digest or the reason there is none.
    pub async fn run_digest(&self, request: DigestRequest) -> Result<DigestDocument, SessionError> {
        let state = SessionStateCell::new();
        let start = Instant::now();
        state.transition(SessionState::Acquiring)?;
        let token = self.shutdown.child_token();

        let repo = match self.acquire(&request, &token).await {
            Ok(repo) => repo,
            Err(err) => {
                if err.is_cancelled() {
                    let _ = state.transition(SessionState::Cancelled);
                } else {
                    let _ = state.transition(SessionState::Error);
                    tracing::error!(source = %request.source, error = %err, "Acquisition failed");
                }
                return Err(err);
            }
        };

        let scanner = Arc::clone(&self.scanner);
        let config = Arc::clone(&self.config);
        let worker_state = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut sink = TokenSink(token);
            build_digest(&scanner, &config, &repo, &mut sink, &worker_state)
        })
        .await
        .map_err(SessionError::from_join)
        .and_then(|result| result);

        match result {
            Ok(doc) => {
                state.transition(SessionState::Streaming)?;
                state.transition(SessionState::Complete)?;
                tracing::info!(
                    source = %request.source,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Digest session complete"
                );
                Ok(doc)
            }
            Err(err) => {
                let terminal = if err.is_cancelled() {
                    SessionState::Cancelled
                } else {
                    SessionState::Error
                };
                let _ = state.transition(terminal);
                tracing::error!(source = %request.source, error = %err, "Digest session failed");
                Err(err)
            }
        }
    }

    /// Streaming entry point: relay every event to `consumer` until the
    /// session ends.
    pub async fn run_streaming<C>(&self, request: DigestRequest, consumer: C) -> SessionReport
    where
        C: EventConsumer + 'static,
    {
        self.run_streaming_observed(request, consumer, SessionStateCell::new())
            .await
    }

    /// Like [`run_streaming`](Self::run_streaming), publishing the state
    /// into a caller-owned cell.
    pub async fn run_streaming_observed<C>(
        &self,
        request: DigestRequest,
        consumer: C,
        state: SessionStateCell,
    ) -> SessionReport
    where
        C: EventConsumer + 'static,
    {
        let start = Instant::now();
        let source = request.source.clone();
        let token = self.shutdown.child_token();
        let (tx, rx) = mpsc::channel(self.config.event_channel_capacity);
        let forwarder = spawn_forwarder(rx, consumer, token.clone());
        tracing::info!(%source, "Digest session started");

        self.drive(request, tx, token, &state).await;
        // Worker is done; what remains is draining the channel.
        let _ = state.transition(SessionState::Streaming);

        let (delivered, outcome) = match forwarder.await {
            Ok(report) => (report.delivered, report.outcome),
            Err(err) => (0, ForwardOutcome::Failed(SessionError::from_join(err))),
        };

        let (terminal, error) = match outcome {
            ForwardOutcome::Completed => (SessionState::Complete, None),
            ForwardOutcome::Cancelled | ForwardOutcome::Disconnected => {
                (SessionState::Cancelled, None)
            }
            ForwardOutcome::Failed(err) => (SessionState::Error, Some(err.to_string())),
        };
        if let Err(err) = state.transition(terminal) {
            tracing::warn!(error = %err, "Could not record terminal state");
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &error {
            Some(message) => tracing::error!(%source, error = %message, elapsed_ms, "Digest session failed"),
            None => tracing::info!(%source, state = %terminal, delivered, elapsed_ms, "Digest session ended"),
        }

        SessionReport {
            final_state: state.get(),
            events_delivered: delivered,
            error,
        }
    }

    /// Acquire, then run the worker. Every path ends by dropping `tx`,
    /// normally right after the sentinel.
    async fn drive(
        &self,
        request: DigestRequest,
        tx: mpsc::Sender<BridgeMessage>,
        token: CancellationToken,
        state: &SessionStateCell,
    ) {
        if state.transition(SessionState::Acquiring).is_err() {
            return;
        }
        if !emit(&tx, "Starting repository acquisition...", stage::ACQUIRING).await {
            return;
        }

        let repo = match self.acquire(&request, &token).await {
            Ok(repo) => repo,
            Err(err) => {
                let _ = tx.send(BridgeMessage::Finished(Err(err))).await;
                return;
            }
        };
        if !emit(&tx, "Repository acquired. Scanning files...", stage::ACQUIRED).await {
            return;
        }

        let scanner = Arc::clone(&self.scanner);
        let config = Arc::clone(&self.config);
        let worker_state = state.clone();
        let worker = tokio::task::spawn_blocking(move || {
            let mut sink = ChannelSink::new(tx, token);
            let result = {
                let mut progress = ProgressTracker::starting_at(&mut sink, stage::ACQUIRED);
                build_digest(&scanner, &config, &repo, &mut progress, &worker_state)
            };
            sink.finish(result);
        });

        if let Err(err) = worker.await {
            tracing::error!(error = %err, "Digest worker panicked");
        }
    }

    async fn acquire(
        &self,
        request: &DigestRequest,
        token: &CancellationToken,
    ) -> Result<AcquiredRepository, SessionError> {
        let acquirer = Arc::clone(&self.acquirer);
        let token = token.clone();
        let source = request.source.clone();
        let credentials = request.credentials.clone();
        let subpath = request.subpath.clone();

        let repo = tokio::task::spawn_blocking(move || {
            let repo = acquirer.acquire(&source, credentials.as_ref(), &token)?;
            match subpath {
                Some(subpath) => repo.with_subpath(&subpath),
                None => Ok(repo),
            }
        })
        .await
        .map_err(SessionError::from_join)??;

        Ok(repo)
    }
}

/// Scan and assemble on the current (blocking) thread.
fn build_digest(
    scanner: &RepoScanner,
    config: &DigestConfig,
    repo: &AcquiredRepository,
    sink: &mut dyn ProgressSink,
    state: &SessionStateCell,
) -> Result<DigestDocument, SessionError> {
    advance(state, SessionState::Scanning)?;
    let outcome = scanner.scan_with_progress(repo.root(), sink)?;
    tracing::info!(
        files = outcome.files.len(),
        skipped = outcome.skipped.len(),
        truncated = outcome.truncation.is_some(),
        "Scan finished"
    );

    advance(state, SessionState::Assembling)?;
    let mut assembler = DigestAssembler::new(config)?;
    Ok(assembler.assemble(&outcome, repo.label(), sink)?)
}

/// A failed transition means the session already ended elsewhere.
fn advance(state: &SessionStateCell, next: SessionState) -> Result<(), SessionError> {
    state
        .transition(next)
        .map(|_| ())
        .map_err(|_| SessionError::Cancelled)
}

async fn emit(tx: &mpsc::Sender<BridgeMessage>, message: &str, percentage: u8) -> bool {
    tx.send(BridgeMessage::Event(ProgressEvent::progress(message, percentage)))
        .await
        .is_ok()
}

/// Sink for request/response sessions: no events, only cancellation.
struct TokenSink(CancellationToken);

impl ProgressSink for TokenSink {
    fn report(&mut self, _message: &str, _percentage: u8) {}

    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}
