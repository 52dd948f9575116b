//! In-memory approval channel.
//!
//! `ResponderChannel` answers approval requests with a caller-supplied
//! function instead of a human. The function runs on a worker thread so the
//! channel can enforce the same timeout contract as a real approver: when the
//! responder does not answer in time, the request resolves to `TimedOut` and
//! the worker's eventual answer is dropped.
//!
//! Useful as a test double and for unattended hosts that want a fixed answer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::debug;

use tollgate_contracts::{
    approval::{ApprovalOutcome, ApprovalRequest},
    error::GateResult,
    session::SessionContext,
};
use tollgate_core::traits::ApprovalChannel;

/// The function that stands in for the human approver.
pub type ResponderFn = Arc<dyn Fn(&ApprovalRequest) -> ApprovalOutcome + Send + Sync>;

/// An `ApprovalChannel` driven by a [`ResponderFn`].
#[derive(Clone)]
pub struct ResponderChannel {
    responder: ResponderFn,
    requests: Arc<AtomicUsize>,
    announcements: Arc<AtomicUsize>,
}

impl ResponderChannel {
    pub fn new(responder: impl Fn(&ApprovalRequest) -> ApprovalOutcome + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            requests: Arc::new(AtomicUsize::new(0)),
            announcements: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer with `outcome`.
    pub fn always(outcome: ApprovalOutcome) -> Self {
        Self::new(move |_| outcome.clone())
    }

    /// Never answer. Every request resolves to `TimedOut`.
    ///
    /// Each request parks one worker thread for the life of the process.
    pub fn silent() -> Self {
        Self::new(|_| loop {
            thread::park();
        })
    }

    /// How many approval requests this channel (and its clones) received.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// How many session notifications this channel (and its clones) received.
    pub fn announcement_count(&self) -> usize {
        self.announcements.load(Ordering::SeqCst)
    }
}

impl ApprovalChannel for ResponderChannel {
    fn request(&self, request: &ApprovalRequest, timeout: Duration) -> ApprovalOutcome {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::sync_channel(1);
        let responder = Arc::clone(&self.responder);
        let owned = request.clone();
        let spawned = thread::Builder::new()
            .name(format!("approval-{}", request.dispatch_id))
            .spawn(move || {
                // The receiver may be gone after a timeout; nothing to do then.
                let _ = tx.send(responder(&owned));
            });

        if let Err(e) = spawned {
            return ApprovalOutcome::ChannelError {
                reason: format!("failed to start responder: {e}"),
            };
        }

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                debug!(dispatch_id = %request.dispatch_id, "responder did not answer in time");
                ApprovalOutcome::TimedOut
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => ApprovalOutcome::ChannelError {
                reason: "responder exited without answering".to_string(),
            },
        }
    }

    fn announce_start(&self, _session: &SessionContext) -> GateResult<()> {
        self.announcements.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn announce_end(&self, _session: &SessionContext) -> GateResult<()> {
        self.announcements.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
