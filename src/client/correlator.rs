// ABOUTME: Matches responses to outstanding requests by sequence number
// ABOUTME: Each pending request owns a oneshot slot that is resolved, timed out or failed exactly once

use crate::client::error::{SessionError, SessionResult};
use crate::codec::Frame;
use crate::datatypes::CommandId;
use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

struct PendingRequest {
    command_id: CommandId,
    sent_at: Instant,
    response_tx: oneshot::Sender<SessionResult<Frame>>,
}

/// Table of requests waiting for a response.
///
/// The lock is never held across an await; the reader task resolves entries
/// while callers wait on their own receivers.
#[derive(Default)]
pub struct PendingRequests {
    pending: Mutex<HashMap<u32, PendingRequest>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<u32, PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a request before it is written so a fast response cannot be
    /// missed. The entry is removed again when the returned future completes
    /// or is dropped.
    pub fn register(
        &self,
        sequence_number: u32,
        command_id: CommandId,
        timeout: Duration,
    ) -> ResponseFuture<'_> {
        let (response_tx, response_rx) = oneshot::channel();
        let sent_at = Instant::now();
        let replaced = self.table().insert(
            sequence_number,
            PendingRequest {
                command_id,
                sent_at,
                response_tx,
            },
        );
        if let Some(old) = replaced {
            // Only possible after the sequence space wrapped under a stuck request
            warn!(
                sequence_number,
                command_id = ?old.command_id,
                "replacing stale pending request"
            );
        }

        ResponseFuture {
            table: self,
            sequence_number,
            timeout,
            deadline: deadline_after(sent_at, timeout),
            response_rx,
        }
    }

    /// Hand a response to whoever waits for its sequence number.
    ///
    /// Returns false for unsolicited responses, which are dropped.
    pub fn resolve(&self, frame: Frame) -> bool {
        let sequence_number = frame.sequence_number();
        let Some(pending) = self.table().remove(&sequence_number) else {
            warn!(
                sequence_number,
                command_id = ?frame.command_id(),
                "dropping unsolicited response"
            );
            return false;
        };

        debug!(
            sequence_number,
            request = ?pending.command_id,
            response = ?frame.command_id(),
            latency_ms = pending.sent_at.elapsed().as_millis() as u64,
            "response received"
        );
        // The caller may have given up already
        let _ = pending.response_tx.send(Ok(frame));
        true
    }

    /// Fail a single pending request, e.g. when its response could not be decoded
    pub fn fail(&self, sequence_number: u32, error: SessionError) -> bool {
        match self.table().remove(&sequence_number) {
            Some(pending) => {
                let _ = pending.response_tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fail every pending request; used when the session closes
    pub fn fail_all(&self, error: impl Fn() -> SessionError) -> usize {
        let drained: Vec<_> = self.table().drain().collect();
        let count = drained.len();
        for (sequence_number, pending) in drained {
            debug!(
                sequence_number,
                command_id = ?pending.command_id,
                "failing pending request"
            );
            let _ = pending.response_tx.send(Err(error()));
        }
        count
    }

    fn remove(&self, sequence_number: u32) {
        self.table().remove(&sequence_number);
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PendingRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequests")
            .field("pending", &self.len())
            .finish()
    }
}

// Roughly 30 years; stands in for timeouts too large to add to an Instant
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// The response slot of one registered request.
///
/// Awaiting it yields the response frame, `SessionError::Timeout` once the
/// deadline passes, or the error the session closed with.
pub struct ResponseFuture<'a> {
    table: &'a PendingRequests,
    sequence_number: u32,
    timeout: Duration,
    deadline: Instant,
    response_rx: oneshot::Receiver<SessionResult<Frame>>,
}

impl<'a> IntoFuture for ResponseFuture<'a> {
    type Output = SessionResult<Frame>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(mut self) -> Self::IntoFuture {
        Box::pin(async move {
            match tokio::time::timeout_at(self.deadline, &mut self.response_rx).await {
                Ok(Ok(result)) => result,
                // Sender dropped without an answer
                Ok(Err(_)) => Err(SessionError::ConnectionClosed),
                Err(_) => {
                    debug!(
                        sequence_number = self.sequence_number,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "request timed out"
                    );
                    Err(SessionError::Timeout(self.timeout))
                }
            }
        })
    }
}

impl Drop for ResponseFuture<'_> {
    fn drop(&mut self) {
        self.table.remove(self.sequence_number);
    }
}
