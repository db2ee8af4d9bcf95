// ABOUTME: SMPP client session: bind/unbind state machine over a split TCP link
// ABOUTME: A reader task resolves responses and answers peer requests while callers await their own responses

use crate::client::correlator::PendingRequests;
use crate::client::error::{SessionError, SessionResult};
use crate::client::handler::{self, DefaultSessionHandler, SessionHandler};
use crate::client::keepalive::KeepAliveManager;
use crate::client::sequence::SequenceNumberAllocator;
use crate::client::types::{SessionConfiguration, SessionState};
use crate::codec::{CodecError, Frame};
use crate::connection::{Connection, ConnectionError, ConnectionReader, ConnectionWriter};
use crate::datatypes::{EnquireLink, EnquireLinkResponse, GenericNack, Unbind};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why a link went down. The first recorded cause wins.
#[derive(Debug, Clone)]
enum CloseCause {
    /// close(), unbind() or a failed bind
    Local,
    Channel(String),
    Malformed(CodecError),
}

impl CloseCause {
    fn to_error(&self) -> SessionError {
        match self {
            CloseCause::Local => SessionError::ConnectionClosed,
            CloseCause::Channel(reason) => SessionError::Channel(reason.clone()),
            CloseCause::Malformed(e) => SessionError::Malformed(e.clone()),
        }
    }
}

/// State shared between the session owner and the reader task of one bind cycle.
struct Link {
    state: AtomicU8,
    pending: PendingRequests,
    writer: tokio::sync::Mutex<Option<ConnectionWriter>>,
    cause: Mutex<Option<CloseCause>>,
    // Wakes the reader task when the link is closed from the caller side
    shutdown: Notify,
}

impl Link {
    fn closed() -> Self {
        Self::with_writer(SessionState::Closed, None)
    }

    fn open(writer: ConnectionWriter) -> Self {
        Self::with_writer(SessionState::Open, Some(writer))
    }

    fn with_writer(state: SessionState, writer: Option<ConnectionWriter>) -> Self {
        Self {
            state: AtomicU8::new(state.into()),
            pending: PendingRequests::new(),
            writer: tokio::sync::Mutex::new(writer),
            cause: Mutex::new(None),
            shutdown: Notify::new(),
        }
    }

    fn state(&self) -> SessionState {
        SessionState::try_from(self.state.load(Ordering::SeqCst)).unwrap_or(SessionState::Closed)
    }

    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        self.state
            .compare_exchange(from.into(), to.into(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn recorded_cause(&self) -> Option<SessionError> {
        self.cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(CloseCause::to_error)
    }

    /// The error a request on this closed link reports
    fn closed_error(&self) -> SessionError {
        self.recorded_cause()
            .unwrap_or(SessionError::ConnectionClosed)
    }

    /// Move to CLOSED and fail everything still waiting.
    ///
    /// Returns false if the link was already closed.
    fn mark_closed(&self, cause: CloseCause) -> bool {
        let previous = self.state.swap(SessionState::Closed.into(), Ordering::SeqCst);
        {
            let mut slot = self.cause.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(cause);
            }
        }
        let failed = self.pending.fail_all(|| self.closed_error());
        if failed > 0 {
            debug!(failed, "failed pending requests on close");
        }
        self.shutdown.notify_one();
        previous != u8::from(SessionState::Closed)
    }

    async fn close(&self, cause: CloseCause) {
        if self.mark_closed(cause) {
            debug!("link closed");
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("error shutting down connection: {}", e);
            }
        }
    }

    /// Write one frame. An I/O failure closes the link.
    async fn write(&self, frame: &Frame) -> SessionResult<()> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(self.closed_error());
        };

        if let Err(e) = writer.write_frame(frame).await {
            warn!(
                command_id = ?frame.command_id(),
                sequence_number = frame.sequence_number(),
                "write failed: {}", e
            );
            guard.take();
            drop(guard);
            let cause = CloseCause::Channel(e.to_string());
            self.mark_closed(cause);
            return Err(self.closed_error());
        }
        Ok(())
    }
}

/// An SMPP client session.
///
/// State-changing operations (`bind`, `unbind`, `close`) take `&mut self`;
/// requests on a bound session (`enquire_link`, `send_request`) take `&self`
/// and may run concurrently.
///
/// A session covers a single bind cycle. Once a connection has been opened
/// and closed again, bind a new `Session` to reconnect.
///
/// ```rust,no_run
/// use smpp_session::client::{Session, SessionConfiguration};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let config = SessionConfiguration::new(
///     "localhost",
///     2775,
///     "smppclient1".parse()?,
///     "password".parse()?,
/// );
/// let mut session = Session::new(config);
/// session.bind().await?;
/// let response = session.enquire_link(Duration::from_secs(5)).await?;
/// println!("enquire_link status: {}", response.command_status);
/// session.unbind().await;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    config: SessionConfiguration,
    handler: Arc<dyn SessionHandler>,
    sequence: SequenceNumberAllocator,
    link: Arc<Link>,
    reader_task: Option<JoinHandle<()>>,
    // Set once bind() got a connection; the session cannot be bound again
    cycle_started: bool,
}

impl Session {
    /// Create a session in the CLOSED state. No I/O happens until `bind()`.
    pub fn new(config: SessionConfiguration) -> Self {
        Self::with_handler(config, Arc::new(DefaultSessionHandler))
    }

    pub fn with_handler(config: SessionConfiguration, handler: Arc<dyn SessionHandler>) -> Self {
        Self {
            config,
            handler,
            sequence: SequenceNumberAllocator::new(),
            link: Arc::new(Link::closed()),
            reader_task: None,
            cycle_started: false,
        }
    }

    pub fn config(&self) -> &SessionConfiguration {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.link.state()
    }

    pub fn state_name(&self) -> &'static str {
        self.state().name()
    }

    /// Number of requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.link.pending.len()
    }

    /// Connect and bind. On any failure the connection is closed and the
    /// session is back in CLOSED.
    ///
    /// Fails with `ConnectionClosed` once an earlier bind cycle has ended. A
    /// connect failure does not use up the session.
    pub async fn bind(&mut self) -> SessionResult<()> {
        let state = self.state();
        if state != SessionState::Closed {
            return Err(SessionError::AlreadyBound(state));
        }
        if self.cycle_started {
            debug!("bind on a session whose bind cycle has ended");
            return Err(SessionError::ConnectionClosed);
        }

        let host = self.config.host.clone();
        let port = self.config.port;
        info!(host = %host, port, bind_type = %self.config.bind_type, "connecting");

        let connection = Connection::connect(&host, port, self.config.connect_timeout)
            .await
            .map_err(|source| {
                warn!(host = %host, port, "connect failed: {}", source);
                SessionError::Connect {
                    host: host.clone(),
                    port,
                    source,
                }
            })?;
        self.cycle_started = true;
        let (reader, writer) = connection.into_split();

        let link = Arc::new(Link::open(writer));
        self.link = Arc::clone(&link);
        self.reader_task = Some(tokio::spawn(read_loop(
            Arc::clone(&link),
            reader,
            Arc::clone(&self.handler),
        )));

        let result = self.exchange_bind(&link).await;
        if let Err(e) = &result {
            warn!(host = %host, port, "bind failed: {}", e);
            self.teardown(CloseCause::Local).await;
        }
        result
    }

    async fn exchange_bind(&self, link: &Link) -> SessionResult<()> {
        let sequence_number = self.sequence.next();
        let bind = Frame::Bind(self.config.bind_pdu(sequence_number));
        let response =
            link.pending
                .register(sequence_number, bind.command_id(), self.config.request_timeout);

        if !link.advance(SessionState::Open, SessionState::Binding) {
            return Err(link.closed_error());
        }
        debug!(sequence_number, state = %link.state(), "sending bind");
        link.write(&bind).await?;

        match response.await? {
            Frame::BindResp(resp) if resp.bind_type == self.config.bind_type => {
                if !resp.command_status.is_ok() {
                    return Err(SessionError::BindRejected {
                        status: resp.command_status,
                    });
                }
                if !link.advance(SessionState::Binding, SessionState::Bound) {
                    return Err(link.closed_error());
                }
                info!(
                    system_id = %resp.system_id,
                    sc_interface_version = ?resp.sc_interface_version,
                    bind_type = %self.config.bind_type,
                    "bound"
                );
                Ok(())
            }
            Frame::GenericNack(nack) => Err(SessionError::BindRejected {
                status: nack.command_status,
            }),
            other => Err(SessionError::ProtocolViolation(format!(
                "bind answered with {:?}",
                other.command_id()
            ))),
        }
    }

    /// Send an enquire_link and wait for its response.
    ///
    /// A timeout leaves the session bound; the caller decides what to do.
    pub async fn enquire_link(&self, timeout: Duration) -> SessionResult<EnquireLinkResponse> {
        let request = Frame::EnquireLink(EnquireLink::new(0));
        match self.request("enquire_link", request, timeout).await? {
            Frame::EnquireLinkResp(resp) => Ok(resp),
            other => Err(SessionError::ProtocolViolation(format!(
                "enquire_link answered with {:?}",
                other.command_id()
            ))),
        }
    }

    /// Send any request PDU on the bound session and wait for its response.
    ///
    /// The sequence number is allocated here and overwrites whatever the
    /// frame carried. A generic_nack answer is returned as
    /// `SessionError::GenericNack`.
    pub async fn send_request(&self, request: Frame, timeout: Duration) -> SessionResult<Frame> {
        self.request("send_request", request, timeout).await
    }

    async fn request(
        &self,
        operation: &'static str,
        mut request: Frame,
        timeout: Duration,
    ) -> SessionResult<Frame> {
        self.ensure_bound(operation)?;
        if request.is_response() {
            return Err(SessionError::ProtocolViolation(format!(
                "{:?} is not a request",
                request.command_id()
            )));
        }

        let link = &self.link;
        let sequence_number = self.sequence.next();
        request.set_sequence_number(sequence_number);
        let response = link
            .pending
            .register(sequence_number, request.command_id(), timeout);
        // The reader may have closed the link between the check and the registration
        if link.state() == SessionState::Closed {
            return Err(link.closed_error());
        }

        debug!(sequence_number, command_id = ?request.command_id(), "sending request");
        link.write(&request).await?;

        let frame = response.await?;
        match frame {
            Frame::GenericNack(nack) => Err(SessionError::GenericNack(nack.command_status)),
            frame if request.command_id().response_id() == Some(frame.command_id()) => Ok(frame),
            other => Err(SessionError::ProtocolViolation(format!(
                "{:?} answered with {:?}",
                request.command_id(),
                other.command_id()
            ))),
        }
    }

    fn ensure_bound(&self, operation: &'static str) -> SessionResult<()> {
        match self.state() {
            SessionState::Bound => Ok(()),
            SessionState::Closed => Err(self.link.recorded_cause().unwrap_or(
                SessionError::InvalidState {
                    operation,
                    state: SessionState::Closed,
                },
            )),
            state => Err(SessionError::InvalidState { operation, state }),
        }
    }

    /// Unbind and close. Best effort: waits at most `unbind_timeout` for
    /// unbind_resp, ignores failures and always ends CLOSED.
    pub async fn unbind(&mut self) {
        match self.state() {
            SessionState::Closed => {
                debug!("unbind on a closed session");
                return;
            }
            SessionState::Bound if self.link.advance(SessionState::Bound, SessionState::Unbinding) => {
                let link = Arc::clone(&self.link);
                let sequence_number = self.sequence.next();
                let request = Frame::Unbind(Unbind::new(sequence_number));
                let response = link.pending.register(
                    sequence_number,
                    request.command_id(),
                    self.config.unbind_timeout,
                );

                debug!(sequence_number, "sending unbind");
                match link.write(&request).await {
                    Ok(()) => match response.await {
                        Ok(Frame::UnbindResp(resp)) => {
                            debug!(status = %resp.command_status, "unbind acknowledged")
                        }
                        Ok(other) => debug!(response = ?other.command_id(), "unexpected unbind answer"),
                        Err(e) => debug!("unbind not acknowledged: {}", e),
                    },
                    Err(e) => debug!("could not send unbind: {}", e),
                }
            }
            state => debug!(state = %state, "unbind without a bound session, closing"),
        }

        self.teardown(CloseCause::Local).await;
        info!("unbound");
    }

    /// Close the connection without unbinding. Idempotent.
    pub async fn close(&mut self) {
        self.teardown(CloseCause::Local).await;
    }

    /// Send an enquire_link if the keep-alive schedule says one is due.
    ///
    /// Returns whether a probe was sent. Errors that leave the session
    /// unusable are returned; timeouts and refusals only count as failures
    /// in the manager.
    pub async fn maintain_keep_alive(
        &self,
        manager: &mut KeepAliveManager,
    ) -> SessionResult<bool> {
        if !manager.should_ping() {
            return Ok(false);
        }
        self.ensure_bound("maintain_keep_alive")?;

        manager.on_ping_sent();
        match self.enquire_link(manager.timeout()).await {
            Ok(resp) if resp.command_status.is_ok() => manager.on_ping_success(),
            Ok(resp) => {
                warn!(status = %resp.command_status, "enquire_link answered with error status");
                manager.on_ping_failure();
            }
            Err(e) if e.is_fatal() => {
                manager.on_ping_failure();
                return Err(e);
            }
            Err(e) => {
                warn!("keep-alive enquire_link failed: {}", e);
                manager.on_ping_failure();
            }
        }
        Ok(true)
    }

    async fn teardown(&mut self, cause: CloseCause) {
        self.link.close(cause).await;
        self.stop_reader();
    }

    fn stop_reader(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.link.mark_closed(CloseCause::Local);
        self.stop_reader();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state())
            .field("pending", &self.pending_requests())
            .finish()
    }
}

async fn read_loop(
    link: Arc<Link>,
    mut reader: ConnectionReader,
    handler: Arc<dyn SessionHandler>,
) {
    let cause = loop {
        let result = tokio::select! {
            result = reader.read_frame() => result,
            _ = link.shutdown.notified() => break None,
        };

        match result {
            Ok(Some(frame)) => {
                if let Some(cause) = handle_frame(&link, handler.as_ref(), frame).await {
                    break Some(cause);
                }
            }
            Ok(None) => {
                if link.state() == SessionState::Unbinding {
                    break Some(CloseCause::Local);
                }
                info!("connection closed by peer");
                break Some(CloseCause::Channel("connection closed by peer".to_string()));
            }
            Err(ConnectionError::Codec(e)) if e.is_recoverable() => {
                handle_codec_error(&link, e).await;
            }
            Err(ConnectionError::Codec(e)) => {
                error!("unrecoverable framing error: {}", e);
                break Some(CloseCause::Malformed(e));
            }
            Err(e) => {
                warn!("read failed: {}", e);
                break Some(CloseCause::Channel(e.to_string()));
            }
        }
    };

    if let Some(cause) = cause {
        link.close(cause).await;
    }
    debug!("reader task finished");
}

/// Returns a close cause when the frame ends the session
async fn handle_frame(
    link: &Link,
    handler: &dyn SessionHandler,
    frame: Frame,
) -> Option<CloseCause> {
    if frame.is_response() {
        link.pending.resolve(frame);
        return None;
    }

    debug!(
        sequence_number = frame.sequence_number(),
        command_id = ?frame.command_id(),
        "request from peer"
    );
    let response = handler::dispatch(handler, &frame);
    let unbind_acknowledged = matches!(
        (&frame, &response),
        (Frame::Unbind(_), Frame::UnbindResp(resp)) if resp.command_status.is_ok()
    );

    if let Err(e) = link.write(&response).await {
        return Some(CloseCause::Channel(e.to_string()));
    }
    if unbind_acknowledged {
        info!("session unbound by peer");
        return Some(CloseCause::Channel("session unbound by peer".to_string()));
    }
    None
}

async fn handle_codec_error(link: &Link, e: CodecError) {
    let Some(sequence_number) = e.sequence_number() else {
        return;
    };

    if e.is_response() {
        warn!(sequence_number, "undecodable response: {}", e);
        link.pending
            .fail(sequence_number, SessionError::Malformed(e));
        return;
    }

    let status = e.to_command_status();
    warn!(sequence_number, status = %status, "rejecting request: {}", e);
    let nack = Frame::GenericNack(GenericNack::new(status, sequence_number));
    if let Err(e) = link.write(&nack).await {
        debug!("could not send generic_nack: {}", e);
    }
}
