//! Session scenarios against an in-process mock SMSC

use crate::client::{
    BindType, KeepAliveConfig, KeepAliveManager, Session, SessionConfiguration,
    SessionConfigurationBuilder, SessionError, SessionHandler, SessionState,
};
use crate::codec::{CodecError, Encodable, Frame, PduDecoder};
use crate::datatypes::{
    Bind, BindResponse, CommandStatus, EnquireLink, EnquireLinkResponse, GenericNack,
    InterfaceVersion, Unbind, UnbindResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct MockSmsc {
    listener: TcpListener,
}

impl MockSmsc {
    async fn start() -> (Self, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (Self { listener }, port)
    }

    async fn accept(&self) -> MockPeer {
        let (stream, _) = self.listener.accept().await.unwrap();
        MockPeer {
            stream,
            decoder: PduDecoder::new(),
        }
    }
}

/// The SMSC side of one connection
struct MockPeer {
    stream: TcpStream,
    decoder: PduDecoder,
}

impl MockPeer {
    async fn read_or_eof(&mut self) -> Option<Frame> {
        loop {
            match self.decoder.decode_next() {
                Ok(Some(frame)) => return Some(frame),
                Ok(None) => {}
                Err(e) => panic!("mock SMSC received an undecodable frame: {e}"),
            }
            let read = self
                .stream
                .read_buf(self.decoder.buffer_mut())
                .await
                .unwrap_or(0);
            if read == 0 {
                return None;
            }
        }
    }

    async fn read(&mut self) -> Frame {
        self.read_or_eof()
            .await
            .expect("connection closed while the SMSC expected a PDU")
    }

    async fn send(&mut self, frame: Frame) {
        self.send_raw(&frame.to_bytes().unwrap()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    async fn read_bind(&mut self) -> Bind {
        match self.read().await {
            Frame::Bind(bind) => bind,
            other => panic!("expected a bind, got {other:?}"),
        }
    }

    /// Read a bind and accept it
    async fn accept_bind(&mut self) -> Bind {
        let bind = self.read_bind().await;
        let response =
            BindResponse::new(bind.bind_type, bind.sequence_number, "MockSMSC".parse().unwrap())
                .with_sc_interface_version(InterfaceVersion::SmppV50);
        self.send(Frame::BindResp(response)).await;
        bind
    }

    /// Answer enquire_link and unbind until the client hangs up.
    /// Returns the number of unbind requests seen.
    async fn serve_until_eof(&mut self) -> usize {
        let mut unbinds = 0;
        while let Some(frame) = self.read_or_eof().await {
            match frame {
                Frame::EnquireLink(req) => {
                    self.send(Frame::EnquireLinkResp(EnquireLinkResponse::new(
                        req.sequence_number,
                    )))
                    .await
                }
                Frame::Unbind(req) => {
                    unbinds += 1;
                    self.send(Frame::UnbindResp(UnbindResponse::new(req.sequence_number)))
                        .await
                }
                other => panic!("unexpected frame at the SMSC: {other:?}"),
            }
        }
        unbinds
    }
}

fn config(port: u16) -> SessionConfiguration {
    SessionConfigurationBuilder::new("127.0.0.1", port)
        .system_id("smppclient1")
        .password("password")
        .request_timeout(Duration::from_secs(2))
        .connect_timeout(Duration::from_secs(2))
        .unbind_timeout(Duration::from_millis(100))
        .build()
        .unwrap()
}

async fn wait_for_state(session: &Session, state: SessionState) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while session.state() != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {state}, stuck in {}", session.state()));
}

#[tokio::test]
async fn bind_transceiver_success() {
    init_tracing();
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        let bind = peer.accept_bind().await;
        peer.serve_until_eof().await;
        bind
    });

    let mut session = Session::new(config(port));
    assert_eq!(session.state_name(), "CLOSED");
    session.bind().await.unwrap();
    assert_eq!(session.state(), SessionState::Bound);
    assert_eq!(session.state_name(), "BOUND");

    session.unbind().await;
    let bind = server.await.unwrap();
    assert_eq!(bind.bind_type, BindType::Transceiver);
    assert_eq!(bind.system_id, "smppclient1");
    assert_eq!(bind.password, "password");
    assert_eq!(bind.interface_version, InterfaceVersion::SmppV50);
    assert_eq!(bind.sequence_number, 1);
}

#[tokio::test]
async fn bind_transmitter_and_receiver() {
    for bind_type in [BindType::Transmitter, BindType::Receiver] {
        let (smsc, port) = MockSmsc::start().await;
        let server = tokio::spawn(async move {
            let mut peer = smsc.accept().await;
            let bind = peer.accept_bind().await;
            peer.serve_until_eof().await;
            bind.bind_type
        });

        let mut config = config(port);
        config.bind_type = bind_type;
        let mut session = Session::new(config);
        session.bind().await.unwrap();
        assert_eq!(session.state(), SessionState::Bound);

        session.unbind().await;
        assert_eq!(server.await.unwrap(), bind_type);
    }
}

#[tokio::test]
async fn enquire_link_round_trip() {
    init_tracing();
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.serve_until_eof().await
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let response = session
        .enquire_link(Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(response.command_status, CommandStatus::Ok);
    assert_eq!(response.sequence_number, 2);
    assert_eq!(session.state(), SessionState::Bound);
    assert_eq!(session.pending_requests(), 0);

    session.unbind().await;
    assert_eq!(server.await.unwrap(), 1);
}

#[tokio::test]
async fn enquire_link_after_peer_stopped() {
    init_tracing();
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        // Dropping the peer closes the socket
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();
    server.await.unwrap();

    let err = session
        .enquire_link(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Channel(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.pending_requests(), 0);

    // The recorded cause is reported again
    assert!(matches!(
        session.enquire_link(Duration::from_millis(100)).await,
        Err(SessionError::Channel(_))
    ));
}

#[tokio::test]
async fn peer_stops_while_enquire_link_is_pending() {
    init_tracing();
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        // Read the enquire_link and hang up without answering
        assert!(matches!(peer.read().await, Frame::EnquireLink(_)));
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let err = session
        .enquire_link(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Channel(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.pending_requests(), 0);
    server.await.unwrap();
}

#[tokio::test]
async fn bind_rejected_closes_session() {
    init_tracing();
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        let bind = peer.read_bind().await;
        peer.send(Frame::BindResp(BindResponse::rejected(
            bind.bind_type,
            bind.sequence_number,
            CommandStatus::BindFailed,
        )))
        .await;
        // Client closes the connection after the rejection
        assert!(peer.read_or_eof().await.is_none());
    });

    let mut session = Session::new(config(port));
    let err = session.bind().await.unwrap_err();
    match err {
        SessionError::BindRejected { status } => {
            assert_eq!(status, CommandStatus::BindFailed);
            assert_eq!(status.code(), 0x0000_000D);
        }
        other => panic!("expected BindRejected, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.pending_requests(), 0);
    server.await.unwrap();
}

#[tokio::test]
async fn bind_answered_with_generic_nack() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        let bind = peer.read_bind().await;
        peer.send(Frame::GenericNack(GenericNack::invalid_command_id(
            bind.sequence_number,
        )))
        .await;
        peer
    });

    let mut session = Session::new(config(port));
    assert!(matches!(
        session.bind().await,
        Err(SessionError::BindRejected {
            status: CommandStatus::InvalidCommandId
        })
    ));
    assert_eq!(session.state(), SessionState::Closed);
    drop(server.await.unwrap());
}

#[tokio::test]
async fn bind_timeout_closes_session() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.read_bind().await;
        // Never answer, wait for the client to give up
        assert!(peer.read_or_eof().await.is_none());
    });

    let mut config = config(port);
    config.request_timeout = Duration::from_millis(100);
    let mut session = Session::new(config);

    assert!(matches!(session.bind().await, Err(SessionError::Timeout(_))));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.pending_requests(), 0);
    server.await.unwrap();
}

#[tokio::test]
async fn bind_when_bound_is_rejected() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.serve_until_eof().await
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();
    assert!(matches!(
        session.bind().await,
        Err(SessionError::AlreadyBound(SessionState::Bound))
    ));
    assert_eq!(session.state(), SessionState::Bound);

    session.unbind().await;
    server.await.unwrap();
}

#[tokio::test]
async fn unbind_twice_is_a_noop() {
    init_tracing();
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.serve_until_eof().await
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    session.unbind().await;
    assert_eq!(session.state(), SessionState::Closed);
    session.unbind().await;
    assert_eq!(session.state(), SessionState::Closed);

    // Only one unbind reached the SMSC
    assert_eq!(server.await.unwrap(), 1);
    assert!(matches!(
        session.enquire_link(Duration::from_millis(50)).await,
        Err(SessionError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn unbind_without_response_closes_after_grace_period() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        assert!(matches!(peer.read().await, Frame::Unbind(_)));
        // No unbind_resp
        assert!(peer.read_or_eof().await.is_none());
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let started = tokio::time::Instant::now();
    session.unbind().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.pending_requests(), 0);
    server.await.unwrap();
}

#[tokio::test]
async fn enquire_link_timeout_keeps_session_bound() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        // Swallow the enquire_link
        assert!(matches!(peer.read().await, Frame::EnquireLink(_)));
        peer
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let result = session.enquire_link(Duration::from_millis(50)).await;
    assert!(matches!(result, Err(SessionError::Timeout(_))));
    assert_eq!(session.state(), SessionState::Bound);
    assert_eq!(session.pending_requests(), 0);

    let peer = server.await.unwrap();
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);
    drop(peer);
}

#[tokio::test]
async fn concurrent_enquire_links_answered_out_of_order() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        let first = peer.read().await.sequence_number();
        let second = peer.read().await.sequence_number();
        assert_ne!(first, second);
        peer.send(Frame::EnquireLinkResp(EnquireLinkResponse::new(second)))
            .await;
        peer.send(Frame::EnquireLinkResp(EnquireLinkResponse::new(first)))
            .await;
        peer.serve_until_eof().await
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let (a, b) = tokio::join!(
        session.enquire_link(Duration::from_secs(1)),
        session.enquire_link(Duration::from_secs(1))
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.sequence_number, b.sequence_number);
    assert_eq!(session.pending_requests(), 0);

    session.unbind().await;
    server.await.unwrap();
}

#[tokio::test]
async fn send_request_maps_generic_nack() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        let request = peer.read().await;
        peer.send(Frame::GenericNack(GenericNack::system_error(
            request.sequence_number(),
        )))
        .await;
        peer.serve_until_eof().await
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let result = session
        .send_request(Frame::EnquireLink(EnquireLink::new(0)), Duration::from_secs(1))
        .await;
    assert!(matches!(
        result,
        Err(SessionError::GenericNack(CommandStatus::SystemError))
    ));

    // Responses cannot be sent as requests
    let result = session
        .send_request(
            Frame::EnquireLinkResp(EnquireLinkResponse::new(0)),
            Duration::from_secs(1),
        )
        .await;
    assert!(matches!(result, Err(SessionError::ProtocolViolation(_))));

    // The session is still usable
    let frame = session
        .send_request(Frame::EnquireLink(EnquireLink::new(0)), Duration::from_secs(1))
        .await
        .unwrap();
    assert!(matches!(frame, Frame::EnquireLinkResp(_)));

    session.unbind().await;
    server.await.unwrap();
}

#[tokio::test]
async fn peer_enquire_link_is_answered() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.send(Frame::EnquireLink(EnquireLink::new(77))).await;
        let response = peer.read().await;
        assert_eq!(
            response,
            Frame::EnquireLinkResp(EnquireLinkResponse::new(77))
        );
        peer
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();
    let peer = server.await.unwrap();
    assert_eq!(session.state(), SessionState::Bound);

    session.close().await;
    drop(peer);
}

struct PanickingHandler;

impl SessionHandler for PanickingHandler {
    fn on_enquire_link(&self, _request: &EnquireLink) -> Result<Frame, crate::Error> {
        panic!("handler bug");
    }
}

#[tokio::test]
async fn handler_panic_becomes_generic_nack() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.send(Frame::EnquireLink(EnquireLink::new(31))).await;
        let response = peer.read().await;
        assert_eq!(
            response,
            Frame::GenericNack(GenericNack::new(CommandStatus::SystemError, 31))
        );
        peer
    });

    let mut session = Session::with_handler(config(port), Arc::new(PanickingHandler));
    session.bind().await.unwrap();
    let peer = server.await.unwrap();

    // The reader task survived the panic
    assert_eq!(session.state(), SessionState::Bound);
    session.close().await;
    drop(peer);
}

#[tokio::test]
async fn unknown_command_gets_generic_nack() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;

        let mut submit_sm = Vec::new();
        submit_sm.extend_from_slice(&20u32.to_be_bytes());
        submit_sm.extend_from_slice(&0x0000_0004u32.to_be_bytes());
        submit_sm.extend_from_slice(&0u32.to_be_bytes());
        submit_sm.extend_from_slice(&55u32.to_be_bytes());
        submit_sm.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        peer.send_raw(&submit_sm).await;

        assert_eq!(
            peer.read().await,
            Frame::GenericNack(GenericNack::invalid_command_id(55))
        );

        // The stream is still aligned
        peer.send(Frame::EnquireLink(EnquireLink::new(56))).await;
        assert_eq!(
            peer.read().await,
            Frame::EnquireLinkResp(EnquireLinkResponse::new(56))
        );
        peer
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();
    let peer = server.await.unwrap();
    assert_eq!(session.state(), SessionState::Bound);

    session.close().await;
    drop(peer);
}

#[tokio::test]
async fn peer_unbind_closes_session() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.send(Frame::Unbind(Unbind::new(9))).await;
        assert_eq!(
            peer.read().await,
            Frame::UnbindResp(UnbindResponse::new(9))
        );
        assert!(peer.read_or_eof().await.is_none());
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();
    server.await.unwrap();

    wait_for_state(&session, SessionState::Closed).await;
    assert!(matches!(
        session.enquire_link(Duration::from_millis(50)).await,
        Err(SessionError::Channel(_))
    ));
}

#[tokio::test]
async fn malformed_response_fails_only_its_request() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        let seq = peer.read().await.sequence_number();

        // enquire_link_resp with a stray body byte
        let mut raw = Vec::new();
        raw.extend_from_slice(&17u32.to_be_bytes());
        raw.extend_from_slice(&0x8000_0015u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&seq.to_be_bytes());
        raw.push(0xFF);
        peer.send_raw(&raw).await;

        peer.serve_until_eof().await
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let err = session
        .enquire_link(Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Malformed(CodecError::MalformedBody { .. })
    ));
    assert_eq!(session.state(), SessionState::Bound);
    assert_eq!(session.pending_requests(), 0);

    session.enquire_link(Duration::from_secs(1)).await.unwrap();
    session.unbind().await;
    server.await.unwrap();
}

#[tokio::test]
async fn framing_error_closes_session() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.read().await;
        // command_length smaller than the header
        peer.send_raw(&[
            0x00, 0x00, 0x00, 0x08, 0x80, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x02,
        ])
        .await;
        peer
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();

    let err = session
        .enquire_link(Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Malformed(CodecError::InvalidPduLength { length: 8, .. })
    ));
    assert_eq!(session.state(), SessionState::Closed);
    drop(server.await.unwrap());
}

#[tokio::test]
async fn session_cannot_be_bound_twice() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.serve_until_eof().await;
        smsc
    });

    let mut session = Session::new(config(port));
    session.bind().await.unwrap();
    session.unbind().await;
    assert_eq!(session.state(), SessionState::Closed);
    let smsc = server.await.unwrap();

    // No second connection is attempted
    assert!(matches!(
        session.bind().await,
        Err(SessionError::ConnectionClosed)
    ));
    assert_eq!(session.state(), SessionState::Closed);
    let accepted = tokio::time::timeout(Duration::from_millis(50), smsc.accept()).await;
    assert!(accepted.is_err());

    // A fresh session binds again
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        let bind = peer.accept_bind().await;
        peer.serve_until_eof().await;
        bind.sequence_number
    });
    let mut session = Session::new(config(port));
    session.bind().await.unwrap();
    session.unbind().await;
    assert_eq!(server.await.unwrap(), 1);
}

#[tokio::test]
async fn session_cannot_be_bound_after_rejection() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        let bind = peer.read_bind().await;
        peer.send(Frame::BindResp(BindResponse::rejected(
            bind.bind_type,
            bind.sequence_number,
            CommandStatus::InvalidPassword,
        )))
        .await;
        assert!(peer.read_or_eof().await.is_none());
    });

    let mut session = Session::new(config(port));
    assert!(matches!(
        session.bind().await,
        Err(SessionError::BindRejected { .. })
    ));
    server.await.unwrap();
    assert!(matches!(
        session.bind().await,
        Err(SessionError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn unbounded_timeouts_do_not_overflow() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.serve_until_eof().await
    });

    let config = SessionConfigurationBuilder::new("127.0.0.1", port)
        .system_id("smppclient1")
        .password("password")
        .request_timeout(Duration::MAX)
        .build()
        .unwrap();
    let mut session = Session::new(config);
    session.bind().await.unwrap();

    let response = session.enquire_link(Duration::MAX).await.unwrap();
    assert_eq!(response.command_status, CommandStatus::Ok);
    assert_eq!(session.pending_requests(), 0);

    session.unbind().await;
    server.await.unwrap();
}

#[tokio::test]
async fn keep_alive_probes_when_due() {
    let (smsc, port) = MockSmsc::start().await;
    let server = tokio::spawn(async move {
        let mut peer = smsc.accept().await;
        peer.accept_bind().await;
        peer.serve_until_eof().await
    });

    let mut session = Session::new(config(port));
    let mut manager = KeepAliveManager::new(
        KeepAliveConfig::new(Duration::from_secs(3600)).with_timeout(Duration::from_secs(1)),
    );

    // Not bound yet
    assert!(session.maintain_keep_alive(&mut manager).await.is_err());
    assert_eq!(manager.status().total_pings, 0);

    session.bind().await.unwrap();
    assert!(session.maintain_keep_alive(&mut manager).await.unwrap());
    assert!(!session.maintain_keep_alive(&mut manager).await.unwrap());

    let status = manager.status();
    assert_eq!(status.total_pings, 1);
    assert_eq!(status.total_pongs, 1);
    assert_eq!(status.consecutive_failures, 0);

    session.unbind().await;
    server.await.unwrap();
}

#[tokio::test]
async fn connect_timeout_is_reported() {
    // 10.255.255.1 is unroutable in most environments; fall back to a refused
    // connection if the network answers immediately
    let mut config = config(2775);
    config.host = "10.255.255.1".to_string();
    config.connect_timeout = Duration::from_millis(50);

    let mut session = Session::new(config);
    let err = session.bind().await.unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn bind_frame_matches_configuration() {
    let bytes = Frame::Bind(config(2775).bind_pdu(1)).to_bytes().unwrap();
    // bind_transceiver
    assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x09]);
    assert_eq!(&bytes[16..28], b"smppclient1\0");
}
