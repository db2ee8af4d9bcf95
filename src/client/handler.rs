// ABOUTME: Callbacks for requests the SMSC initiates on a bound session
// ABOUTME: Dispatch contains handler errors and panics and always yields a well-formed response

use crate::codec::Frame;
use crate::datatypes::{EnquireLink, EnquireLinkResponse, GenericNack, Unbind, UnbindResponse};
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

/// Answers peer-initiated requests.
///
/// Runs on the session's reader task, so implementations should return
/// quickly. Each method must produce the response PDU for `request`, echoing
/// its sequence number; a generic_nack is also acceptable.
pub trait SessionHandler: Send + Sync {
    fn on_enquire_link(&self, request: &EnquireLink) -> Result<Frame, crate::Error> {
        Ok(Frame::EnquireLinkResp(EnquireLinkResponse::new(
            request.sequence_number,
        )))
    }

    /// After a successful unbind_resp is sent the session closes.
    fn on_unbind(&self, request: &Unbind) -> Result<Frame, crate::Error> {
        Ok(Frame::UnbindResp(UnbindResponse::new(request.sequence_number)))
    }

    /// Any other request, e.g. a bind sent by the peer
    fn on_unexpected_request(&self, request: &Frame) -> Result<Frame, crate::Error> {
        Ok(Frame::GenericNack(GenericNack::invalid_command_id(
            request.sequence_number(),
        )))
    }
}

/// Uses the default response for every request
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSessionHandler;

impl SessionHandler for DefaultSessionHandler {}

/// Run the handler for `request` and return the frame to send back.
pub(crate) fn dispatch(handler: &dyn SessionHandler, request: &Frame) -> Frame {
    let sequence_number = request.sequence_number();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match request {
        Frame::EnquireLink(pdu) => handler.on_enquire_link(pdu),
        Frame::Unbind(pdu) => handler.on_unbind(pdu),
        other => handler.on_unexpected_request(other),
    }));

    match outcome {
        Ok(Ok(response)) if answers(request, &response) => response,
        Ok(Ok(response)) => {
            warn!(
                sequence_number,
                request = ?request.command_id(),
                response = ?response.command_id(),
                response_sequence_number = response.sequence_number(),
                "handler returned a response that does not answer the request"
            );
            Frame::GenericNack(GenericNack::system_error(sequence_number))
        }
        Ok(Err(e)) => {
            warn!(
                sequence_number,
                request = ?request.command_id(),
                "handler failed: {}", e
            );
            Frame::GenericNack(GenericNack::system_error(sequence_number))
        }
        Err(_) => {
            error!(
                sequence_number,
                request = ?request.command_id(),
                "handler panicked"
            );
            Frame::GenericNack(GenericNack::system_error(sequence_number))
        }
    }
}

fn answers(request: &Frame, response: &Frame) -> bool {
    if response.sequence_number() != request.sequence_number() {
        return false;
    }
    matches!(response, Frame::GenericNack(_))
        || request.command_id().response_id() == Some(response.command_id())
}
