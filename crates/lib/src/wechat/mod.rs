//! WeChat official-account protocol: handshake signature and the plain-text XML envelope.

mod message;
mod signature;

pub use message::{InboundMessage, MessageError, MsgType, OutboundReply};
pub use signature::{
    compute_signature, verify_signature, VerificationQuery, VerificationRequest, VerifyError,
};
