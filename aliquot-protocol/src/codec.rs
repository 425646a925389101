//! Postcard wire codec for command requests
//!
//! Message format:
//! - VERSION (1 byte): codec version, currently [`WIRE_VERSION`]
//! - BODY: postcard-encoded [`CommandRequest`]
//!
//! The codec is transport-agnostic; framing and integrity checks belong to
//! the transport carrying these bytes.

use alloc::vec::Vec;

use crate::commands::CommandRequest;

/// Current codec version
pub const WIRE_VERSION: u8 = 1;

/// Errors that can occur while encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Message is empty
    #[error("empty message")]
    Empty,
    /// Message was written by an incompatible codec
    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),
    /// Body could not be encoded
    #[error("failed to encode command request")]
    Encode,
    /// Body could not be decoded
    #[error("failed to decode command request")]
    Decode,
}

/// Encode a request into a versioned byte message
pub fn encode_request(request: &CommandRequest) -> Result<Vec<u8>, CodecError> {
    let body = postcard::to_allocvec(request).map_err(|_| CodecError::Encode)?;
    let mut message = Vec::with_capacity(body.len() + 1);
    message.push(WIRE_VERSION);
    message.extend_from_slice(&body);
    Ok(message)
}

/// Decode a versioned byte message into a request
pub fn decode_request(message: &[u8]) -> Result<CommandRequest, CodecError> {
    let (&version, body) = message.split_first().ok_or(CodecError::Empty)?;
    if version != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    postcard::from_bytes(body).map_err(|_| CodecError::Decode)
}
