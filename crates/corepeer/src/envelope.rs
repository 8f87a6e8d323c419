//! # Envelope Codec
//!
//! The 12-byte fixed header that precedes every frame on the wire, plus the
//! error-body layout carried inside Error Response frames.
//!
//! ## Wire format
//!
//! ```text
//! byte 0:      message type
//! byte 1:      reserved, zero on write, ignored on read
//! bytes 2-3:   method id (u16, LE)
//! bytes 4-7:   correlation id (u32, LE, wraps)
//! bytes 8-11:  body length (u32, LE)
//! bytes 12..:  body
//! ```
//!
//! All multi-byte header fields are little-endian regardless of host byte
//! order. The error code inside an error body is the one signed field;
//! everything else is unsigned.

#[cfg(test)]
mod tests;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 12;

/// Correlation id used for frames emitted before an id can be trusted (i.e.
/// envelope decode failures). All bits set, matching the protocol's generic
/// id convention for id-less error frames.
pub const ID_ALL_ONES: u32 = u32::MAX;

/// One of the four frame kinds that can appear on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request = 0,
    Notification = 1,
    Response = 2,
    ErrorResponse = 3,
}

impl MessageType {
    fn from_byte(byte: u8) -> Result<Self, ParseError> {
        match byte {
            0 => Ok(Self::Request),
            1 => Ok(Self::Notification),
            2 => Ok(Self::Response),
            3 => Ok(Self::ErrorResponse),
            other => Err(ParseError::InvalidMessageType(other)),
        }
    }
}

/// Failures from [`decode`] or [`decode_error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than [`HEADER_LEN`] bytes were supplied.
    TooShort,
    /// The header's body length claims more bytes than were supplied.
    Incomplete,
    /// Byte 0 did not correspond to a known [`MessageType`].
    InvalidMessageType(u8),
    /// An error body's message bytes were not valid UTF-8.
    InvalidUtf8,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort => write!(f, "Message too short"),
            Self::Incomplete => write!(f, "Incomplete message"),
            Self::InvalidMessageType(b) => write!(f, "Invalid message type byte: {b}"),
            Self::InvalidUtf8 => write!(f, "Error message is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A decoded frame: the header fields plus a zero-copy view over the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub kind: MessageType,
    pub id: u32,
    pub method: u16,
    pub body: &'a [u8],
}

/// Encodes a complete frame: 12-byte header followed by `body`.
///
/// `body` is copied once into the returned buffer; there is no trailing
/// padding, so `body_len` in the header is always `body.len()` exactly.
pub fn encode(kind: MessageType, id: u32, method: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.push(kind as u8);
    out.push(0); // reserved
    out.extend_from_slice(&method.to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// Encodes an Error Response frame. Method is always 0 per the wire
/// contract; receivers must correlate by id alone.
pub fn encode_error(id: u32, code: i32, message: &str) -> Vec<u8> {
    let msg_bytes = message.as_bytes();
    let mut body = Vec::with_capacity(4 + msg_bytes.len());
    body.extend_from_slice(&code.to_le_bytes());
    body.extend_from_slice(msg_bytes);
    encode(MessageType::ErrorResponse, id, 0, &body)
}

/// Decodes a frame header and returns a borrowed view over its body.
///
/// `bytes` must contain exactly one complete frame; this library does not
/// frame streaming transports.
pub fn decode(bytes: &[u8]) -> Result<Envelope<'_>, ParseError> {
    if bytes.len() < HEADER_LEN {
        return Err(ParseError::TooShort);
    }

    let kind = MessageType::from_byte(bytes[0])?;
    let method = u16::from_le_bytes([bytes[2], bytes[3]]);
    let id = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let body_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;

    if bytes.len() < HEADER_LEN + body_len {
        return Err(ParseError::Incomplete);
    }

    Ok(Envelope {
        kind,
        id,
        method,
        body: &bytes[HEADER_LEN..HEADER_LEN + body_len],
    })
}

/// Decodes an error body into `(code, message)`.
///
/// `body` must be at least 4 bytes (the signed error code); the remainder is
/// the UTF-8 message with no length prefix.
pub fn decode_error(body: &[u8]) -> Result<(i32, &str), ParseError> {
    if body.len() < 4 {
        return Err(ParseError::TooShort);
    }
    let code = i32::from_le_bytes([body[0], body[1], body[2], body[3]]);
    let message = std::str::from_utf8(&body[4..]).map_err(|_| ParseError::InvalidUtf8)?;
    Ok((code, message))
}
