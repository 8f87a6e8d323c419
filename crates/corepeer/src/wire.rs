//! # Wire Traits
//!
//! The seam between this crate's envelope/dispatch machinery and an external
//! serialization toolkit. Request and response bodies are opaque byte blobs
//! to the core; `WireEncode`/`WireDecode` are the narrow interface a schema's
//! generated types implement so the core can produce and consume them
//! without knowing their concrete shape.

/// Failure decoding a body into a concrete type. Carries a short message
/// only; the core wraps it with the correlation id and code that apply to
/// the call site (`INVALID_REQUEST` inbound, or the caller-facing error for
/// a malformed response).
#[derive(Debug, Clone)]
pub struct DecodeError(pub String);

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DecodeError {}

impl From<&str> for DecodeError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DecodeError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A handler's application-level failure. Handlers that fail (sync or via a
/// rejected future) produce one of these; the dispatcher maps it to
/// `APPLICATION_ERROR` on the wire.
#[derive(Debug, Clone)]
pub struct HandlerError(pub String);

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HandlerError {}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Implemented by request/response body types to serialize themselves into
/// the peer's reusable builder buffer.
///
/// The external serialization toolkit a caller pairs with this crate emits
/// one `impl` of this trait per generated message type; the core never
/// constructs one itself.
pub trait WireEncode {
    /// Appends this value's encoded form to `buf`. Implementations should
    /// not assume `buf` is empty; the core clears its reusable builder
    /// before each call.
    fn encode_into(&self, buf: &mut Vec<u8>);
}

/// Implemented by request/response body types to construct themselves from
/// a decoded body view.
pub trait WireDecode: Sized {
    /// Parses `bytes` (the envelope's body slice) into a concrete value.
    fn decode_from(bytes: &[u8]) -> Result<Self, DecodeError>;
}

// `()` is the void body: zero bytes in, zero bytes out. This lets a
// void-response method's handler be written as returning `()` without a
// special case in the dispatcher.
impl WireEncode for () {
    fn encode_into(&self, _buf: &mut Vec<u8>) {}
}

impl WireDecode for () {
    fn decode_from(_bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(())
    }
}
