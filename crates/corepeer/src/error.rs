//! # Error Codes and `PeerError`
//!
//! The uniform error currency the library uses on every failure route: local
//! rejection of a pending `request`, a wire-level `ErrorResponse`, and the
//! caller-facing `Result` from construction-time preconditions.

/// Wire error codes, per the protocol's error-code table. These are the
/// exact `i32` values carried in an `ErrorResponse` body.
pub mod codes {
    pub const PARSE_ERROR: i32 = 1000;
    pub const INVALID_REQUEST: i32 = 1001;
    pub const METHOD_NOT_FOUND: i32 = 1002;
    pub const INTERNAL_ERROR: i32 = 1004;
    pub const REQUEST_TIMEOUT: i32 = 1005;
    pub const GUARD_ERROR: i32 = 1006;
    pub const APPLICATION_ERROR: i32 = 1007;
}

/// A single uniform error type carrying everything a caller or a log line
/// needs: the wire code, a short message, the correlation id the failure is
/// attached to (`-1` if none), and an optional longer detail string.
#[derive(Debug, Clone)]
pub struct PeerError {
    pub code: i32,
    pub message: String,
    pub correlation_id: i64,
    pub detail: Option<String>,
}

impl PeerError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            correlation_id: -1,
            detail: None,
        }
    }

    pub fn with_correlation_id(mut self, id: u32) -> Self {
        self.correlation_id = id as i64;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    pub fn method_not_found() -> Self {
        Self::new(codes::METHOD_NOT_FOUND, "Method not found")
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, reason)
    }

    pub fn request_timeout() -> Self {
        Self::new(codes::REQUEST_TIMEOUT, "Request timed out")
    }

    pub fn guard_error(message: impl Into<String>) -> Self {
        Self::new(codes::GUARD_ERROR, message)
    }

    pub fn application_error(message: impl Into<String>) -> Self {
        Self::new(codes::APPLICATION_ERROR, message)
    }
}

impl std::fmt::Display for PeerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if self.correlation_id >= 0 {
            write!(f, " (id={})", self.correlation_id)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PeerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_correlation_id_is_absent() {
        let err = PeerError::method_not_found();
        assert_eq!(err.correlation_id, -1);
    }

    #[test]
    fn with_correlation_id_stores_unsigned_value_as_i64() {
        let err = PeerError::request_timeout().with_correlation_id(42);
        assert_eq!(err.correlation_id, 42);
    }

    #[test]
    fn display_includes_code_and_id_when_present() {
        let err = PeerError::guard_error("nope").with_correlation_id(7);
        let rendered = err.to_string();
        assert!(rendered.contains("1006"));
        assert!(rendered.contains("nope"));
        assert!(rendered.contains('7'));
    }
}
