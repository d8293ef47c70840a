//! Opaque message payloads and close descriptors.
//!
//! The client never interprets payloads: whatever the caller hands to
//! [`Client::send`](crate::client::Client::send) reaches the transport
//! unchanged, and inbound data is republished as received.

use std::fmt;

use bytes::Bytes;

/// Close code reported when the client itself ends the connection.
pub const NORMAL_CLOSURE: u16 = 1000;

/// A message travelling over the connection.
///
/// # Examples
///
/// ```
/// use tether::Payload;
///
/// let text = Payload::from("hello");
/// assert_eq!(text.as_text(), Some("hello"));
/// assert_eq!(text.len(), 5);
///
/// let binary = Payload::from(vec![1_u8, 2, 3]);
/// assert_eq!(binary.as_bytes(), &[1, 2, 3]);
/// assert!(binary.as_text().is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(Bytes),
}

impl Payload {
    /// Length of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.as_bytes().len() }

    /// Whether the payload carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Borrow the payload as raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Borrow the payload as text if it was sent as text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Convert the payload into bytes, discarding the text/binary distinction.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Binary(bytes) => bytes,
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self { Self::Text(value.to_owned()) }
}

impl From<String> for Payload {
    fn from(value: String) -> Self { Self::Text(value) }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self { Self::Binary(Bytes::from(value)) }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self { Self::Binary(Bytes::copy_from_slice(value)) }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self { Self::Binary(value) }
}

/// Why a transport closed.
///
/// `code` is present when the peer supplied one (for example a WebSocket
/// close frame) or when the client closed the link itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReason {
    /// Protocol close code, if known.
    pub code: Option<u16>,
    /// Human-readable description.
    pub reason: String,
}

impl CloseReason {
    /// Build a close reason from its parts.
    ///
    /// # Examples
    ///
    /// ```
    /// use tether::CloseReason;
    ///
    /// let reason = CloseReason::new(Some(4000), "going away");
    /// assert_eq!(reason.to_string(), "going away (code 4000)");
    /// ```
    #[must_use]
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// The reason reported when [`Client::close`](crate::client::Client::close)
    /// ends an open connection.
    #[must_use]
    pub fn by_client() -> Self { Self::new(Some(NORMAL_CLOSURE), "closed by client") }

    /// Describe a transport failure that ended the link.
    #[must_use]
    pub fn from_error(error: &impl fmt::Display) -> Self { Self::new(None, error.to_string()) }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Payload::from("abc"), 3)]
    #[case(Payload::from(String::new()), 0)]
    #[case(Payload::from(vec![0_u8; 16]), 16)]
    #[case(Payload::from(Bytes::from_static(b"xy")), 2)]
    fn payload_length_counts_bytes(#[case] payload: Payload, #[case] expected: usize) {
        assert_eq!(payload.len(), expected);
        assert_eq!(payload.is_empty(), expected == 0);
    }

    #[test]
    fn text_payload_converts_to_utf8_bytes() {
        let bytes = Payload::from("héllo").into_bytes();
        assert_eq!(&bytes[..], "héllo".as_bytes());
    }

    #[test]
    fn close_reason_without_code_displays_reason_only() {
        let reason = CloseReason::new(None, "connection reset");
        assert_eq!(reason.to_string(), "connection reset");
    }

    #[test]
    fn client_close_uses_normal_closure_code() {
        assert_eq!(CloseReason::by_client().code, Some(NORMAL_CLOSURE));
    }
}
