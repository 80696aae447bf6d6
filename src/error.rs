//! Error types for txradar-listener.
//!
//! Errors are split by layer so the listener can apply a different policy to
//! each one:
//!
//! - [`DecodeError`]: malformed message content, dropped and counted
//! - [`ChannelError`]: transport trouble on an open subscription
//! - [`ConnectError`]: failure to establish a subscription
//! - [`FatalError`]: the only errors [`Listener::run`](crate::Listener::run) returns

use std::time::Duration;

use thiserror::Error;

/// A message whose content cannot be turned into an announcement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A fixed-width field had the wrong number of bytes.
    #[error("{field} must be {expected} bytes, got {actual}")]
    WrongLength {
        /// Name of the offending field.
        field: &'static str,
        /// Required length in bytes.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },

    /// The transaction hash part was empty.
    #[error("transaction hash is empty")]
    EmptyHash,
}

/// Errors raised by an open [`SubscriptionChannel`](crate::transport::SubscriptionChannel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The transport delivered a message with the wrong number of parts.
    #[error("expected {expected}-part message, got {actual} parts")]
    UnexpectedPartCount {
        /// Parts required by the feed.
        expected: usize,
        /// Parts actually received.
        actual: usize,
    },

    /// The receive deadline elapsed before a message arrived.
    #[error("receive deadline elapsed")]
    Timeout,

    /// No message arrived within the configured idle window.
    #[error("no message received for {0:?}")]
    Stale(Duration),

    /// The channel was closed.
    #[error("channel closed")]
    Closed,

    /// Error reported by the underlying transport.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChannelError {
    /// Create a transport error from anything printable.
    #[allow(clippy::needless_pass_by_value)]
    pub fn transport<T: ToString>(err: T) -> Self {
        Self::Transport(err.to_string())
    }

    /// Whether the message was malformed rather than the connection lost.
    ///
    /// Malformed messages are dropped; everything else except
    /// [`ChannelError::Timeout`] ends the current subscription.
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, Self::UnexpectedPartCount { .. })
    }
}

/// Failure to establish a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The endpoint string can never be connected to.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transport refused or failed the connection attempt.
    #[error("failed to connect to {endpoint}: {reason}")]
    Transport {
        /// Endpoint the attempt targeted.
        endpoint: String,
        /// Transport error message.
        reason: String,
    },

    /// The connection came up but registering the subscription failed.
    #[error("failed to subscribe: {0}")]
    Subscribe(#[from] ChannelError),
}

impl ConnectError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidEndpoint { .. })
    }
}

/// Conditions that end [`Listener::run`](crate::Listener::run) with an error.
#[derive(Debug, Error)]
pub enum FatalError {
    /// The configured retry budget ran out.
    #[error("gave up after {attempts} failed connection attempts: {last_error}")]
    ReconnectExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
        /// Error from the final attempt.
        last_error: ConnectError,
    },

    /// The endpoint is not connectable, retrying would not help.
    #[error(transparent)]
    InvalidEndpoint(ConnectError),

    /// The announcement consumer went away.
    #[error("announcement sink closed")]
    SinkClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_messages() {
        let err = DecodeError::WrongLength {
            field: "node_id",
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "node_id must be 4 bytes, got 3");
        assert_eq!(DecodeError::EmptyHash.to_string(), "transaction hash is empty");
    }

    #[test]
    fn test_malformed_message_classification() {
        let part_count = ChannelError::UnexpectedPartCount {
            expected: 2,
            actual: 3,
        };
        assert!(part_count.is_malformed_message());
        assert!(!ChannelError::Closed.is_malformed_message());
        assert!(!ChannelError::Timeout.is_malformed_message());
        assert!(!ChannelError::transport("reset").is_malformed_message());
    }

    #[test]
    fn test_connect_error_retryable() {
        let invalid = ConnectError::InvalidEndpoint {
            endpoint: "nope".into(),
            reason: "missing scheme".into(),
        };
        assert!(!invalid.is_retryable());

        let refused = ConnectError::Transport {
            endpoint: "tcp://127.0.0.1:7678".into(),
            reason: "connection refused".into(),
        };
        assert!(refused.is_retryable());

        let subscribe: ConnectError = ChannelError::Closed.into();
        assert!(subscribe.is_retryable());
    }

    #[test]
    fn test_fatal_error_display() {
        let err = FatalError::ReconnectExhausted {
            attempts: 3,
            last_error: ConnectError::Transport {
                endpoint: "tcp://localhost:7678".into(),
                reason: "connection refused".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "gave up after 3 failed connection attempts: \
             failed to connect to tcp://localhost:7678: connection refused"
        );
    }
}
