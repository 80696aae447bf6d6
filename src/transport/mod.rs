//! Transport module - publish/subscribe channel abstraction.
//!
//! Provides:
//! - [`Connector`]: opens subscription channels to an endpoint
//! - [`SubscriptionChannel`]: one open subscription
//! - [`ZmqConnector`] / [`ZmqChannel`]: ZeroMQ SUB socket implementation
//!
//! The listener only talks to these traits, so it can be driven by any
//! transport that delivers two-part messages.

mod zmq;

use std::future::Future;

use tokio::time::Instant;

use crate::error::{ChannelError, ConnectError};
use crate::protocol::RawFrame;

pub use zmq::{validate_endpoint, ZmqChannel, ZmqConnector, DEFAULT_CONNECT_TIMEOUT};

/// Opens subscription channels.
pub trait Connector: Send {
    /// Channel type produced by this connector.
    type Channel: SubscriptionChannel;

    /// Set up a connection to `endpoint`.
    ///
    /// Must resolve in bounded time: a publisher that cannot be reached is
    /// reported as a retryable error, never waited for indefinitely.
    fn connect(
        &mut self,
        endpoint: &str,
    ) -> impl Future<Output = Result<Self::Channel, ConnectError>> + Send;
}

/// One open publish/subscribe connection.
pub trait SubscriptionChannel: Send {
    /// Register interest in topics starting with `topic_prefix`.
    ///
    /// An empty prefix subscribes to everything. Subscribing twice to the
    /// same prefix has no further effect.
    fn subscribe(
        &mut self,
        topic_prefix: &[u8],
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Wait for the next complete message.
    ///
    /// Returns [`ChannelError::Timeout`] once `deadline` passes and
    /// [`ChannelError::UnexpectedPartCount`] for messages that are not
    /// two-part. Dropping the future before it resolves loses no message.
    fn receive_frame(
        &mut self,
        deadline: Option<Instant>,
    ) -> impl Future<Output = Result<RawFrame, ChannelError>> + Send;

    /// Release the connection. Safe to call more than once; afterwards
    /// every call fails with [`ChannelError::Closed`].
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
