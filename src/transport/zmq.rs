//! ZeroMQ SUB socket transport.
//!
//! Built on the pure-Rust `zeromq` crate, so no system libzmq is needed and
//! receives are plain tokio futures that can be raced and timed out.
//!
//! `zeromq` keeps retrying a refused TCP connect internally, so every
//! connect is bounded by [`ZmqConnector::connect_timeout`]. Its SUB socket
//! also reports no event when a publisher goes away; the listener's idle
//! timeout is what notices a dead feed.
//!
//! # Example
//!
//! ```ignore
//! use txradar_listener::transport::{Connector, SubscriptionChannel, ZmqConnector};
//!
//! let mut channel = ZmqConnector::new().connect("tcp://127.0.0.1:7678").await?;
//! channel.subscribe(b"").await?;
//! let frame = channel.receive_frame(None).await?;
//! ```

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use zeromq::{Socket, SocketRecv, SubSocket};

use super::{Connector, SubscriptionChannel};
use crate::error::{ChannelError, ConnectError};
use crate::protocol::RawFrame;

/// Endpoint schemes a SUB socket can connect over.
const SUPPORTED_SCHEMES: &[&str] = &["tcp", "ipc"];

/// Check that `endpoint` has the form `tcp://host:port` or `ipc://path`.
///
/// Catches configuration mistakes before the first connection attempt, so
/// they are reported once instead of retried forever.
pub fn validate_endpoint(endpoint: &str) -> Result<(), ConnectError> {
    let invalid = |reason: String| ConnectError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let (scheme, address) = endpoint
        .split_once("://")
        .ok_or_else(|| invalid("expected <scheme>://<address>".into()))?;
    if !SUPPORTED_SCHEMES.contains(&scheme) {
        return Err(invalid(format!("unsupported scheme {scheme:?}")));
    }
    if address.is_empty() {
        return Err(invalid("empty address".into()));
    }

    if scheme == "tcp" {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| invalid("tcp endpoint needs host:port".into()))?;
        if host.is_empty() {
            return Err(invalid("empty host".into()));
        }
        match port.parse::<u16>() {
            Ok(port) if port > 0 => {}
            _ => return Err(invalid(format!("invalid port {port:?}"))),
        }
    }

    Ok(())
}

/// Default bound on a single connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens [`ZmqChannel`]s.
#[derive(Debug, Clone, Copy)]
pub struct ZmqConnector {
    connect_timeout: Duration,
}

impl ZmqConnector {
    /// Create a connector with [`DEFAULT_CONNECT_TIMEOUT`].
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a connector that gives up on an unreachable publisher after
    /// `timeout`.
    pub fn with_connect_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
        }
    }

    /// Bound on a single connection attempt.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for ZmqConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for ZmqConnector {
    type Channel = ZmqChannel;

    async fn connect(&mut self, endpoint: &str) -> Result<ZmqChannel, ConnectError> {
        validate_endpoint(endpoint)?;

        let transport_error = |reason: String| ConnectError::Transport {
            endpoint: endpoint.to_string(),
            reason,
        };

        let mut socket = SubSocket::new();
        tokio::time::timeout(self.connect_timeout, socket.connect(endpoint))
            .await
            .map_err(|_| {
                transport_error(format!(
                    "no publisher reachable within {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| transport_error(e.to_string()))?;

        debug!(endpoint, "sub socket connected");
        Ok(ZmqChannel {
            socket: Some(socket),
            subscriptions: HashSet::new(),
            endpoint: endpoint.to_string(),
        })
    }
}

/// A connected ZeroMQ SUB socket.
pub struct ZmqChannel {
    /// `None` once closed.
    socket: Option<SubSocket>,
    /// Prefixes already registered with the socket.
    subscriptions: HashSet<Vec<u8>>,
    endpoint: String,
}

impl ZmqChannel {
    /// Endpoint this channel was connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether [`close`](SubscriptionChannel::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

impl SubscriptionChannel for ZmqChannel {
    async fn subscribe(&mut self, topic_prefix: &[u8]) -> Result<(), ChannelError> {
        let socket = self.socket.as_mut().ok_or(ChannelError::Closed)?;
        if self.subscriptions.contains(topic_prefix) {
            return Ok(());
        }

        // The zeromq subscription API takes text prefixes.
        let topic = std::str::from_utf8(topic_prefix).map_err(ChannelError::transport)?;
        socket.subscribe(topic).await.map_err(ChannelError::transport)?;
        self.subscriptions.insert(topic_prefix.to_vec());

        debug!(endpoint = %self.endpoint, topic, "subscribed");
        Ok(())
    }

    async fn receive_frame(&mut self, deadline: Option<Instant>) -> Result<RawFrame, ChannelError> {
        let socket = self.socket.as_mut().ok_or(ChannelError::Closed)?;

        let received = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, socket.recv())
                .await
                .map_err(|_| ChannelError::Timeout)?,
            None => socket.recv().await,
        };
        let message = received.map_err(ChannelError::transport)?;

        RawFrame::from_parts(message.into_vec())
    }

    async fn close(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        self.subscriptions.clear();

        for err in socket.close().await {
            warn!(endpoint = %self.endpoint, error = %err, "error while closing sub socket");
        }
        debug!(endpoint = %self.endpoint, "sub socket closed");
    }
}
