//! Listener builder and receive loop.
//!
//! The [`ListenerBuilder`] provides a fluent API for configuring the
//! subscription. The [`Listener`] drives the lifecycle:
//! 1. Connect and subscribe (retrying with backoff)
//! 2. Receive frames and decode them
//! 3. Deliver announcements to the sink, in order, one at a time
//! 4. On connection loss, close the channel and go back to 1
//!
//! Malformed messages are dropped and counted; they never end the loop.
//! `run` only returns on cancellation or a [`FatalError`].
//!
//! # Example
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use txradar_listener::{sink_fn, Listener};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut listener = Listener::builder()
//!         .endpoint("tcp://127.0.0.1:7678")
//!         .max_retries(10)
//!         .build();
//!
//!     let cancel = CancellationToken::new();
//!     listener.run(sink_fn(|ann| println!("{ann}")), cancel).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::error::{ChannelError, ConnectError, FatalError};
use crate::protocol::{FrameDecoder, NOTIFY_PORT};
use crate::sink::AnnouncementSink;
use crate::stats::{ListenerState, ListenerStats};
use crate::transport::{Connector, SubscriptionChannel, ZmqConnector};

/// Default receive deadline; bounds cancellation latency.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default silence after which the subscription is considered dead.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default endpoint: the radar's notify port on this host.
pub fn default_endpoint() -> String {
    format!("tcp://127.0.0.1:{NOTIFY_PORT}")
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Publisher endpoint, e.g. `tcp://host:port`.
    pub endpoint: String,
    /// Topic prefix to subscribe to; empty means all topics.
    pub topic: Vec<u8>,
    /// Deadline applied to every receive.
    pub receive_timeout: Duration,
    /// Reconnect when no frame arrives for this long. `None` waits forever.
    ///
    /// A ZeroMQ subscriber gets no signal when its publisher disappears, so
    /// this is the only way a dead feed is noticed.
    pub idle_timeout: Option<Duration>,
    /// Retries after a failed connection attempt before giving up, so at
    /// most `max_retries + 1` consecutive attempts fail. `None` retries
    /// forever.
    pub max_retries: Option<u32>,
    /// Reconnect delay schedule.
    pub backoff: BackoffConfig,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            topic: Vec::new(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_retries: None,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Builder for configuring and creating a [`Listener`].
pub struct ListenerBuilder<C = ZmqConnector> {
    connector: C,
    config: ListenerConfig,
    stats: Option<Arc<ListenerStats>>,
}

impl ListenerBuilder<ZmqConnector> {
    /// Create a builder using the ZeroMQ transport.
    pub fn new() -> Self {
        Self::with_connector(ZmqConnector::new())
    }
}

impl Default for ListenerBuilder<ZmqConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ListenerBuilder<C> {
    /// Create a builder using a custom transport.
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            config: ListenerConfig::default(),
            stats: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ListenerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the publisher endpoint.
    ///
    /// Default: `tcp://127.0.0.1:7678`
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the topic prefix.
    ///
    /// Default: empty (all topics)
    pub fn topic(mut self, topic: impl Into<Vec<u8>>) -> Self {
        self.config.topic = topic.into();
        self
    }

    /// Set the per-receive deadline.
    ///
    /// Default: 1 second
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout = timeout;
        self
    }

    /// Reconnect after this long without a frame.
    ///
    /// Default: 60 seconds
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Never reconnect because of silence.
    pub fn disable_idle_timeout(mut self) -> Self {
        self.config.idle_timeout = None;
        self
    }

    /// Give up once this many retries after the first failed connection
    /// attempt have failed too. `0` gives up on the first failure.
    ///
    /// Default: retry forever
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = Some(retries);
        self
    }

    /// Set the reconnect delay schedule.
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Share existing stats instead of allocating new ones.
    pub fn stats(mut self, stats: Arc<ListenerStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Build the listener.
    pub fn build(self) -> Listener<C> {
        Listener {
            connector: self.connector,
            config: self.config,
            stats: self.stats.unwrap_or_default(),
        }
    }
}

/// How a listening session ended.
enum SessionEnd {
    Cancelled,
    Disconnected(ChannelError),
    SinkClosed,
}

/// Subscribes to a feed and delivers decoded announcements.
pub struct Listener<C = ZmqConnector> {
    connector: C,
    config: ListenerConfig,
    stats: Arc<ListenerStats>,
}

impl Listener<ZmqConnector> {
    /// Create a new listener builder.
    pub fn builder() -> ListenerBuilder<ZmqConnector> {
        ListenerBuilder::new()
    }
}

impl<C: Connector> Listener<C> {
    /// Active configuration.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Shared counters and state.
    pub fn stats(&self) -> Arc<ListenerStats> {
        self.stats.clone()
    }

    /// Receive until `cancel` fires or a fatal error occurs.
    ///
    /// Every decoded announcement is passed to `sink` exactly once, in
    /// receipt order. Returns `Ok(())` on cancellation.
    pub async fn run<S: AnnouncementSink>(
        &mut self,
        mut sink: S,
        cancel: CancellationToken,
    ) -> Result<(), FatalError> {
        let mut backoff = Backoff::new(self.config.backoff);
        self.stats.set_state(ListenerState::Disconnected);

        let result = loop {
            let mut channel = match self.establish(&mut backoff, &cancel).await {
                Ok(Some(channel)) => channel,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            self.transition(ListenerState::Listening);
            let end = self.listen(&mut channel, &mut sink, &cancel).await;
            channel.close().await;

            match end {
                SessionEnd::Cancelled => break Ok(()),
                SessionEnd::SinkClosed => break Err(FatalError::SinkClosed),
                SessionEnd::Disconnected(e) => {
                    self.stats.record_disconnect();
                    self.transition(ListenerState::Disconnected);

                    let delay = backoff.next_delay();
                    warn!(
                        endpoint = %self.config.endpoint,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "subscription lost, reconnecting"
                    );
                    if !sleep_or_cancel(delay, &cancel).await {
                        break Ok(());
                    }
                }
            }
        };

        self.transition(ListenerState::Terminated);
        match &result {
            Ok(()) => info!(endpoint = %self.config.endpoint, "listener stopped"),
            Err(e) => error!(endpoint = %self.config.endpoint, error = %e, "listener failed"),
        }
        result
    }

    /// Connect and subscribe, retrying with backoff.
    ///
    /// Returns `Ok(None)` if cancelled while connecting.
    async fn establish(
        &mut self,
        backoff: &mut Backoff,
        cancel: &CancellationToken,
    ) -> Result<Option<C::Channel>, FatalError> {
        let mut failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                res = self.connect_and_subscribe() => res,
            };

            let err = match attempt {
                Ok(channel) => {
                    backoff.reset();
                    info!(endpoint = %self.config.endpoint, "subscribed to feed");
                    return Ok(Some(channel));
                }
                Err(e) => e,
            };

            self.stats.record_connect_failure();
            if !err.is_retryable() {
                return Err(FatalError::InvalidEndpoint(err));
            }

            failures = failures.saturating_add(1);
            if let Some(max_retries) = self.config.max_retries {
                if failures > max_retries {
                    return Err(FatalError::ReconnectExhausted {
                        attempts: failures,
                        last_error: err,
                    });
                }
            }

            let delay = backoff.next_delay();
            warn!(
                endpoint = %self.config.endpoint,
                attempt = failures,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "connection attempt failed"
            );
            if !sleep_or_cancel(delay, cancel).await {
                return Ok(None);
            }
        }
    }

    async fn connect_and_subscribe(&mut self) -> Result<C::Channel, ConnectError> {
        let mut channel = self.connector.connect(&self.config.endpoint).await?;
        if let Err(e) = channel.subscribe(&self.config.topic).await {
            channel.close().await;
            return Err(e.into());
        }
        Ok(channel)
    }

    /// Receive, decode and deliver until the session ends.
    async fn listen<S: AnnouncementSink>(
        &self,
        channel: &mut C::Channel,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let mut last_frame_at = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return SessionEnd::Cancelled;
            }

            let deadline = Instant::now() + self.config.receive_timeout;
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                res = channel.receive_frame(Some(deadline)) => res,
            };

            let frame = match received {
                Ok(frame) => frame,
                Err(ChannelError::Timeout) => {
                    if let Some(idle) = self.config.idle_timeout {
                        if last_frame_at.elapsed() >= idle {
                            return SessionEnd::Disconnected(ChannelError::Stale(idle));
                        }
                    }
                    continue;
                }
                Err(e) if e.is_malformed_message() => {
                    last_frame_at = Instant::now();
                    self.stats.record_protocol_error();
                    warn!(error = %e, "dropping malformed message");
                    continue;
                }
                Err(e) => return SessionEnd::Disconnected(e),
            };

            last_frame_at = Instant::now();
            self.stats.record_frame();

            let announcement = match FrameDecoder::decode_frame(&frame) {
                Ok(announcement) => announcement,
                Err(e) => {
                    self.stats.record_decode_error();
                    warn!(error = %e, "dropping undecodable frame");
                    continue;
                }
            };

            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                res = sink.deliver(announcement) => res,
            };
            if delivered.is_err() {
                return SessionEnd::SinkClosed;
            }
            self.stats.record_delivery();
        }
    }

    fn transition(&self, state: ListenerState) {
        let previous = self.stats.state();
        if previous != state {
            debug!(from = %previous, to = %state, "listener state change");
            self.stats.set_state(state);
        }
    }
}

/// Sleep for `delay`; returns `false` if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.endpoint, "tcp://127.0.0.1:7678");
        assert!(config.topic.is_empty());
        assert_eq!(config.receive_timeout, Duration::from_secs(1));
        assert_eq!(config.idle_timeout, Some(DEFAULT_IDLE_TIMEOUT));
        assert_eq!(config.max_retries, None);
        assert_eq!(config.backoff, BackoffConfig::default());
    }

    #[test]
    fn test_builder_disables_idle_timeout() {
        let listener = Listener::builder().disable_idle_timeout().build();
        assert_eq!(listener.config().idle_timeout, None);
    }

    #[test]
    fn test_builder_configuration() {
        let listener = Listener::builder()
            .endpoint("tcp://10.0.0.1:9000")
            .topic("tx")
            .receive_timeout(Duration::from_millis(250))
            .idle_timeout(Duration::from_secs(30))
            .max_retries(5)
            .backoff(BackoffConfig::default().without_jitter())
            .build();

        let config = listener.config();
        assert_eq!(config.endpoint, "tcp://10.0.0.1:9000");
        assert_eq!(config.topic, b"tx".to_vec());
        assert_eq!(config.receive_timeout, Duration::from_millis(250));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.backoff.jitter, 0.0);
    }

    #[test]
    fn test_builder_replaces_config() {
        let config = ListenerConfig {
            endpoint: "ipc:///tmp/radar.sock".into(),
            max_retries: Some(1),
            ..ListenerConfig::default()
        };
        let listener = ListenerBuilder::default().config(config.clone()).build();
        assert_eq!(listener.config(), &config);
    }

    #[test]
    fn test_builder_shares_stats() {
        let stats = Arc::new(ListenerStats::new());
        let listener = Listener::builder().stats(stats.clone()).build();

        assert!(Arc::ptr_eq(&stats, &listener.stats()));
    }

    #[tokio::test]
    async fn test_sleep_or_cancel() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::from_millis(1), &cancel).await);

        cancel.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(3600), &cancel).await);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_fatal() {
        let mut listener = Listener::builder().endpoint("not-an-endpoint").build();
        let result = listener
            .run(crate::sink_fn(|_| {}), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(FatalError::InvalidEndpoint(_))));
        assert_eq!(listener.stats().connect_failures(), 1);
        assert_eq!(listener.stats().state(), ListenerState::Terminated);
    }
}
