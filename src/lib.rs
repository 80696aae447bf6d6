//! # txradar-listener
//!
//! Resilient subscriber for txradar transaction announcement feeds.
//!
//! The radar publishes one two-part message per transaction it sees on the
//! peer-to-peer network: the 4-byte little-endian id of the peer connection
//! that announced it, and the raw transaction hash. This crate subscribes to
//! that feed and hands decoded [`Announcement`]s to a consumer.
//!
//! ## Architecture
//!
//! - **Protocol**: [`RawFrame`] and the pure [`FrameDecoder`]
//! - **Transport**: [`Connector`] / [`SubscriptionChannel`] traits, with a
//!   ZeroMQ SUB socket implementation
//! - **Listener**: the receive loop, with reconnect backoff and a
//!   drop-and-count policy for malformed messages
//!
//! ## Example
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use txradar_listener::{sink_fn, Listener};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut listener = Listener::builder()
//!         .endpoint("tcp://127.0.0.1:7678")
//!         .build();
//!
//!     listener
//!         .run(sink_fn(|ann| println!("{ann}")), CancellationToken::new())
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod backoff;
pub mod error;
pub mod protocol;
pub mod sink;
pub mod stats;
pub mod transport;

mod listener;

pub use backoff::BackoffConfig;
pub use error::{ChannelError, ConnectError, DecodeError, FatalError};
pub use listener::{
    default_endpoint, Listener, ListenerBuilder, ListenerConfig, DEFAULT_IDLE_TIMEOUT,
    DEFAULT_RECEIVE_TIMEOUT,
};
pub use protocol::{Announcement, FrameDecoder, RawFrame};
pub use sink::{sink_fn, AnnouncementSink, FnSink, SinkClosed};
pub use stats::{ListenerState, ListenerStats, StatsSnapshot};
pub use transport::{
    Connector, SubscriptionChannel, ZmqChannel, ZmqConnector, DEFAULT_CONNECT_TIMEOUT,
};
