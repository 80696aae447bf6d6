//! Listener counters and connection state.
//!
//! Dropped messages and reconnects never surface as errors from the
//! listener; they are counted here instead. All fields are atomics, so a
//! [`ListenerStats`] can be shared through an `Arc` with any number of
//! observers while the listener task updates it.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle state of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    /// No open subscription, connecting or waiting to reconnect.
    Disconnected,
    /// Subscribed and receiving.
    Listening,
    /// Cancelled or stopped by a fatal error.
    Terminated,
}

impl ListenerState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Listening => 1,
            Self::Terminated => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Listening,
            2 => Self::Terminated,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Listening => "listening",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Shared counters updated by the listener.
#[derive(Debug, Default)]
pub struct ListenerStats {
    state: AtomicU8,
    frames_received: AtomicU64,
    announcements_delivered: AtomicU64,
    decode_errors: AtomicU64,
    protocol_errors: AtomicU64,
    connect_failures: AtomicU64,
    disconnects: AtomicU64,
}

/// Point-in-time copy of [`ListenerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Lifecycle state when the snapshot was taken.
    pub state: ListenerState,
    /// Frames handed over by the transport.
    pub frames_received: u64,
    /// Announcements passed to the sink.
    pub announcements_delivered: u64,
    /// Frames dropped because their content did not decode.
    pub decode_errors: u64,
    /// Messages dropped because of a wrong part count.
    pub protocol_errors: u64,
    /// Failed connection attempts.
    pub connect_failures: u64,
    /// Subscriptions lost after being established.
    pub disconnects: u64,
}

impl ListenerStats {
    /// Create zeroed stats in the `Disconnected` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ListenerState {
        ListenerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether a subscription is currently open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state() == ListenerState::Listening
    }

    #[inline]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn announcements_delivered(&self) -> u64 {
        self.announcements_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn protocol_errors(&self) -> u64 {
        self.protocol_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn connect_failures(&self) -> u64 {
        self.connect_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// Copy all counters at once.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            state: self.state(),
            frames_received: self.frames_received(),
            announcements_delivered: self.announcements_delivered(),
            decode_errors: self.decode_errors(),
            protocol_errors: self.protocol_errors(),
            connect_failures: self.connect_failures(),
            disconnects: self.disconnects(),
        }
    }

    pub(crate) fn set_state(&self, state: ListenerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self) {
        self.announcements_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }
}
