//! Consumers of decoded announcements.
//!
//! The listener awaits each delivery before receiving the next frame, so a
//! slow sink delays the receive loop instead of growing a queue. Two sinks
//! are provided:
//!
//! - `tokio::sync::mpsc::Sender<Announcement>`: a bounded channel; with
//!   capacity 1 at most one announcement waits for the consumer
//! - [`FnSink`] (via [`sink_fn`]): a synchronous callback
//!
//! # Example
//!
//! ```ignore
//! use txradar_listener::{sink_fn, Listener};
//!
//! let sink = sink_fn(|ann| println!("{ann}"));
//! listener.run(sink, cancel).await?;
//! ```

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::Announcement;

/// The consumer is gone and will never accept another announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("announcement sink closed")]
pub struct SinkClosed;

/// Destination for decoded announcements.
pub trait AnnouncementSink: Send {
    /// Hand over one announcement.
    ///
    /// The listener does not receive the next frame until this resolves.
    fn deliver(
        &mut self,
        announcement: Announcement,
    ) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

impl AnnouncementSink for mpsc::Sender<Announcement> {
    async fn deliver(&mut self, announcement: Announcement) -> Result<(), SinkClosed> {
        self.send(announcement).await.map_err(|_| SinkClosed)
    }
}

impl AnnouncementSink for mpsc::UnboundedSender<Announcement> {
    async fn deliver(&mut self, announcement: Announcement) -> Result<(), SinkClosed> {
        self.send(announcement).map_err(|_| SinkClosed)
    }
}

/// Sink wrapping a synchronous callback.
pub struct FnSink<F> {
    f: F,
}

/// Wrap a callback as an [`AnnouncementSink`].
pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(Announcement) + Send,
{
    FnSink { f }
}

impl<F> AnnouncementSink for FnSink<F>
where
    F: FnMut(Announcement) + Send,
{
    async fn deliver(&mut self, announcement: Announcement) -> Result<(), SinkClosed> {
        (self.f)(announcement);
        Ok(())
    }
}
