//! Protocol module - feed constants, raw frames and decoding.
//!
//! This module implements the txradar notify feed format:
//! - two-part frames as delivered by the transport
//! - the decoded [`Announcement`] record
//! - the pure [`FrameDecoder`]

mod announcement;
mod decoder;
mod frame;

pub use announcement::Announcement;
pub use decoder::FrameDecoder;
pub use frame::{RawFrame, FRAME_PARTS, NODE_ID_SIZE};

/// Port the radar publishes transaction announcements on.
pub const NOTIFY_PORT: u16 = 7678;
