//! Raw two-part frames as delivered by the transport.
//!
//! Wire layout of one announcement message:
//! ```text
//! ┌─────────────────────┬──────────────────────────┐
//! │ Part 0: node id     │ Part 1: tx hash          │
//! │ 4 bytes, uint32 LE  │ variable, raw digest     │
//! └─────────────────────┴──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use txradar_listener::protocol::RawFrame;
//!
//! let parts = vec![Bytes::from_static(&[1, 0, 0, 0]), Bytes::from_static(&[0xde, 0xad])];
//! let frame = RawFrame::from_parts(parts).unwrap();
//! assert_eq!(frame.part0(), &[1, 0, 0, 0]);
//! ```

use bytes::Bytes;

use crate::error::ChannelError;

/// Number of parts in every announcement message.
pub const FRAME_PARTS: usize = 2;

/// Width of the node id part in bytes.
pub const NODE_ID_SIZE: usize = 4;

/// One complete message unit: `(part0, part1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    part0: Bytes,
    part1: Bytes,
}

impl RawFrame {
    /// Create a frame from its two parts.
    pub fn new(part0: impl Into<Bytes>, part1: impl Into<Bytes>) -> Self {
        Self {
            part0: part0.into(),
            part1: part1.into(),
        }
    }

    /// Build a frame from a multi-part message.
    ///
    /// Returns [`ChannelError::UnexpectedPartCount`] unless there are exactly
    /// [`FRAME_PARTS`] parts.
    pub fn from_parts(parts: Vec<Bytes>) -> Result<Self, ChannelError> {
        let actual = parts.len();
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(part0), Some(part1), None) => Ok(Self { part0, part1 }),
            _ => Err(ChannelError::UnexpectedPartCount {
                expected: FRAME_PARTS,
                actual,
            }),
        }
    }

    /// The node id part.
    #[inline]
    pub fn part0(&self) -> &[u8] {
        &self.part0
    }

    /// The transaction hash part.
    #[inline]
    pub fn part1(&self) -> &[u8] {
        &self.part1
    }

    /// Cheap clone of the transaction hash part.
    #[inline]
    pub(crate) fn part1_bytes(&self) -> Bytes {
        self.part1.clone()
    }

    /// Split into the two parts.
    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.part0, self.part1)
    }
}
