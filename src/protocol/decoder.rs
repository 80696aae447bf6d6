//! Frame decoder - raw parts to [`Announcement`].
//!
//! Pure functions, no I/O. Implemented as a marker struct with associated
//! functions so callers can name the decoder without holding any state.
//!
//! # Example
//!
//! ```
//! use txradar_listener::protocol::FrameDecoder;
//!
//! let ann = FrameDecoder::decode(b"\x01\x00\x00\x00", b"\xde\xad\xbe\xef").unwrap();
//! assert_eq!(ann.node_id(), 1);
//! assert_eq!(ann.tx_hash_hex(), "deadbeef");
//! ```

use bytes::Bytes;

use super::announcement::Announcement;
use super::frame::{RawFrame, NODE_ID_SIZE};
use crate::error::DecodeError;

/// Decoder for txradar announcement frames.
pub struct FrameDecoder;

impl FrameDecoder {
    /// Decode a node id part and a hash part.
    ///
    /// The hash bytes are copied; use [`decode_frame`](Self::decode_frame)
    /// to share them with the frame instead.
    pub fn decode(part0: &[u8], part1: &[u8]) -> Result<Announcement, DecodeError> {
        let node_id = Self::decode_node_id(part0)?;
        Self::check_hash(part1)?;
        Ok(Announcement::new(node_id, Bytes::copy_from_slice(part1)))
    }

    /// Decode a received frame without copying the hash.
    pub fn decode_frame(frame: &RawFrame) -> Result<Announcement, DecodeError> {
        let node_id = Self::decode_node_id(frame.part0())?;
        Self::check_hash(frame.part1())?;
        Ok(Announcement::new(node_id, frame.part1_bytes()))
    }

    fn decode_node_id(part0: &[u8]) -> Result<u32, DecodeError> {
        let bytes: [u8; NODE_ID_SIZE] = part0.try_into().map_err(|_| DecodeError::WrongLength {
            field: "node_id",
            expected: NODE_ID_SIZE,
            actual: part0.len(),
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    #[inline]
    fn check_hash(part1: &[u8]) -> Result<(), DecodeError> {
        if part1.is_empty() {
            return Err(DecodeError::EmptyHash);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_example() {
        let ann = FrameDecoder::decode(&[0x01, 0x00, 0x00, 0x00], &[0xde, 0xad, 0xbe, 0xef]).unwrap();
        assert_eq!(ann.node_id(), 1);
        assert_eq!(ann.tx_hash(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(ann.tx_hash_hex(), "deadbeef");
    }

    #[test]
    fn test_node_id_is_little_endian() {
        let ann = FrameDecoder::decode(&[0x78, 0x56, 0x34, 0x12], b"h").unwrap();
        assert_eq!(ann.node_id(), 0x1234_5678);
    }

    #[test]
    fn test_node_id_range() {
        let hash = [0x5a; 32];
        for node_id in [0, 1, 255, 256, 65_535, 0x8000_0000, u32::MAX - 1, u32::MAX] {
            let ann = FrameDecoder::decode(&node_id.to_le_bytes(), &hash).unwrap();
            assert_eq!(ann.node_id(), node_id);
            assert_eq!(ann.tx_hash(), &hash);
            assert_eq!(ann.tx_hash_hex(), "5a".repeat(32));
        }
    }

    #[test]
    fn test_hash_is_opaque() {
        // Every byte value survives, none is treated as text.
        let hash: Vec<u8> = (0..=255).collect();
        let ann = FrameDecoder::decode(&7u32.to_le_bytes(), &hash).unwrap();
        assert_eq!(ann.tx_hash(), &hash[..]);
        assert_eq!(ann.tx_hash_hex(), hex::encode(&hash));
    }

    #[test]
    fn test_single_byte_hash() {
        let ann = FrameDecoder::decode(&[0, 0, 0, 0], &[0x0f]).unwrap();
        assert_eq!(ann.tx_hash_hex(), "0f");
    }

    #[test]
    fn test_wrong_node_id_length() {
        for len in [0usize, 1, 2, 3, 5] {
            let part0 = vec![0u8; len];
            assert_eq!(
                FrameDecoder::decode(&part0, b"hash"),
                Err(DecodeError::WrongLength {
                    field: "node_id",
                    expected: 4,
                    actual: len,
                }),
                "length {len} must be rejected"
            );
        }
    }

    #[test]
    fn test_empty_hash() {
        assert_eq!(
            FrameDecoder::decode(&[1, 0, 0, 0], b""),
            Err(DecodeError::EmptyHash)
        );
    }

    #[test]
    fn test_length_checked_before_hash() {
        assert!(matches!(
            FrameDecoder::decode(&[1, 0], b""),
            Err(DecodeError::WrongLength { actual: 2, .. })
        ));
    }

    #[test]
    fn test_decode_frame_zero_copy() {
        let hash = Bytes::from_static(&[0xaa; 32]);
        let frame = RawFrame::new(Bytes::from_static(&[2, 0, 0, 0]), hash.clone());

        let ann = FrameDecoder::decode_frame(&frame).unwrap();
        assert_eq!(ann.node_id(), 2);
        assert_eq!(ann.tx_hash_bytes().as_ptr(), hash.as_ptr());
    }

    #[test]
    fn test_decode_frame_matches_decode() {
        let frame = RawFrame::new(vec![9u8, 1, 0, 0], vec![1u8, 2, 3]);
        assert_eq!(
            FrameDecoder::decode_frame(&frame),
            FrameDecoder::decode(frame.part0(), frame.part1())
        );
    }

    #[test]
    fn test_decode_frame_errors() {
        let short = RawFrame::new(vec![1u8], vec![1u8]);
        assert!(matches!(
            FrameDecoder::decode_frame(&short),
            Err(DecodeError::WrongLength { actual: 1, .. })
        ));

        let empty = RawFrame::new(vec![1u8, 0, 0, 0], Bytes::new());
        assert_eq!(FrameDecoder::decode_frame(&empty), Err(DecodeError::EmptyHash));
    }
}
