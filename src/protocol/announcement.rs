//! The decoded announcement record.

use std::fmt;

use bytes::Bytes;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A transaction seen by one of the radar's peer connections.
///
/// Only [`FrameDecoder`](super::FrameDecoder) constructs announcements, so a
/// value always holds a valid node id and a non-empty hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Announcement {
    node_id: u32,
    tx_hash: Bytes,
}

impl Announcement {
    pub(crate) fn new(node_id: u32, tx_hash: Bytes) -> Self {
        Self { node_id, tx_hash }
    }

    /// Identifier of the peer connection that announced the transaction.
    #[inline]
    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    /// Raw hash bytes, exactly as received.
    #[inline]
    pub fn tx_hash(&self) -> &[u8] {
        &self.tx_hash
    }

    /// Cheap clone of the hash bytes.
    #[inline]
    pub fn tx_hash_bytes(&self) -> Bytes {
        self.tx_hash.clone()
    }

    /// Lowercase hex of the hash bytes in wire order.
    pub fn tx_hash_hex(&self) -> String {
        hex::encode(&self.tx_hash)
    }

    /// Lowercase hex of the hash bytes in reverse order.
    ///
    /// Bitcoin tools print digests byte-reversed; this matches the txid a
    /// block explorer shows for the same transaction.
    pub fn tx_hash_hex_reversed(&self) -> String {
        let reversed: Vec<u8> = self.tx_hash.iter().rev().copied().collect();
        hex::encode(reversed)
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.node_id, self.tx_hash_hex())
    }
}

impl Serialize for Announcement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Announcement", 2)?;
        state.serialize_field("node_id", &self.node_id)?;
        state.serialize_field("tx_hash", &self.tx_hash_hex())?;
        state.end()
    }
}
