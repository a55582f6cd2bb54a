//! Segment header and metadata.
//!
//! Layout in storage:
//! [ magic: u32 ][ version: u16 ][ codec: u8 ][ reserved: u8 ]
//! [ rows: u32 ][ uncompressed_len: u64 ][ compressed_len: u64 ]
//! [ payload bytes … ]
//!
//! End-to-end checksum is computed over (header || payload) using blake3 and
//! kept in memory alongside the segment metadata.

use spillsort_core::hash::hash_str;
use spillsort_core::id::PartitionId;

use super::Codec;
use crate::error::{Error, Result};

pub const MAGIC: u32 = 0x5350_5347; // "SPSG"
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 + 8 + 8;

/// Segments larger than this are treated as corrupt rather than allocated.
pub const MAX_SEGMENT_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub codec: Codec,
    pub rows: u32,
    pub uncompressed_len: u64,
    pub compressed_len: u64,
}

impl SegmentHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.push(self.codec as u8);
        out.push(0u8); // reserved
        out.extend_from_slice(&self.rows.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_len.to_le_bytes());
        out.extend_from_slice(&self.compressed_len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Storage("short segment header".into()));
        }
        let magic = u32::from_le_bytes(le_array(bytes, 0));
        let version = u16::from_le_bytes(le_array(bytes, 4));
        if magic != MAGIC || version != VERSION {
            return Err(Error::Storage("bad segment magic/version".into()));
        }
        let header = Self {
            codec: Codec::from_u8(bytes[6])?,
            rows: u32::from_le_bytes(le_array(bytes, 8)),
            uncompressed_len: u64::from_le_bytes(le_array(bytes, 12)),
            compressed_len: u64::from_le_bytes(le_array(bytes, 20)),
        };
        header.validate_sizes()?;
        Ok(header)
    }

    /// Reject sizes that would force an unreasonable allocation.
    pub fn validate_sizes(&self) -> Result<()> {
        if self.uncompressed_len > MAX_SEGMENT_BYTES || self.compressed_len > MAX_SEGMENT_BYTES {
            return Err(Error::Storage(format!(
                "segment sizes {}/{} exceed max {}",
                self.compressed_len, self.uncompressed_len, MAX_SEGMENT_BYTES
            )));
        }
        Ok(())
    }
}

/// Copy `N` bytes starting at `at`. Callers check the overall length first.
fn le_array<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

/// Storage-safe name for a segment: partition digest plus sequence number.
///
/// Partition ids are arbitrary strings, so they are hashed rather than used
/// verbatim as path components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentName {
    pub dir: String,
    pub file: String,
}

impl SegmentName {
    pub fn new(partition: &PartitionId, seq: u64) -> Self {
        SegmentName {
            dir: partition_dir(partition),
            file: format!("seg{seq:010}.seg"),
        }
    }
}

pub fn partition_dir(partition: &PartitionId) -> String {
    hash_str(partition.as_str()).short_hex(16)
}

/// Metadata the cache keeps for a written segment.
#[derive(Debug, Clone)]
pub struct SegmentMeta {
    pub name: SegmentName,
    pub path: String,
    pub header: SegmentHeader,
    pub checksum: [u8; 32],
}
