//! Segment-backed chunked cache.
//!
//! Every batch appended to a partition becomes one self-describing segment in
//! a pluggable byte `Storage`. The cache keeps the ordered segment list per
//! partition in memory and replays it lazily, one segment per pull.

pub mod codec;
pub mod segment;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use spillsort_core::id::PartitionId;
use spillsort_core::types::RowBatch;

use crate::cache::{BatchStream, ChunkedCache};
use crate::error::{Error, Result};

pub use codec::Codec;
pub use segment::{SegmentHeader, SegmentMeta, SegmentName, HEADER_LEN};

/// Abstract byte storage for spill segments.
///
/// Implemented by `spillsort-io::FsStorage` for the local filesystem and by
/// `spillsort-io::MemoryStorage` for tests.
pub trait Storage: Send + Sync {
    /// Write bytes to a path. Creates parent directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read a byte range from a path. Returns at most `len` bytes.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;

    /// List all paths under a prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;
}

/// [`ChunkedCache`] writing one checksummed segment per appended batch.
pub struct SpillCache {
    storage: Box<dyn Storage>,
    codec: Codec,
    root_dir: String,
    next_segment: AtomicU64,
    partitions: Mutex<HashMap<PartitionId, Vec<SegmentMeta>>>,
}

impl SpillCache {
    pub fn new(storage: Box<dyn Storage>, codec: Codec, root_dir: impl Into<String>) -> Self {
        Self {
            storage,
            codec,
            root_dir: root_dir.into(),
            next_segment: AtomicU64::new(0),
            partitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    /// Number of segments currently recorded for a partition.
    pub fn segment_count(&self, id: &PartitionId) -> Result<usize> {
        Ok(self.index()?.get(id).map(Vec::len).unwrap_or(0))
    }

    /// Partitions that currently hold at least one segment.
    pub fn partitions(&self) -> Result<Vec<PartitionId>> {
        let mut ids: Vec<PartitionId> = self
            .index()?
            .iter()
            .filter(|(_, segs)| !segs.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn index(&self) -> Result<MutexGuard<'_, HashMap<PartitionId, Vec<SegmentMeta>>>> {
        self.partitions
            .lock()
            .map_err(|_| Error::Storage("spill index lock poisoned".into()))
    }

    /// Serialize, compress, checksum and write one batch.
    fn write_segment(&self, id: &PartitionId, batch: &RowBatch) -> Result<SegmentMeta> {
        let uncompressed =
            serde_json::to_vec(batch).map_err(|e| Error::Codec(format!("json serialize: {e}")))?;
        let compressed = self.codec.compress(&uncompressed)?;

        let header = SegmentHeader {
            codec: self.codec,
            rows: u32::try_from(batch.num_rows())
                .map_err(|_| Error::Storage("batch too large for one segment".into()))?,
            uncompressed_len: uncompressed.len() as u64,
            compressed_len: compressed.len() as u64,
        };
        header.validate_sizes()?;

        let mut full_segment = header.to_bytes();
        full_segment.extend_from_slice(&compressed);
        let checksum: [u8; 32] = blake3::hash(&full_segment).into();

        let seq = self.next_segment.fetch_add(1, Ordering::Relaxed);
        let name = SegmentName::new(id, seq);
        let path = format!("{}/{}/{}", self.root_dir, name.dir, name.file);
        self.storage.write(&path, &full_segment)?;

        Ok(SegmentMeta {
            name,
            path,
            header,
            checksum,
        })
    }

    /// Read, verify and decode one segment.
    fn read_segment(&self, meta: &SegmentMeta) -> Result<RowBatch> {
        let total_len = HEADER_LEN + meta.header.compressed_len as usize;
        let full_segment = self.storage.read_range(&meta.path, 0, total_len)?;

        if full_segment.len() != total_len {
            return Err(Error::Storage(format!(
                "segment '{}' truncated: {} of {} bytes",
                meta.path,
                full_segment.len(),
                total_len
            )));
        }

        let computed: [u8; 32] = blake3::hash(&full_segment).into();
        if computed != meta.checksum {
            return Err(Error::ChecksumMismatch(meta.path.clone()));
        }

        let header = SegmentHeader::from_bytes(&full_segment[..HEADER_LEN])?;
        let uncompressed = header.codec.decompress(&full_segment[HEADER_LEN..])?;
        let batch: RowBatch = serde_json::from_slice(&uncompressed)
            .map_err(|e| Error::Codec(format!("json deserialize: {e}")))?;

        if batch.num_rows() != header.rows as usize {
            return Err(Error::Storage(format!(
                "segment '{}' declares {} rows but holds {}",
                meta.path,
                header.rows,
                batch.num_rows()
            )));
        }
        Ok(batch)
    }
}

impl ChunkedCache for SpillCache {
    fn add(&self, id: &PartitionId, batch: RowBatch) -> Result<()> {
        // Write outside the index lock; readers only ever see completed segments.
        let meta = self.write_segment(id, &batch)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(partition = %id, path = %meta.path, rows = batch.num_rows(), "segment written");
        self.index()?.entry(id.clone()).or_default().push(meta);
        Ok(())
    }

    fn read(&self, id: &PartitionId) -> Result<BatchStream<'_>> {
        let segments = self.index()?.get(id).cloned().unwrap_or_default();
        Ok(Box::new(
            segments
                .into_iter()
                .map(move |meta| self.read_segment(&meta)),
        ))
    }

    fn clear(&self, id: &PartitionId) -> Result<()> {
        let segments = self.index()?.remove(id).unwrap_or_default();
        #[cfg(feature = "tracing")]
        tracing::trace!(partition = %id, segments = segments.len(), "partition cleared");
        for meta in &segments {
            self.storage.delete(&meta.path)?;
        }
        Ok(())
    }

    fn has(&self, id: &PartitionId) -> Result<bool> {
        Ok(self.segment_count(id)? > 0)
    }
}
