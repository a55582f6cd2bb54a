//! Sorting engine: keys and comparator, spill buffer, merge heap and cursors,
//! and the two strategies built from them.

pub mod bounded;
pub mod buffer;
pub mod comparator;
pub mod cursor;
pub mod external;
pub mod heap;
pub mod keys;
pub mod source;

pub use bounded::BoundedMemorySort;
pub use buffer::{BoundedBuffer, BufferStats};
pub use comparator::RecordComparator;
pub use cursor::{MergeCursors, PartitionCursor};
pub use external::ExternalMergeSort;
pub use heap::{MergeHeap, TaggedRecord};
pub use keys::{SortDirection, SortKey, SortKeySpec};
pub use source::SortedSource;
