//! # Chunk Pipeline
//!
//! Parallel compression and decompression of column chunks.
//!
//! ## Design Principles
//!
//! 1. **Independent units**: one unit per (row group, column), plus one per
//!    source range outside any chunk, so the source can be rebuilt exactly.
//!
//! 2. **Slot-ordered output**: workers write into a pre-sized result array
//!    indexed by unit; the blob and chunk list are assembled in
//!    (row group, column) order once all units are done.
//!
//! 3. **All or nothing**: the first failure or an observer cancellation stops
//!    dispatch, lets in-flight units drain, and fails the whole operation.
//!
//! 4. **Verified reads**: every compressed slice is checked against its
//!    CRC32 before it is decompressed, and the rebuilt file against the
//!    source checksum.

mod compress;
mod decompress;
mod pool;
mod progress;

#[cfg(test)]
mod tests;

pub use compress::{ChunkCompressor, CompressOptions, CompressedOutput};
pub use decompress::{ChunkDecompressor, DecompressOptions, IntegrityReport, Reconstruction};
pub use pool::MAX_WORKERS;
pub use progress::{NoProgress, Progress, ProgressObserver};
