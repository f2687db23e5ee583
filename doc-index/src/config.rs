//! Index build configuration.

/// Default target chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;
/// Default overlap between sliced windows of one long paragraph.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Number of chunks sent per embedding request.
pub const DEFAULT_EMBED_BATCH: usize = 16;

/// Configuration for building a [`crate::DocumentIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Overlap (characters) between windows of a paragraph longer than `chunk_size`.
    pub chunk_overlap: usize,
    /// Chunks per embedding request.
    pub embed_batch: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embed_batch: DEFAULT_EMBED_BATCH,
        }
    }
}

impl IndexConfig {
    /// Clamps values into a usable range: non-zero sizes, overlap below size.
    pub fn sanitized(self) -> Self {
        let chunk_size = self.chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: self.chunk_overlap.min(chunk_size - 1),
            embed_batch: self.embed_batch.max(1),
        }
    }
}
