use serde::{Deserialize, Serialize};

use crate::ChunkId;

/// One chunk reference inside an [`Index`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexChunk {
    pub id: ChunkId,
    pub length: u64,
    pub offset: u64,
}

/// Ordered sequence of chunk references reconstituting one artifact by
/// concatenation. An index with zero chunks is always invalid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    chunks: Vec<IndexChunk>,
}

impl Index {
    pub fn new(chunks: Vec<IndexChunk>) -> Self {
        Index { chunks }
    }

    pub fn chunks(&self) -> &[IndexChunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of the inflated (pre-chunking) lengths of all referenced chunks.
    pub fn inflated_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.length).sum()
    }
}

/// The two artifact kinds this store's index files can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Nar,
    Narinfo,
}

impl ArtifactKind {
    /// Classify a path by its extension. Returns `None` for anything else.
    pub fn from_extension(path: &std::path::Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("nar") => Some(ArtifactKind::Nar),
            Some("narinfo") => Some(ArtifactKind::Narinfo),
            _ => None,
        }
    }
}

/// One index file discovered while walking the index store. Lives only for the
/// duration of a single GC pass.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub path: std::path::PathBuf,
    pub kind: ArtifactKind,
    pub index: Index,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_index_is_empty() {
        let idx = Index::default();
        assert!(idx.is_empty());
        assert_eq!(idx.inflated_size(), 0);
    }

    #[test]
    fn inflated_size_sums_chunk_lengths() {
        let idx = Index::new(vec![
            IndexChunk {
                id: ChunkId::from_digest([1; 32]),
                length: 10,
                offset: 0,
            },
            IndexChunk {
                id: ChunkId::from_digest([2; 32]),
                length: 20,
                offset: 10,
            },
        ]);
        assert_eq!(idx.inflated_size(), 30);
    }

    #[test]
    fn classifies_by_extension() {
        assert_eq!(
            ArtifactKind::from_extension(std::path::Path::new("x.nar")),
            Some(ArtifactKind::Nar)
        );
        assert_eq!(
            ArtifactKind::from_extension(std::path::Path::new("x.narinfo")),
            Some(ArtifactKind::Narinfo)
        );
        assert_eq!(
            ArtifactKind::from_extension(std::path::Path::new("x.tmp")),
            None
        );
    }
}
