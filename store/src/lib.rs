//! This crate implements the local cache's storage and maintenance layer.
//!
//! # Data formats
//!
//! Cached artifacts are split into variable-sized, content-addressed chunks and
//! stored deduplicated in a [`chunk_store`]. Per artifact, an [`index`] lists the
//! ordered chunks that reconstitute it by concatenation. Two artifact kinds
//! coexist: `.nar` (file-tree archive, see [`nar`]) and `.narinfo` (metadata
//! referring to a `.nar`, see [`narinfo`]).
//!
//! # Garbage collection
//!
//! Unlike an `atime`-based mark-and-sweep design, this store's GC ([`gc`]) keys
//! eviction on `mtime` through an explicit [`lru::LRUClassifier`]: every chunk is
//! offered to the classifier during a single walk and immediately placed in
//! `live` or `dead`, rather than marking chunks in a first pass and sweeping
//! unmarked ones in a second. This trades the `atime`/`relatime` caveats of the
//! mark-and-sweep approach for an explicit, budget-aware ordering that is easy to
//! reason about within one pass.
//!
//! Index integrity ([`index_walk`], [`integrity`]) runs alongside chunk
//! classification: any index referencing a chunk the GC is about to delete is
//! deleted too, and any index whose chunks fail to reassemble into a valid
//! artifact is deleted regardless of chunk health. Dead indices are always
//! removed before dead chunks (see [`gc::run_gc_pass`]).
//!
//! # Concurrency
//!
//! A pass owns its [`lru::LRUClassifier`] and [`dead_set::DeadIndexSet`]
//! exclusively; neither is a process-wide singleton. The `DeadIndexSet` is the
//! only value shared between threads within a pass: the index walk thread and the
//! three integrity workers ([`integrity::IntegrityPool`]) all write to it
//! concurrently, and the driver thread drains it once both walks have completed.

pub mod chunk_id;
pub mod chunk_stat;
pub mod chunk_store;
pub mod chunk_walk;
pub mod data_blob;
pub mod dead_set;
pub mod file_formats;
pub mod gc;
pub mod index;
pub mod index_store;
pub mod index_walk;
pub mod integrity;
pub mod lru;
pub mod nar;
pub mod narinfo;
pub mod verify;

pub use chunk_id::ChunkId;
pub use chunk_stat::ChunkStat;
pub use chunk_store::{ChunkStore, LocalChunkStore};
pub use data_blob::DataBlob;
pub use dead_set::DeadIndexSet;
pub use index::{ArtifactKind, Index, IndexChunk, IndexEntry};
pub use index_store::{IndexStore, LocalIndexStore};
pub use lru::LRUClassifier;
