use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, format_err, Error};

use crate::data_blob::DataBlob;
use crate::ChunkId;

/// File extension of a compressed chunk blob as it sits in the store.
pub const CHUNK_EXTENSION: &str = "cacnk";
/// Prefix marking a chunk file as an in-flight write; never classified by the walk.
pub const TMP_PREFIX: &str = ".tmp";

/// Contract the GC and verifier consume from the chunk layer.
///
/// Implementations are assumed internally thread-safe for concurrent reads, and for
/// concurrent reads racing writes/deletes from the proxy's own write path.
pub trait ChunkStore: Send + Sync {
    /// Filesystem root holding chunk files.
    fn base_path(&self) -> &Path;

    /// Read and content-validate a chunk. Any failure (missing, CRC mismatch,
    /// digest mismatch) is surfaced as an `Err` — the walk treats that as `dead`,
    /// never fatal.
    fn get_chunk(&self, id: &ChunkId) -> Result<Vec<u8>, Error>;

    /// Idempotent deletion; removing an already-absent chunk is not an error.
    fn remove_chunk(&self, id: &ChunkId) -> Result<(), Error>;

    /// Full self-check. `repair` permits the store to recompute or drop malformed
    /// files as it goes; `progress_sink` receives a percentage complete.
    fn verify(
        &self,
        parallelism: usize,
        repair: bool,
        progress_sink: &mut dyn FnMut(u8),
    ) -> Result<(), Error>;
}

/// 4-hex-character fanout prefix derived from a chunk id, matching the on-disk
/// `<base>/<xxxx>/<chunkid>.<ext>` layout.
fn digest_to_prefix(digest: &[u8; 32]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut buf = [0u8; 4];
    buf[0] = HEX[(digest[0] as usize) >> 4];
    buf[1] = HEX[(digest[0] as usize) & 0xf];
    buf[2] = HEX[(digest[1] as usize) >> 4];
    buf[3] = HEX[(digest[1] as usize) & 0xf];
    // SAFETY: buf only ever contains ASCII hex digits
    unsafe { String::from_utf8_unchecked(buf.to_vec()) }
}

/// File-system backed chunk store: a directory of up to 65536 two-byte-prefix
/// subdirectories, each holding zstd-compressed, CRC-guarded chunk blobs.
#[derive(Clone)]
pub struct LocalChunkStore {
    base: PathBuf,
}

impl LocalChunkStore {
    pub fn open<P: Into<PathBuf>>(base: P) -> Result<Self, Error> {
        let base = base.into();
        if !base.is_absolute() {
            bail!("expected absolute path - got {base:?}");
        }
        if let Err(err) = fs::metadata(&base) {
            bail!("unable to open chunk store at {base:?} - {err}");
        }
        Ok(LocalChunkStore { base })
    }

    pub fn chunk_path(&self, id: &ChunkId) -> PathBuf {
        let mut path = self.base.clone();
        path.push(digest_to_prefix(id.as_bytes()));
        path.push(format!("{}.{CHUNK_EXTENSION}", id.to_hex()));
        path
    }

    /// Walk every chunk subdirectory, yielding `(ChunkId, size, mtime)` for valid
    /// entries. Directories are counted but not yielded; `.tmp`-prefixed and
    /// non-`.cacnk` files are skipped silently; malformed chunk-id stems are
    /// surfaced as an error (pass-fatal per the component design).
    pub fn walk(&self) -> Result<ChunkWalkIter, Error> {
        ChunkWalkIter::new(self.base.clone())
    }
}

impl ChunkStore for LocalChunkStore {
    fn base_path(&self) -> &Path {
        &self.base
    }

    fn get_chunk(&self, id: &ChunkId) -> Result<Vec<u8>, Error> {
        let path = self.chunk_path(id);
        let mut file = fs::File::open(&path)
            .map_err(|err| format_err!("unable to open chunk {id} at {path:?} - {err}"))?;
        let blob = DataBlob::load_from_reader(&mut file)?;
        blob.decode(Some(id.as_bytes()))
    }

    fn remove_chunk(&self, id: &ChunkId) -> Result<(), Error> {
        let path = self.chunk_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => bail!("unable to remove chunk {id} at {path:?} - {err}"),
        }
    }

    fn verify(
        &self,
        parallelism: usize,
        repair: bool,
        progress_sink: &mut dyn FnMut(u8),
    ) -> Result<(), Error> {
        crate::verify::verify_store(self, parallelism, repair, progress_sink)
    }
}

/// Iterator over `(ChunkId, size, mtime)` produced by walking a chunk store's
/// fanout directories, in prefix order.
pub struct ChunkWalkIter {
    base: PathBuf,
    prefix: u32,
    entries: Option<std::vec::IntoIter<std::fs::DirEntry>>,
    pub dir_count: u64,
}

impl ChunkWalkIter {
    fn new(base: PathBuf) -> Result<Self, Error> {
        Ok(ChunkWalkIter {
            base,
            prefix: 0,
            entries: None,
            dir_count: 0,
        })
    }
}

impl Iterator for ChunkWalkIter {
    type Item = Result<(ChunkId, u64, SystemTime), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entries) = &mut self.entries {
                for entry in entries.by_ref() {
                    let name = entry.file_name();
                    let name = match name.to_str() {
                        Some(n) => n,
                        None => continue,
                    };

                    if name.starts_with(TMP_PREFIX) {
                        continue;
                    }

                    let stem = match name.strip_suffix(&format!(".{CHUNK_EXTENSION}")) {
                        Some(stem) => stem,
                        None => continue,
                    };

                    let meta = match entry.metadata() {
                        Ok(meta) => meta,
                        Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                        Err(err) => return Some(Err(err.into())),
                    };
                    if !meta.is_file() {
                        continue;
                    }

                    let id: ChunkId = match stem.parse() {
                        Ok(id) => id,
                        Err(err) => {
                            return Some(Err(format_err!(
                                "malformed chunk file name '{name}' - {err}"
                            )))
                        }
                    };

                    let mtime = match meta.modified() {
                        Ok(mtime) => mtime,
                        Err(err) => return Some(Err(err.into())),
                    };

                    return Some(Ok((id, meta.len(), mtime)));
                }
                self.entries = None;
            }

            if self.prefix >= 0x10000 {
                return None;
            }

            let subdir = self.base.join(format!("{:04x}", self.prefix));
            self.prefix += 1;

            match fs::read_dir(&subdir) {
                Ok(dir) => {
                    let entries: Vec<_> = match dir.collect::<std::io::Result<_>>() {
                        Ok(entries) => entries,
                        Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                        Err(err) => return Some(Err(err.into())),
                    };
                    self.dir_count += 1;
                    self.entries = Some(entries.into_iter());
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    return Some(Err(format_err!(
                        "unable to read chunk subdir {subdir:?} - {err}"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data_blob::DataChunkBuilder;

    fn make_store() -> (tempfile_dir::TempDir, LocalChunkStore) {
        let dir = tempfile_dir::TempDir::new();
        let store = LocalChunkStore::open(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    fn insert(store: &LocalChunkStore, data: &[u8]) -> ChunkId {
        let (blob, digest) = DataChunkBuilder::new(data).build().unwrap();
        let id = ChunkId::from_digest(digest);
        let path = store.chunk_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, blob.raw_data()).unwrap();
        id
    }

    #[test]
    fn round_trip_insert_and_read() {
        let (_dir, store) = make_store();
        let id = insert(&store, b"hello chunk");
        let data = store.get_chunk(&id).unwrap();
        assert_eq!(data, b"hello chunk");
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, store) = make_store();
        let id = insert(&store, b"data");
        store.remove_chunk(&id).unwrap();
        assert!(store.get_chunk(&id).is_err());
        // second removal of an already-gone chunk must not error
        store.remove_chunk(&id).unwrap();
    }

    #[test]
    fn walk_skips_tmp_files() {
        let (_dir, store) = make_store();
        let id = insert(&store, b"real chunk");
        let tmp_dir = store.base_path().join("0000");
        fs::create_dir_all(&tmp_dir).unwrap();
        fs::write(tmp_dir.join(".tmp-upload-xyz"), b"in flight").unwrap();

        let found: Vec<_> = store.walk().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, id);
    }

    #[test]
    fn walk_reports_malformed_name() {
        let (_dir, store) = make_store();
        let bad_dir = store.base_path().join("0000");
        fs::create_dir_all(&bad_dir).unwrap();
        let bad_path = bad_dir.join(format!("not-a-hex-id.{CHUNK_EXTENSION}"));
        fs::write(&bad_path, b"junk").unwrap();
        let result: Result<Vec<_>, _> = store.walk().unwrap().collect();
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod tempfile_dir {
    use std::path::{Path, PathBuf};

    /// Minimal self-cleaning scratch directory, avoiding a dependency on the
    /// `tempfile` crate for a handful of store tests.
    pub struct TempDir(PathBuf);

    impl TempDir {
        pub fn new() -> Self {
            let mut path = std::env::temp_dir();
            let unique = format!(
                "bincache-store-test-{}-{:?}",
                std::process::id(),
                std::thread::current().id()
            );
            path.push(unique);
            let _ = std::fs::remove_dir_all(&path);
            std::fs::create_dir_all(&path).unwrap();
            TempDir(path)
        }

        pub fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}
