use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Error};

use crate::index::Index;

/// Contract the GC and index walk consume from the index layer.
pub trait IndexStore: Send + Sync {
    /// Filesystem root holding index files.
    fn base_path(&self) -> &Path;

    /// Deserialise one index, addressed relative to `base_path()`.
    fn get_index(&self, relative_path: &Path) -> Result<Index, Error>;
}

/// File-system backed index store. Indices are stored as JSON sidecars next to
/// the `.nar`/`.narinfo` artifact they describe.
pub struct LocalIndexStore {
    base: PathBuf,
}

impl LocalIndexStore {
    pub fn open<P: Into<PathBuf>>(base: P) -> Result<Self, Error> {
        let base = base.into();
        if !base.is_absolute() {
            bail!("expected absolute path - got {base:?}");
        }
        if let Err(err) = fs::metadata(&base) {
            bail!("unable to open index store at {base:?} - {err}");
        }
        Ok(LocalIndexStore { base })
    }
}

impl IndexStore for LocalIndexStore {
    fn base_path(&self) -> &Path {
        &self.base
    }

    fn get_index(&self, relative_path: &Path) -> Result<Index, Error> {
        let path = self.base.join(relative_path);
        let data = fs::read(&path)
            .map_err(|err| anyhow::format_err!("unable to read index {path:?} - {err}"))?;
        serde_json::from_slice(&data)
            .map_err(|err| anyhow::format_err!("unable to parse index {path:?} - {err}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::IndexChunk;
    use crate::ChunkId;

    #[test]
    fn round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!(
            "bincache-index-store-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let store = LocalIndexStore::open(dir.clone()).unwrap();
        let index = Index::new(vec![IndexChunk {
            id: ChunkId::from_digest([9; 32]),
            length: 42,
            offset: 0,
        }]);
        fs::write(dir.join("a.nar"), serde_json::to_vec(&index).unwrap()).unwrap();

        let loaded = store.get_index(Path::new("a.nar")).unwrap();
        assert_eq!(loaded.chunks().len(), 1);
        assert_eq!(loaded.chunks()[0].length, 42);

        let _ = fs::remove_dir_all(&dir);
    }
}
