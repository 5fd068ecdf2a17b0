use std::sync::Arc;
use std::path::Path;
use std::{fs, fmt, io};

use crate::error::{Error, Result};

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A snapshot of a directory tree, in walk order: every directory appears
/// before its contents. Hidden entries are included; links are followed and
/// links to nothing are left out.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub metadata: fs::Metadata,
    pub depth: usize,
}

#[derive(Default, Debug)]
struct FsMetadata(Option<fs::Metadata>);

impl FsTree {
    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::build_with(root.as_ref(), |_, _| Ok(()))
    }

    /// Walks `root`, calling `callback` with each entry as soon as it is
    /// inserted. A missing or unreadable root, or any entry that can't be
    /// read during the walk, is a [`Kind::File`](crate::error::Kind::File)
    /// error.
    pub fn build_with<P, F>(root: P, mut callback: F) -> Result<Self>
        where P: AsRef<Path>,
              F: FnMut(&Self, EntryId) -> Result<()>,
    {
        use jwalk::WalkDirGeneric;

        let root = root.as_ref();
        fs::metadata(root).map_err(|e| Error::file(e, root))?;

        let walker = WalkDirGeneric::<FsMetadata>::new(root)
            .skip_hidden(false)
            .follow_links(true)
            .sort(true)
            .process_read_dir(|_, _, _, entries| {
                entries.iter_mut()
                    .filter_map(|e| e.as_mut().ok())
                    .for_each(|e| e.client_state = FsMetadata(e.metadata().ok()))
            });

        let mut tree = FsTree { entries: vec![] };
        for entry in walker.into_iter() {
            let mut entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.path().map_or(false, is_dangling) => {
                    tracing::debug!(path = ?e.path(), "skipping dangling link");
                    continue;
                }
                Err(e) => return Err(walk_error(&e, root)),
            };

            // The root's metadata isn't gathered by `process_read_dir`.
            let metadata = match entry.client_state.0.take() {
                Some(metadata) => metadata,
                None => match fs::metadata(entry.path()) {
                    Ok(metadata) => metadata,
                    Err(_) if is_dangling(&entry.path()) => continue,
                    Err(e) => return Err(Error::file(e, entry.path())),
                },
            };

            let id = tree.insert(entry, metadata);
            callback(&tree, id)?;
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    fn insert(&mut self, entry: jwalk::DirEntry<FsMetadata>, metadata: fs::Metadata) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(Entry {
            id,
            metadata,
            depth: entry.depth,
            path: Arc::from(entry.path().into_boxed_path()),
        });

        id
    }
}

/// Whether `path` is a link whose target doesn't exist.
fn is_dangling(path: &Path) -> bool {
    let is_link = fs::symlink_metadata(path).map_or(false, |m| m.file_type().is_symlink());
    is_link && fs::metadata(path).is_err()
}

/// Converts a walk failure, keeping the OS error code when there is one.
fn walk_error(error: &jwalk::Error, root: &Path) -> Error {
    let path = error.path().unwrap_or(root);
    let io_error = match error.io_error() {
        Some(e) => match e.raw_os_error() {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::new(e.kind(), e.to_string()),
        },
        None => io::Error::new(io::ErrorKind::Other, error.to_string()),
    };

    Error::file(io_error, path)
}

impl Entry {
    /// Path relative to the root tree of `self`.
    pub fn relative_path(&self) -> &Path {
        let mut components = self.path.components();
        for _ in 0..(self.path.components().count() - self.depth) {
            components.next();
        }

        components.as_path()
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl jwalk::ClientState for FsMetadata {
    type ReadDirState = ();
    type DirEntryState = Self;
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
