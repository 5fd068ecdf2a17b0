use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fstree::FsTree;

/// Extensions of files treated as content.
pub const CONTENT_EXTS: [&str; 2] = ["md", "html"];

/// Lists every content file under `content_root`, mirroring its directory
/// structure under `dest_root` along the way.
///
/// Each subdirectory of `content_root` is created under `dest_root` before
/// any of its contents are visited. Only files with an extension in
/// [`CONTENT_EXTS`] are returned, in walk order; everything else is ignored.
/// Directory creation is idempotent, so scanning twice is harmless.
///
/// A missing `content_root` is a [`Kind::File`](crate::error::Kind::File)
/// error and nothing is created.
pub fn scan(content_root: &Path, dest_root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = vec![];
    FsTree::build_with(content_root, |tree, id| {
        let entry = &tree[id];
        if entry.depth == 0 {
            return Ok(());
        }

        if entry.metadata.is_dir() {
            let mirror = dest_root.join(entry.relative_path());
            fs::create_dir_all(&mirror).map_err(|e| Error::file(e, &mirror))?;
            tracing::trace!(dir = %mirror.display(), "mirrored");
        } else if entry.metadata.is_file() && is_content(&entry.path) {
            files.push(entry.path.to_path_buf());
        }

        Ok(())
    })?;

    tracing::debug!(root = %content_root.display(), files = files.len(), "scanned");
    Ok(files)
}

fn is_content(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| CONTENT_EXTS.contains(&ext))
}
