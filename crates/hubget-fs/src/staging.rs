use std::fs::OpenOptions;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Hidden directory under the destination root that holds in-progress state.
pub const STAGING_DIR: &str = ".hubget";

const INCOMPLETE_DIR: &str = "incomplete";
const PART_SUFFIX: &str = ".part";
const CHECKPOINT_SUFFIX: &str = ".part.json";

/// Rejects remote paths that would land outside the destination root or inside
/// the staging area.
pub fn validate_relative(rel: &str) -> Result<&Path> {
    let unsafe_path = || Error::UnsafePath(rel.to_string());
    if rel.is_empty() || rel.contains('\\') || rel.contains('\0') {
        return Err(unsafe_path());
    }
    let path = Path::new(rel);
    for (i, component) in path.components().enumerate() {
        match component {
            Component::Normal(name) if i == 0 && name == STAGING_DIR => return Err(unsafe_path()),
            Component::Normal(_) => {}
            _ => return Err(unsafe_path()),
        }
    }
    Ok(path)
}

/// Partial-download layout for one destination root.
///
/// Every remote file `a/b.bin` has a pre-sized data file
/// `{root}/.hubget/incomplete/a/b.bin.part` and a checkpoint next to it. Nothing
/// in here is ever visible under a final file name.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dest_root: PathBuf,
    root:      PathBuf,
}

impl StagingArea {
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        let dest_root = dest_root.into();
        let root = dest_root.join(STAGING_DIR).join(INCOMPLETE_DIR);
        Self { dest_root, root }
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Final location of a remote file.
    pub fn destination(&self, rel: &str) -> Result<PathBuf> {
        Ok(self.dest_root.join(validate_relative(rel)?))
    }

    pub fn part_path(&self, rel: &str) -> Result<PathBuf> {
        let rel = validate_relative(rel)?;
        Ok(with_suffix(&self.root.join(rel), PART_SUFFIX))
    }

    pub fn checkpoint_path(&self, rel: &str) -> Result<PathBuf> {
        let rel = validate_relative(rel)?;
        Ok(with_suffix(&self.root.join(rel), CHECKPOINT_SUFFIX))
    }

    /// Creates the part file if needed and sizes it to `size` bytes without
    /// touching bytes already written.
    pub fn prepare_part(&self, rel: &str, size: u64) -> Result<PathBuf> {
        let path = self.part_path(rel)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Write {
                path:   parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::Write {
                path:   path.clone(),
                source: e,
            })?;
        file.set_len(size).map_err(|e| Error::Write {
            path:   path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Removes the part file and checkpoint of `rel`, if any.
    pub fn discard(&self, rel: &str) -> Result<()> {
        for path in [self.part_path(rel)?, self.checkpoint_path(rel)?] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Write { path, source: e }),
            }
        }
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}
