use crate::{Error, Result};
use std::path::Path;

/// Renames attempted before giving up on a destination held open elsewhere.
#[cfg(not(unix))]
const RENAME_ATTEMPTS: u32 = 5;

#[cfg(not(unix))]
const RENAME_BACKOFF: std::time::Duration = std::time::Duration::from_millis(100);

/// Moves a fully written staging file to its final path in one rename,
/// replacing whatever was there. Parent directories are created first.
///
/// `src` and `dest` must live on the same filesystem.
pub fn place_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Write {
            path:   parent.to_path_buf(),
            source: e,
        })?;
    }

    let rename_err = |e| Error::Rename {
        from:   src.to_path_buf(),
        to:     dest.to_path_buf(),
        source: e,
    };

    #[cfg(unix)]
    {
        std::fs::rename(src, dest).map_err(rename_err)
    }

    // Scanners and indexers briefly hold files open on Windows; renaming over
    // them fails with a sharing violation until they let go.
    #[cfg(not(unix))]
    {
        let mut attempts = 0;
        loop {
            match std::fs::rename(src, dest) {
                Ok(()) => return Ok(()),
                Err(e) if !src.exists() => return Err(rename_err(e)),
                Err(e) => {
                    attempts += 1;
                    if attempts >= RENAME_ATTEMPTS {
                        return Err(rename_err(e));
                    }
                    std::thread::sleep(RENAME_BACKOFF * attempts);
                }
            }
        }
    }
}
