//! Archive restorer.
//!
//! Extracts a backup archive into a scoped temporary directory, locates the
//! profile folder inside it (the writer guarantees exactly one top-level
//! folder per profile), then replaces the destination directory with it.
//! The temporary directory is cleaned up on every exit path. Replacement is
//! destructive: an existing destination is removed wholesale, no merging.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::ZipArchive;

use crate::error::{EngineError, EngineResult};
use crate::events::{CancelToken, EventSender};
use crate::fs_utils::copy_dir_recursive;

const PROGRESS_EVERY: usize = 50;

/// Restore the archive at `archive_path` into `dest`.
///
/// `dest` is the final profile directory, e.g. `<base>/<folder-name>`. If it
/// already exists it is removed first, so a mid-operation failure can leave
/// it absent or partially populated; the error message tells the caller the
/// live directory was touched.
pub fn restore_backup(
    archive_path: &Path,
    dest: &Path,
    events: &EventSender,
    cancel: &CancelToken,
) -> EngineResult<()> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    if dest.exists() {
        log::info!("removing existing destination {}", dest.display());
        fs::remove_dir_all(dest)?;
    }

    let scratch = TempDir::new()?;
    extract_archive(archive_path, scratch.path(), events, cancel)?;

    let profile_root = first_directory(scratch.path())?.ok_or(EngineError::NoProfileFolderFound)?;

    events.log("Copying into profile folder …".to_string());
    log::info!(
        "copying {} -> {}",
        profile_root.display(),
        dest.display()
    );
    copy_dir_recursive(&profile_root, dest)?;

    events.progress(100);
    Ok(())
}

/// Extract every entry of the archive under `target`, skipping entries whose
/// names would escape it.
fn extract_archive(
    archive_path: &Path,
    target: &Path,
    events: &EventSender,
    cancel: &CancelToken,
) -> EngineResult<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let total = archive.len();
    events.log(format!("Extracting {} entries …", total));

    for index in 0..total {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut entry = archive.by_index(index)?;
        let Some(rel) = entry.enclosed_name() else {
            log::warn!("skipping archive entry with unsafe name: {}", entry.name());
            continue;
        };
        let out_path = target.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
        }

        let done = index + 1;
        if done % PROGRESS_EVERY == 0 {
            let percent = (done * 100 / total) as u8;
            if percent < 100 {
                events.progress(percent);
            }
        }
    }

    Ok(())
}

/// First directory entry directly under `root`, if any.
fn first_directory(root: &Path) -> io::Result<Option<PathBuf>> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
