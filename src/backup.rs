//! Archive writer.
//!
//! Streams a set of profile directories into one deflate-compressed zip
//! archive. Entry names are relative to each profile's *parent* directory so
//! the profile folder name itself is the first path component of every entry;
//! the restorer depends on that to recover the folder name.
//!
//! A first pass counts files to establish the progress denominator, then a
//! second pass writes them. Progress is reported every 50 files and a final
//! 100 is always emitted. On failure the partially-written archive is left
//! in place and the caller is told via the error; on cancellation the partial
//! archive is removed before returning.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{EngineError, EngineResult};
use crate::events::{CancelToken, EventSender};
use crate::fs_utils::count_files;

const PROGRESS_EVERY: u64 = 50;

/// Archive-internal entry name for a file, relative to `root`, with forward
/// slashes regardless of platform.
fn entry_name(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Write `sources` (one directory per profile) into a zip at `archive_path`.
pub fn write_backup(
    sources: &[PathBuf],
    archive_path: &Path,
    events: &EventSender,
    cancel: &CancelToken,
) -> EngineResult<()> {
    let mut total = 0;
    for source in sources {
        total += count_files(source)?;
    }
    events.log(format!("Backing up {} files …", total));
    log::info!(
        "backing up {} files from {} profile(s) to {}",
        total,
        sources.len(),
        archive_path.display()
    );

    let result = write_entries(sources, archive_path, total, events, cancel);
    match result {
        Ok(()) => {
            events.progress(100);
            Ok(())
        }
        Err(EngineError::Cancelled) => {
            // Nobody wants a half-written archive after an explicit cancel.
            let _ = fs::remove_file(archive_path);
            Err(EngineError::Cancelled)
        }
        Err(e) => Err(e),
    }
}

fn write_entries(
    sources: &[PathBuf],
    archive_path: &Path,
    total: u64,
    events: &EventSender,
    cancel: &CancelToken,
) -> EngineResult<()> {
    let file = File::create(archive_path)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    if total == 0 {
        events.progress(0);
        writer.finish()?;
        return Ok(());
    }

    let mut done = 0u64;
    for source in sources {
        // Entries are named relative to the profile's parent directory.
        let root = source.parent().unwrap_or(source);

        for entry in WalkDir::new(source) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let Some(name) = entry_name(entry.path(), root) else {
                continue;
            };
            writer.start_file(name, options)?;
            let mut reader = File::open(entry.path())?;
            io::copy(&mut reader, &mut writer)?;

            done += 1;
            if done % PROGRESS_EVERY == 0 {
                let percent = (done * 100 / total) as u8;
                // The unconditional trailing 100 is the only 100 we emit.
                if percent < 100 {
                    events.progress(percent);
                }
            }
        }
    }

    writer.finish()?;
    Ok(())
}
