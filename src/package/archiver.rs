use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub size_bytes: u64,
}

/// Zip every regular file under `source_dir` into `dest_file`.
///
/// Entry names are `/`-separated paths relative to `source_dir`. Symlinks
/// are not followed. The zip is written beside `dest_file` and renamed over
/// it once complete; an empty folder gives an archive with no entries.
pub fn archive(source_dir: &Path, dest_file: &Path) -> Result<ArchiveSummary> {
    let start = Instant::now();

    if !fs::metadata(source_dir)?.is_dir() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", source_dir.display()),
        )));
    }

    // Readers holding the previous archive open keep reading it intact
    let partial = partial_path(dest_file);
    let written = write_zip(source_dir, &partial).and_then(|entries| {
        fs::rename(&partial, dest_file)?;
        Ok(entries)
    });
    let entries = written.inspect_err(|_| {
        if let Err(e) = fs::remove_file(&partial) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Could not remove {}: {}", partial.display(), e);
            }
        }
    })?;

    let size_bytes = fs::metadata(dest_file)?.len();
    tracing::info!(
        "Archived {} files from {} into {} ({} bytes) in {:?}",
        entries,
        source_dir.display(),
        dest_file.display(),
        size_bytes,
        start.elapsed()
    );

    Ok(ArchiveSummary { entries, size_bytes })
}

fn write_zip(source_dir: &Path, dest_file: &Path) -> Result<usize> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest_file)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0;

    for entry in WalkDir::new(source_dir).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        zip.start_file(entry_name(relative), options)?;
        let mut file = File::open(entry.path())?;
        io::copy(&mut file, &mut zip)?;
        entries += 1;
    }

    zip.finish()?.flush()?;
    Ok(entries)
}

/// `<dir>/.<name>.partial`
fn partial_path(dest_file: &Path) -> PathBuf {
    let name = dest_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest_file.with_file_name(format!(".{}.partial", name))
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
