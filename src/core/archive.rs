// ─── Archive Extraction ───
// Blocking helpers; async callers run them under `spawn_blocking`.

use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Filters applied while unpacking a zip archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipFilter<'a> {
    /// Entries whose archive path starts with one of these are skipped.
    pub exclude: &'a [String],
    /// Leave destination files that already exist untouched.
    pub skip_existing: bool,
}

impl ZipFilter<'_> {
    fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// Unpack `archive_path` into `dest`. Returns the number of files written.
///
/// Entries that would escape `dest` are ignored.
pub fn extract_zip(archive_path: &Path, dest: &Path, filter: ZipFilter<'_>) -> LauncherResult<usize> {
    let file = File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if filter.is_excluded(&name) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            debug!("Ignoring unsafe zip entry {:?} in {:?}", name, archive_path);
            continue;
        };

        let out_path = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if filter.skip_existing && out_path.exists() {
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
        written += 1;
    }

    Ok(written)
}

/// Unpack a gzip-compressed tarball into `dest`.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;
    Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .map_err(|e| LauncherError::io(dest, e))
}
