use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::archive::{extract_zip, ZipFilter};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::libraries::NativeArchive;

/// Unpack every native archive into `natives_dir`.
///
/// Files already present are left alone and excluded prefixes are never
/// written, so running this again over the same archives changes nothing.
/// An archive that is missing or unreadable is logged and skipped.
pub async fn extract_natives(archives: &[NativeArchive], natives_dir: &Path) -> LauncherResult<usize> {
    tokio::fs::create_dir_all(natives_dir)
        .await
        .map_err(|e| LauncherError::io(natives_dir, e))?;

    let mut extracted = 0;
    for native in archives {
        if !native.archive.exists() {
            warn!("Native archive {:?} is missing, skipping", native.archive);
            continue;
        }

        let native = native.clone();
        let dest: PathBuf = natives_dir.to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            extract_zip(
                &native.archive,
                &dest,
                ZipFilter {
                    exclude: &native.exclude,
                    skip_existing: true,
                },
            )
            .map(|count| (native.archive, count))
        })
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?;

        match result {
            Ok((archive, count)) => {
                debug!("Extracted {} native files from {:?}", count, archive);
                extracted += count;
            }
            Err(e) => warn!("Cannot extract native archive: {}", e),
        }
    }

    Ok(extracted)
}
