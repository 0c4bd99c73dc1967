use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launcher core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Manifests ───────────────────────────────────────
    #[error("Failed to fetch manifest {url}: {reason}")]
    ManifestFetch { url: String, reason: String },

    #[error("Cyclic inheritance: {version} is already part of the chain [{}]", chain.join(" -> "))]
    CyclicInheritance { version: String, chain: Vec<String> },

    #[error("Manifest not present in the resolved chain: {0}")]
    MissingManifest(String),

    // ── Libraries ───────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Java ────────────────────────────────────────────
    #[error("Java runtime error: {0}")]
    JavaRuntime(String),

    #[error("Failed to start game process: {0}")]
    ProcessLaunch(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Wrap an IO error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_inheritance_message_lists_the_chain() {
        let err = LauncherError::CyclicInheritance {
            version: "1.8.9".into(),
            chain: vec!["tune-1.8.9".into(), "1.8.9".into()],
        };
        assert_eq!(
            err.to_string(),
            "Cyclic inheritance: 1.8.9 is already part of the chain [tune-1.8.9 -> 1.8.9]"
        );
    }
}
