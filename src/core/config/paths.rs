use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

const COMMON_DIR_NAME: &str = ".tuneclient";

/// Shared data directory, e.g. `~/.tuneclient`.
pub fn default_common_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(COMMON_DIR_NAME)
}

/// The game's own working directory, matching the vanilla launcher location.
pub fn default_game_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minecraft")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minecraft")
    }
}

/// On-disk layout under the common data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    /// `assets/indexes/<major>.json`
    pub fn asset_index_path(&self, mc_version_major: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{}.json", mc_version_major))
    }

    /// `assets/<section>/<hash prefix>/<hash>`
    pub fn asset_object_path(&self, section: &str, hash: &str) -> PathBuf {
        let prefix = hash.get(..2).unwrap_or(hash);
        self.assets_dir().join(section).join(prefix).join(hash)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn client_jar(&self, mc_version: &str) -> PathBuf {
        self.versions_dir().join(format!("{}.jar", mc_version))
    }

    pub fn agent_jar(&self, mc_version: &str) -> PathBuf {
        self.versions_dir().join(format!("{}-agent.jar", mc_version))
    }

    /// Natives are extracted per requested version.
    pub fn natives_dir(&self, version: &str) -> PathBuf {
        self.root.join("natives").join(version)
    }

    pub fn java_dir(&self) -> PathBuf {
        self.root.join("java")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Create the directory skeleton used by the validation stages.
    pub fn ensure_dirs(&self) -> LauncherResult<()> {
        for dir in [
            self.assets_dir().join("indexes"),
            self.libraries_dir(),
            self.versions_dir(),
            self.java_dir(),
            self.config_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|source| LauncherError::io(&dir, source))?;
        }
        Ok(())
    }
}
