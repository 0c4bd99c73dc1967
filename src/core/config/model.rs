use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::paths::{default_common_dir, default_game_dir};

pub const DEFAULT_ARTIFACT_ROOT_URL: &str = "https://velbit.app/public/";
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 25;
pub const DEFAULT_GAME_VERSION: &str = "v1_8";

const MIN_MEMORY_MB: u32 = 2048;
const MAX_MEMORY_MB: u32 = 8192;

/// Launcher configuration. Every section defaults independently, so a file
/// that only sets `java.memory_mb` keeps the rest of the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub java: JavaSettings,
    pub game: GameSettings,
    pub launcher: LauncherSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaSettings {
    pub memory_mb: u32,
    pub jvm_args: Vec<String>,
    /// Explicit Java binary. When set, no runtime is provisioned.
    pub java_path: Option<PathBuf>,
}

impl Default for JavaSettings {
    fn default() -> Self {
        Self {
            memory_mb: 2048,
            jvm_args: [
                "-XX:+UnlockExperimentalVMOptions",
                "-XX:+UseG1GC",
                "-XX:G1NewSizePercent=20",
                "-XX:G1ReservePercent=20",
                "-XX:MaxGCPauseMillis=50",
                "-XX:G1HeapRegionSize=32M",
                "-XX:-DisableExplicitGC",
                "-Xmn128M",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            java_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub resolution: Resolution,
    pub fullscreen: bool,
    /// Start the game in its own process group so it outlives the launcher.
    pub detached: bool,
    /// Distribution identifier launched by default.
    pub version: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            fullscreen: false,
            detached: true,
            version: DEFAULT_GAME_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Game working directory (`.minecraft` equivalent).
    pub game_dir: PathBuf,
    /// Shared data directory holding assets, libraries, versions, natives and JREs.
    pub common_dir: PathBuf,
    /// Mirror root substituted for `{LIBRARIES_ROOT_URL}` in fetched documents.
    pub artifact_root_url: String,
    pub download_concurrency: usize,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            game_dir: default_game_dir(),
            common_dir: default_common_dir(),
            artifact_root_url: DEFAULT_ARTIFACT_ROOT_URL.to_string(),
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
        }
    }
}

impl LauncherConfig {
    /// Read the configuration file at `path`.
    ///
    /// A missing file yields the defaults. A malformed one is reported and
    /// replaced by the defaults rather than aborting the launch.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(LauncherError::io(path, e)),
        };

        match serde_json::from_str::<LauncherConfig>(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to read configuration {:?} ({}), resetting to defaults", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Heap size passed to `-Xms`/`-Xmx`, clamped to what the host can offer.
    pub fn effective_memory_mb(&self) -> u32 {
        clamp_memory(self.java.memory_mb, host_memory_mb())
    }
}

fn clamp_memory(requested: u32, host_mb: u64) -> u32 {
    let ceiling = (host_mb.min(MAX_MEMORY_MB as u64) as u32).max(MIN_MEMORY_MB);
    requested.clamp(MIN_MEMORY_MB, ceiling)
}

fn host_memory_mb() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    bytes_to_mib(system.total_memory())
}

/// JVM `M` suffixes are mebibytes.
fn bytes_to_mib(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_memory_is_counted_in_mebibytes() {
        // 16 GiB as reported by the OS
        assert_eq!(bytes_to_mib(17_179_869_184), 16_384);
        assert_eq!(bytes_to_mib(1024 * 1024 - 1), 0);
        assert_eq!(clamp_memory(8_192, bytes_to_mib(4 * 1024 * 1024 * 1024)), 4_096);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let config: LauncherConfig =
            serde_json::from_str(r#"{ "java": { "memory_mb": 4096 }, "game": { "fullscreen": true } }"#)
                .unwrap();

        assert_eq!(config.java.memory_mb, 4096);
        assert!(config.java.jvm_args.contains(&"-XX:+UseG1GC".to_string()));
        assert!(config.game.fullscreen);
        assert_eq!(config.game.resolution, Resolution::default());
        assert_eq!(config.launcher.download_concurrency, DEFAULT_DOWNLOAD_CONCURRENCY);
    }

    #[test]
    fn missing_or_malformed_file_falls_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let missing = LauncherConfig::load(&temp.path().join("nope.json")).unwrap();
        assert_eq!(missing.java.memory_mb, 2048);

        let broken = temp.path().join("launcher_config.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let loaded = LauncherConfig::load(&broken).unwrap();
        assert_eq!(loaded.launcher.artifact_root_url, DEFAULT_ARTIFACT_ROOT_URL);
    }

    #[test]
    fn memory_is_clamped_to_host_and_bounds() {
        assert_eq!(clamp_memory(1024, 16_000), 2048);
        assert_eq!(clamp_memory(12_000, 16_000), 8192);
        assert_eq!(clamp_memory(6000, 4000), 4000);
        assert_eq!(clamp_memory(4096, 1000), 2048);
    }
}
