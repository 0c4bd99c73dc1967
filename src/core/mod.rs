// ─── Tune Launcher Core ───
// Prepares and launches the game client from a chain of version manifests.
//
// Architecture:
//   core/
//     version/   : Distribution + manifest chain, OS rules
//     downloader/: Verified artifacts, bounded-concurrency batches
//     libraries/ : Coordinates, override merging, natives selection
//     assets/    : Asset index + object downloads
//     java/      : Zulu JRE provisioning
//     launch/    : Classpath, arguments, natives, process supervision
//     config/    : Settings file + on-disk layout
//     launcher   : Stage orchestration

pub mod archive;
pub mod assets;
pub mod config;
pub mod context;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod java;
pub mod launch;
pub mod launcher;
pub mod libraries;
pub mod platform;
pub mod version;

pub use context::LaunchContext;
pub use error::{LauncherError, LauncherResult};
pub use events::{EventSink, LaunchEvent, LaunchStage};
pub use launcher::{LaunchOutcome, Launcher, PreparedLaunch};

/// Reported to the game through `-Dlauncher.name`.
pub const LAUNCHER_NAME: &str = "Tune Client Launcher";
pub const LAUNCHER_NAME_SHORT: &str = "TuneLauncher";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");
