mod model;
mod paths;

pub use model::{
    GameSettings, JavaSettings, LauncherConfig, LauncherSettings, Resolution,
    DEFAULT_ARTIFACT_ROOT_URL, DEFAULT_DOWNLOAD_CONCURRENCY, DEFAULT_GAME_VERSION,
};
pub use paths::{default_common_dir, default_game_dir, DataLayout};
