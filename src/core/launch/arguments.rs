// ─── Launch Arguments ───
// Legacy `minecraftArguments` merging, placeholder substitution and the
// final JVM + game argument vector.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::core::config::Resolution;
use crate::core::platform::OsFamily;

/// Merge legacy argument strings in chain order.
///
/// Each `-`-prefixed token starts a group that absorbs the following
/// non-dash tokens, so multi-word values stay with their flag. Exact
/// duplicate groups are dropped, keeping the first occurrence.
pub fn merge_legacy_arguments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut groups: Vec<Vec<&str>> = Vec::new();
    for token in fragments.into_iter().flat_map(str::split_whitespace) {
        match groups.last_mut() {
            Some(group) if !token.starts_with('-') => group.push(token),
            _ => groups.push(vec![token]),
        }
    }

    let mut seen = HashSet::new();
    groups
        .into_iter()
        .filter(|group| seen.insert(group.clone()))
        .flatten()
        .map(str::to_string)
        .collect()
}

/// Replace every token that is exactly `${name}` with its table value.
/// Unknown names and empty values leave the token as it was.
pub fn substitute_placeholders(tokens: &mut [String], table: &HashMap<String, String>) {
    for token in tokens.iter_mut() {
        let Some(name) = token
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
        else {
            continue;
        };
        if let Some(value) = table.get(name).filter(|v| !v.is_empty()) {
            *token = value.clone();
        }
    }
}

/// Lookup table for the game-argument placeholders the launcher fills in.
pub fn standard_placeholders(
    version_name: &str,
    game_dir: &Path,
    assets_root: &Path,
    assets_index_name: Option<&str>,
) -> HashMap<String, String> {
    let mut table = HashMap::new();
    table.insert("version_name".to_string(), version_name.to_string());
    table.insert(
        "game_directory".to_string(),
        game_dir.to_string_lossy().to_string(),
    );
    table.insert(
        "assets_root".to_string(),
        assets_root.to_string_lossy().to_string(),
    );
    if let Some(index) = assets_index_name {
        table.insert("assets_index_name".to_string(), index.to_string());
    }
    table.insert("auth_access_token".to_string(), format!("FML:{}", version_name));
    table.insert("version_type".to_string(), "release".to_string());
    table.insert("user_properties".to_string(), "{}".to_string());
    table.insert("profile_properties".to_string(), "{}".to_string());
    table
}

/// Window mode appended after the game arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Fullscreen,
    Windowed(Resolution),
}

/// macOS dock identity.
#[derive(Debug, Clone)]
pub struct DockIdentity {
    pub name: String,
    pub icon: PathBuf,
}

/// Assembles the full process argument vector.
#[derive(Debug, Clone)]
pub struct LaunchArgumentBuilder {
    os: OsFamily,
    memory_mb: u32,
    jvm_args: Vec<String>,
    natives_dir: Option<PathBuf>,
    launcher_identity: Option<(String, String)>,
    agent_jar: Option<PathBuf>,
    classpath: String,
    dock: Option<DockIdentity>,
    main_class: String,
    game_args: Vec<String>,
    display: DisplayMode,
}

impl LaunchArgumentBuilder {
    pub fn new(os: OsFamily, main_class: impl Into<String>, classpath: impl Into<String>) -> Self {
        Self {
            os,
            memory_mb: 2048,
            jvm_args: Vec::new(),
            natives_dir: None,
            launcher_identity: None,
            agent_jar: None,
            classpath: classpath.into(),
            dock: None,
            main_class: main_class.into(),
            game_args: Vec::new(),
            display: DisplayMode::Windowed(Resolution::default()),
        }
    }

    pub fn memory_mb(mut self, memory_mb: u32) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn jvm_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.jvm_args.extend(args);
        self
    }

    pub fn natives_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.natives_dir = Some(dir.into());
        self
    }

    pub fn launcher_identity(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.launcher_identity = Some((name.into(), version.into()));
        self
    }

    pub fn agent_jar(mut self, jar: Option<PathBuf>) -> Self {
        self.agent_jar = jar;
        self
    }

    /// Only emitted on macOS.
    pub fn dock(mut self, dock: DockIdentity) -> Self {
        self.dock = Some(dock);
        self
    }

    pub fn game_args(mut self, args: Vec<String>) -> Self {
        self.game_args = args;
        self
    }

    pub fn display(mut self, display: DisplayMode) -> Self {
        self.display = display;
        self
    }

    pub fn build(self) -> Vec<String> {
        let mut args = vec![
            format!("-Xms{}M", self.memory_mb),
            format!("-Xmx{}M", self.memory_mb),
        ];
        args.extend(self.jvm_args);

        if let Some(natives) = &self.natives_dir {
            args.push(format!("-Djava.library.path={}", natives.to_string_lossy()));
        }
        if let Some((name, version)) = &self.launcher_identity {
            args.push(format!("-Dlauncher.name={}", name));
            args.push(format!("-Dlauncher.version={}", version));
        }
        if let Some(agent) = &self.agent_jar {
            args.push(format!("-javaagent:{}", agent.to_string_lossy()));
        }

        args.push("-cp".to_string());
        args.push(self.classpath);

        if self.os == OsFamily::Osx {
            if let Some(dock) = &self.dock {
                args.push(format!("-Xdock:name={}", dock.name));
                args.push(format!("-Xdock:icon={}", dock.icon.to_string_lossy()));
            }
        }

        args.push(self.main_class);
        args.extend(self.game_args);

        match self.display {
            DisplayMode::Fullscreen => {
                args.push("--fullscreen".to_string());
                args.push("true".to_string());
            }
            DisplayMode::Windowed(resolution) => {
                args.push("--width".to_string());
                args.push(resolution.width.to_string());
                args.push("--height".to_string());
                args.push(resolution.height.to_string());
            }
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_keep_their_multi_word_values() {
        let merged = merge_legacy_arguments(["--username Steve --title My Tune Client --demo"]);
        assert_eq!(
            merged,
            vec!["--username", "Steve", "--title", "My", "Tune", "Client", "--demo"]
        );
    }

    #[test]
    fn duplicate_groups_are_dropped_in_first_seen_order() {
        let merged = merge_legacy_arguments([
            "--username ${auth_player_name} --version ${version_name}",
            "--tweakClass optifine.OptiFineTweaker",
            "--username ${auth_player_name} --tweakClass tune.Tweaker",
        ]);
        assert_eq!(
            merged,
            vec![
                "--username",
                "${auth_player_name}",
                "--version",
                "${version_name}",
                "--tweakClass",
                "optifine.OptiFineTweaker",
                "--tweakClass",
                "tune.Tweaker",
            ]
        );
    }

    #[test]
    fn unresolved_placeholder_survives() {
        // Second chain member declares no arguments.
        let chain_args: Vec<&str> = vec!["--username ${auth_player_name}"];
        let mut tokens = merge_legacy_arguments(chain_args);
        let table = standard_placeholders("tune", Path::new("/game"), Path::new("/assets"), None);
        substitute_placeholders(&mut tokens, &table);
        assert_eq!(tokens, vec!["--username", "${auth_player_name}"]);
    }

    #[test]
    fn known_placeholders_are_replaced() {
        let mut tokens = merge_legacy_arguments([
            "--version ${version_name} --accessToken ${auth_access_token} --assetIndex ${assets_index_name} --userProperties ${user_properties}",
        ]);
        let table = standard_placeholders(
            "tune_client",
            Path::new("/game"),
            Path::new("/assets"),
            Some("1.8"),
        );
        substitute_placeholders(&mut tokens, &table);
        assert_eq!(
            tokens,
            vec![
                "--version",
                "tune_client",
                "--accessToken",
                "FML:tune_client",
                "--assetIndex",
                "1.8",
                "--userProperties",
                "{}",
            ]
        );
    }

    #[test]
    fn empty_values_leave_the_token() {
        let mut tokens = vec!["${assets_index_name}".to_string()];
        let mut table = HashMap::new();
        table.insert("assets_index_name".to_string(), String::new());
        substitute_placeholders(&mut tokens, &table);
        assert_eq!(tokens, vec!["${assets_index_name}"]);
    }

    #[test]
    fn runtime_flags_are_ordered() {
        let args = LaunchArgumentBuilder::new(OsFamily::Osx, "net.minecraft.client.main.Main", "/v/1.8.9.jar:/l/a.jar")
            .memory_mb(4096)
            .jvm_args(vec!["-XX:+UseG1GC".to_string()])
            .natives_dir("/natives/v1_8")
            .launcher_identity("Tune Client Launcher", "0.1.0")
            .agent_jar(Some(PathBuf::from("/v/1.8.9-agent.jar")))
            .dock(DockIdentity {
                name: "Tune Client".into(),
                icon: PathBuf::from("/assets/minecraft.icns"),
            })
            .game_args(vec!["--username".into(), "Steve".into()])
            .display(DisplayMode::Fullscreen)
            .build();

        assert_eq!(
            args,
            vec![
                "-Xms4096M",
                "-Xmx4096M",
                "-XX:+UseG1GC",
                "-Djava.library.path=/natives/v1_8",
                "-Dlauncher.name=Tune Client Launcher",
                "-Dlauncher.version=0.1.0",
                "-javaagent:/v/1.8.9-agent.jar",
                "-cp",
                "/v/1.8.9.jar:/l/a.jar",
                "-Xdock:name=Tune Client",
                "-Xdock:icon=/assets/minecraft.icns",
                "net.minecraft.client.main.Main",
                "--username",
                "Steve",
                "--fullscreen",
                "true",
            ]
        );
    }

    #[test]
    fn windowed_mode_appends_resolution_and_skips_dock_elsewhere() {
        let args = LaunchArgumentBuilder::new(OsFamily::Linux, "Main", "cp")
            .dock(DockIdentity {
                name: "x".into(),
                icon: PathBuf::from("/i"),
            })
            .display(DisplayMode::Windowed(Resolution {
                width: 854,
                height: 480,
            }))
            .build();
        assert!(!args.iter().any(|a| a.starts_with("-Xdock")));
        assert_eq!(&args[args.len() - 4..], ["--width", "854", "--height", "480"]);
    }
}
