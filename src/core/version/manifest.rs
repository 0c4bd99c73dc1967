// ─── Version Documents ───
// Typed view of the distribution document and the version manifests it
// inherits from. Every optional field is explicit so a missing key is a
// `None`, never a silent default deep inside the resolvers.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::downloader::{Artifact, ExpectedHash};

/// One version manifest (`<id>.json`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    /// Named archives, e.g. `client` and `agent`.
    #[serde(default)]
    pub downloads: BTreeMap<String, FileDownload>,
    #[serde(default)]
    pub asset_index: Option<FileDownload>,
    /// Asset index name substituted for `${assets_index_name}`.
    #[serde(default)]
    pub assets: Option<String>,
    /// Legacy space-separated game arguments.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
}

impl VersionManifest {
    pub fn download(&self, name: &str) -> Option<&FileDownload> {
        self.downloads.get(name)
    }

    pub fn client_logging(&self) -> Option<&ClientLogging> {
        self.logging.as_ref()?.client.as_ref()
    }
}

/// A downloadable file as it appears in manifests: `downloads.client`,
/// `assetIndex`, a library artifact or classifier, a logging config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileDownload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Path relative to the libraries directory (library downloads only).
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
}

impl FileDownload {
    pub fn expected_hash(&self) -> Option<ExpectedHash> {
        ExpectedHash::from_fields(self.md5.as_deref(), self.sha1.as_deref())
    }

    /// Artifact for this download at `destination`, or `None` without a URL.
    pub fn to_artifact(&self, destination: &Path) -> Option<Artifact> {
        let url = self.url.as_deref().filter(|u| !u.is_empty())?;
        Some(
            Artifact::new(url, destination)
                .with_size(self.size)
                .with_hash(self.expected_hash()),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub client: Option<ClientLogging>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientLogging {
    /// JVM flag template, with `${path}` standing for the config file.
    #[serde(default)]
    pub argument: Option<String>,
    #[serde(default)]
    pub file: Option<FileDownload>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

// ─── Libraries ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    /// Coordinate `group:name:version[:classifier]`.
    pub name: String,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    /// OS name -> classifier (or architecture -> classifier).
    #[serde(default)]
    pub natives: Option<BTreeMap<String, NativeClassifier>>,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<FileDownload>,
    #[serde(default)]
    pub classifiers: BTreeMap<String, FileDownload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NativeClassifier {
    Single(String),
    PerArch(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsSelector>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
    #[serde(other)]
    Unknown,
}

/// `os` as either a bare name (`"osx"`) or Mojang's `{ "name": "osx" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OsSelector {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        arch: Option<String>,
    },
}

impl OsSelector {
    pub fn name(&self) -> Option<&str> {
        match self {
            OsSelector::Name(name) => Some(name),
            OsSelector::Detailed { name, .. } => name.as_deref(),
        }
    }
}

// ─── Distribution ───

/// Root document of a client build (`<root>/<version>.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct Distribution {
    pub version: DistributionVersion,
    pub client_name: String,
    /// URL of the primary version manifest.
    pub version_attributes: String,
    #[serde(default)]
    pub version_data: DistributionData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistributionVersion {
    pub mc_version: String,
    pub mc_version_major: String,
    #[serde(default)]
    pub jre_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributionData {
    /// Libraries that override anything the manifest chain declares.
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
}

impl Distribution {
    /// `client_name` lowercased with runs of spaces collapsed to `_`.
    pub fn version_name(&self) -> String {
        self.client_name
            .split(' ')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_legacy_manifest() {
        let manifest: VersionManifest = serde_json::from_str(
            r#"{
                "id": "1.8.9",
                "mainClass": "net.minecraft.client.main.Main",
                "minecraftArguments": "--username ${auth_player_name}",
                "assets": "1.8",
                "assetIndex": { "id": "1.8", "url": "https://x/1.8.json", "sha1": "abc", "size": 10 },
                "downloads": { "client": { "url": "https://x/client.jar", "sha1": "def", "size": 20 } },
                "logging": { "client": { "argument": "-Dlog4j.configurationFile=${path}",
                    "file": { "id": "client-1.7.xml", "url": "https://x/l.xml", "sha1": "01", "size": 1 },
                    "type": "log4j2-xml" } },
                "libraries": [
                    { "name": "org.lwjgl:lwjgl:2.9.4",
                      "rules": [ { "action": "allow" }, { "action": "disallow", "os": { "name": "osx" } } ] },
                    { "name": "tv.twitch:twitch-platform:6.5",
                      "natives": { "windows": "natives-windows-${arch}", "linux": { "x64": "natives-linux", "default": "natives-linux-any" } },
                      "rules": [ { "action": "disallow", "os": "osx" } ] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.inherits_from, None);
        assert_eq!(manifest.download("client").unwrap().size, Some(20));
        assert_eq!(
            manifest.client_logging().unwrap().file.as_ref().unwrap().id.as_deref(),
            Some("client-1.7.xml")
        );

        let rules = manifest.libraries[0].rules.as_ref().unwrap();
        assert!(rules[0].os.is_none());
        assert_eq!(rules[1].os.as_ref().unwrap().name(), Some("osx"));

        let twitch = &manifest.libraries[1];
        assert_eq!(twitch.rules.as_ref().unwrap()[0].os.as_ref().unwrap().name(), Some("osx"));
        let natives = twitch.natives.as_ref().unwrap();
        assert!(matches!(natives.get("windows"), Some(NativeClassifier::Single(_))));
        assert!(matches!(natives.get("linux"), Some(NativeClassifier::PerArch(_))));
    }

    #[test]
    fn unknown_rule_actions_do_not_fail_parsing() {
        let rule: Rule = serde_json::from_str(r#"{ "action": "maybe", "os": "linux" }"#).unwrap();
        assert_eq!(rule.action, RuleAction::Unknown);
    }

    #[test]
    fn download_without_url_has_no_artifact() {
        let download = FileDownload {
            sha1: Some("abc".into()),
            ..FileDownload::default()
        };
        assert!(download.to_artifact(Path::new("/tmp/x")).is_none());
    }

    #[test]
    fn version_name_is_slugged() {
        let distribution: Distribution = serde_json::from_str(
            r#"{ "version": { "mc_version": "1.8.9", "mc_version_major": "1.8" },
                 "client_name": "Tune  Client 1.8",
                 "version_attributes": "https://x/tune.json" }"#,
        )
        .unwrap();
        assert_eq!(distribution.version_name(), "tune_client_1.8");
        assert!(distribution.version_data.libraries.is_empty());
    }
}
