use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::config::DataLayout;
use crate::core::downloader::{retain_unverified, Artifact, BatchReport, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::{join_url, FileDownload};

/// Content-addressed object host.
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Asset index: section name -> (logical path -> object).
///
/// Sections that are not object maps (`"map_to_resources": true`) are kept
/// as raw values and ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct AssetIndex {
    sections: BTreeMap<String, AssetSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AssetSection {
    Objects(BTreeMap<String, AssetObject>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl AssetIndex {
    /// Object sections in name order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, AssetObject>)> {
        self.sections.iter().filter_map(|(name, section)| match section {
            AssetSection::Objects(objects) => Some((name.as_str(), objects)),
            AssetSection::Other(_) => None,
        })
    }

    pub fn object_count(&self) -> usize {
        self.sections().map(|(_, objects)| objects.len()).sum()
    }
}

/// Validates the asset index and every object it lists.
pub struct AssetValidator<'a> {
    layout: &'a DataLayout,
    downloader: &'a Downloader,
    resources_url: String,
}

impl<'a> AssetValidator<'a> {
    pub fn new(layout: &'a DataLayout, downloader: &'a Downloader) -> Self {
        Self {
            layout,
            downloader,
            resources_url: RESOURCES_URL.to_string(),
        }
    }

    pub fn with_resources_url(mut self, url: impl Into<String>) -> Self {
        self.resources_url = url.into();
        self
    }

    /// Ensure the index and its objects are on disk. One batch per section
    /// with anything left to download.
    pub async fn validate(
        &self,
        index_download: &FileDownload,
        mc_version_major: &str,
    ) -> LauncherResult<Vec<BatchReport>> {
        let index = self.load_index(index_download, mc_version_major).await?;
        info!(
            "Asset index {} lists {} objects",
            mc_version_major,
            index.object_count()
        );

        let mut reports = Vec::new();
        for (section, objects) in index.sections() {
            let artifacts = self.object_artifacts(section, objects);
            let pending = retain_unverified(artifacts).await?;
            if pending.is_empty() {
                debug!("Assets for {} are up to date", section);
                continue;
            }

            info!("Downloading {} assets for {}...", pending.len(), section);
            let report = self
                .downloader
                .submit(&format!("Assets ({})", section), pending)
                .await;
            if !report.is_success() {
                warn!("{} asset downloads failed for {}", report.failures.len(), section);
            }
            reports.push(report);
        }

        Ok(reports)
    }

    /// Artifacts for every object in a section, unique by destination.
    /// Objects whose hash is not a SHA-1 hex digest are skipped.
    pub fn object_artifacts(
        &self,
        section: &str,
        objects: &BTreeMap<String, AssetObject>,
    ) -> Vec<Artifact> {
        let mut seen = HashSet::new();
        objects
            .iter()
            .filter(|(name, object)| {
                if is_sha1_hex(&object.hash) {
                    true
                } else {
                    warn!("Skipping asset {} with malformed hash {:?}", name, object.hash);
                    false
                }
            })
            .map(|(_, object)| object)
            .filter(|object| seen.insert(object.hash.as_str()))
            .map(|object| {
                let prefix = &object.hash[..2];
                Artifact::new(
                    join_url(&self.resources_url, &format!("{}/{}", prefix, object.hash)),
                    self.layout.asset_object_path(section, &object.hash),
                )
                .with_size(object.size)
                .with_sha1(Some(&object.hash))
            })
            .collect()
    }

    /// Read the cached index if it verifies and parses, else fetch it.
    async fn load_index(
        &self,
        index_download: &FileDownload,
        mc_version_major: &str,
    ) -> LauncherResult<AssetIndex> {
        let index_path = self.layout.asset_index_path(mc_version_major);
        let artifact = index_download.to_artifact(&index_path).ok_or_else(|| {
            LauncherError::Other(format!("Asset index {} has no download URL", mc_version_major))
        })?;

        if !retain_unverified(vec![artifact.clone()]).await?.is_empty() {
            return self.fetch_index(artifact).await;
        }

        match read_index(&index_path).await {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!("Cached asset index {:?} is unreadable ({}), refetching", index_path, e);
                self.fetch_index(artifact).await
            }
        }
    }

    async fn fetch_index(&self, artifact: Artifact) -> LauncherResult<AssetIndex> {
        let url = artifact.url().to_string();
        let path = artifact.destination().to_path_buf();
        let report = self.downloader.submit("Asset index", vec![artifact]).await;
        if let Some(failure) = report.failures.first() {
            return Err(LauncherError::ManifestFetch {
                url,
                reason: failure.reason.clone(),
            });
        }
        read_index(&path).await
    }
}

async fn read_index(path: &Path) -> LauncherResult<AssetIndex> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

fn is_sha1_hex(hash: &str) -> bool {
    hash.len() == 40 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventSink;

    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    #[test]
    fn non_object_sections_are_ignored() {
        let index: AssetIndex = serde_json::from_str(&format!(
            r#"{{ "map_to_resources": true,
                  "objects": {{ "minecraft/sounds/a.ogg": {{ "hash": "{h}", "size": 5 }},
                                "minecraft/sounds/b.ogg": {{ "hash": "{h}", "size": 5 }} }} }}"#,
            h = HELLO_SHA1
        ))
        .unwrap();

        let sections: Vec<_> = index.sections().map(|(name, _)| name).collect();
        assert_eq!(sections, vec!["objects"]);
        assert_eq!(index.object_count(), 2);
    }

    #[test]
    fn objects_are_content_addressed_and_deduplicated() {
        let index: AssetIndex = serde_json::from_str(&format!(
            r#"{{ "objects": {{ "a": {{ "hash": "{h}", "size": 5 }}, "b": {{ "hash": "{h}", "size": 5 }} }} }}"#,
            h = HELLO_SHA1
        ))
        .unwrap();

        let layout = DataLayout::new("/data");
        let downloader = Downloader::new(reqwest::Client::new(), EventSink::disabled());
        let validator = AssetValidator::new(&layout, &downloader);
        let (section, objects) = index.sections().next().unwrap();
        let artifacts = validator.object_artifacts(section, objects);

        assert_eq!(artifacts.len(), 1);
        assert_eq!(
            artifacts[0].url(),
            format!("https://resources.download.minecraft.net/aa/{}", HELLO_SHA1)
        );
        assert_eq!(
            artifacts[0].destination(),
            Path::new("/data/assets/objects/aa").join(HELLO_SHA1)
        );
    }

    #[test]
    fn malformed_hashes_are_skipped() {
        let index: AssetIndex = serde_json::from_str(&format!(
            r#"{{ "objects": {{ "good": {{ "hash": "{h}", "size": 5 }},
                                "accent": {{ "hash": "a\u00e9{pad}", "size": 5 }},
                                "escape": {{ "hash": "../../../../etc/passwd", "size": 5 }},
                                "short": {{ "hash": "aa", "size": 5 }} }} }}"#,
            h = HELLO_SHA1,
            pad = "0".repeat(37)
        ))
        .unwrap();

        let layout = DataLayout::new("/data");
        let downloader = Downloader::new(reqwest::Client::new(), EventSink::disabled());
        let validator = AssetValidator::new(&layout, &downloader);
        let (section, objects) = index.sections().next().unwrap();
        let artifacts = validator.object_artifacts(section, objects);

        assert_eq!(artifacts.len(), 1);
        assert_eq!(
            artifacts[0].destination(),
            Path::new("/data/assets/objects/aa").join(HELLO_SHA1)
        );
    }

    #[tokio::test]
    async fn downloads_index_then_missing_objects() {
        let mut server = mockito::Server::new_async().await;
        let index_body = format!(
            r#"{{ "objects": {{ "icons/icon_16x16.png": {{ "hash": "{}", "size": 5 }} }} }}"#,
            HELLO_SHA1
        );
        let index_mock = server
            .mock("GET", "/indexes/1.8.json")
            .with_status(200)
            .with_body(&index_body)
            .expect(1)
            .create_async()
            .await;
        let object_mock = server
            .mock("GET", format!("/aa/{}", HELLO_SHA1).as_str())
            .with_status(200)
            .with_body("hello")
            .expect(1)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(temp.path());
        let downloader = Downloader::new(reqwest::Client::new(), EventSink::disabled());
        let validator = AssetValidator::new(&layout, &downloader).with_resources_url(server.url());
        let index_download = FileDownload {
            url: Some(format!("{}/indexes/1.8.json", server.url())),
            ..FileDownload::default()
        };

        let reports = validator.validate(&index_download, "1.8").await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_success());
        assert!(layout.asset_object_path("objects", HELLO_SHA1).is_file());

        // Second run: index has no hash so it is read from disk, object verifies.
        let reports = validator.validate(&index_download, "1.8").await.unwrap();
        assert!(reports.is_empty());

        index_mock.assert_async().await;
        object_mock.assert_async().await;
    }
}
