// ─── Manifest Resolution ───
// Distribution document -> primary manifest -> `inheritsFrom` ancestors,
// returned root-first.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

use super::manifest::{Distribution, LibraryEntry, VersionManifest};

/// Token in fetched documents that stands for the artifact mirror root.
pub const ROOT_URL_PLACEHOLDER: &str = "{LIBRARIES_ROOT_URL}";

/// Where manifest documents come from.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> LauncherResult<String>;
}

/// Fetches documents over HTTP with the launcher's shared client.
pub struct HttpManifestSource {
    client: Client,
}

impl HttpManifestSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    async fn fetch_text(&self, url: &str) -> LauncherResult<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Replace every root-URL placeholder in `raw` with `root_url`.
pub fn substitute_placeholders(raw: &str, root_url: &str) -> String {
    raw.replace(ROOT_URL_PLACEHOLDER, root_url)
}

/// `base` + `/` + `path` without doubling the separator.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ─── Chain ───

#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub id: String,
    pub manifest: VersionManifest,
}

/// Version manifests ordered root-first: the deepest ancestor first, the
/// requested version last. Ids are unique.
#[derive(Debug, Clone)]
pub struct ManifestChain {
    entries: Vec<ChainEntry>,
}

impl ManifestChain {
    /// Build a chain from root-first entries. Duplicate ids are rejected.
    pub fn new(entries: Vec<ChainEntry>) -> LauncherResult<Self> {
        let mut seen = HashSet::new();
        for (position, entry) in entries.iter().enumerate() {
            if !seen.insert(entry.id.as_str()) {
                return Err(LauncherError::CyclicInheritance {
                    version: entry.id.clone(),
                    chain: entries[..position].iter().map(|e| e.id.clone()).collect(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn manifests(&self) -> impl Iterator<Item = &VersionManifest> {
        self.entries.iter().map(|e| &e.manifest)
    }

    pub fn get(&self, id: &str) -> Option<&VersionManifest> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.manifest)
    }

    /// The version the launch was requested for.
    pub fn requested(&self) -> Option<&ChainEntry> {
        self.entries.last()
    }

    /// Manifest supplying the game archives, asset index and logging config:
    /// the one keyed by the game version, else the chain root.
    pub fn game_manifest(&self, mc_version: &str) -> Option<&VersionManifest> {
        self.get(mc_version)
            .or_else(|| self.entries.first().map(|e| &e.manifest))
    }

    /// Main class from the requested version, else its nearest ancestor.
    pub fn main_class(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find_map(|e| e.manifest.main_class.as_deref())
            .filter(|class| !class.is_empty())
    }

    /// Every library declared along the chain, in chain order.
    pub fn libraries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.iter().flat_map(|e| e.manifest.libraries.iter())
    }

    /// Legacy argument strings, in chain order, skipping members without one.
    pub fn legacy_arguments(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter_map(|e| e.manifest.minecraft_arguments.as_deref())
    }
}

/// Distribution plus its resolved chain.
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub id: String,
    pub distribution: Distribution,
    pub chain: ManifestChain,
}

// ─── Resolver ───

pub struct ManifestResolver<'a> {
    source: &'a dyn ManifestSource,
    root_url: String,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(source: &'a dyn ManifestSource, root_url: impl Into<String>) -> Self {
        Self {
            source,
            root_url: root_url.into(),
        }
    }

    /// Resolve `version` all-or-nothing: any fetch or parse failure aborts.
    pub async fn resolve(&self, version: &str) -> LauncherResult<ResolvedVersion> {
        let distribution = self.fetch_distribution(version).await?;
        let chain = self.resolve_chain(version, &distribution).await?;

        info!(
            version,
            chain = ?chain.ids().collect::<Vec<_>>(),
            "Resolved manifest chain"
        );

        Ok(ResolvedVersion {
            id: version.to_string(),
            distribution,
            chain,
        })
    }

    pub async fn fetch_distribution(&self, version: &str) -> LauncherResult<Distribution> {
        let url = join_url(&self.root_url, &format!("{}.json", version));
        self.fetch_document(&url).await
    }

    /// Walk `inheritsFrom` from the distribution's primary manifest upwards.
    /// A parent that is already part of the chain fails with
    /// [`LauncherError::CyclicInheritance`].
    pub async fn resolve_chain(
        &self,
        version: &str,
        distribution: &Distribution,
    ) -> LauncherResult<ManifestChain> {
        let primary: VersionManifest = self.fetch_document(&distribution.version_attributes).await?;

        let mut discovered = vec![ChainEntry {
            id: version.to_string(),
            manifest: primary,
        }];
        let mut visited: HashSet<String> = HashSet::from([version.to_string()]);

        while let Some(parent) = discovered
            .last()
            .and_then(|e| e.manifest.inherits_from.clone())
        {
            if !visited.insert(parent.clone()) {
                return Err(LauncherError::CyclicInheritance {
                    version: parent,
                    chain: discovered.iter().map(|e| e.id.clone()).collect(),
                });
            }

            let url = join_url(&self.root_url, &format!("versions/{}.json", parent));
            debug!("Fetching inherited manifest {} from {}", parent, url);
            let manifest: VersionManifest = self.fetch_document(&url).await?;
            discovered.push(ChainEntry {
                id: parent,
                manifest,
            });
        }

        discovered.reverse();
        ManifestChain::new(discovered)
    }

    async fn fetch_document<T: DeserializeOwned>(&self, url: &str) -> LauncherResult<T> {
        let raw = self
            .source
            .fetch_text(url)
            .await
            .map_err(|e| LauncherError::ManifestFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let substituted = substitute_placeholders(&raw, &self.root_url);
        serde_json::from_str(&substituted).map_err(|e| LauncherError::ManifestFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
