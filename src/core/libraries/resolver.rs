// ─── Library Resolution ───
// Manifest chain + distribution overrides -> classpath map, native archives
// to extract, and the artifacts that back both.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::downloader::Artifact;
use crate::core::platform::Platform;
use crate::core::version::rules::{is_allowed, native_classifier};
use crate::core::version::{Distribution, LibraryEntry, ManifestChain};

use super::coordinate::LibraryCoordinate;

/// Archive entries under these prefixes are never extracted unless a library
/// declares its own exclusions.
pub const DEFAULT_NATIVE_EXCLUDES: &[&str] = &["META-INF/"];

/// Override key -> jar path. A re-inserted key keeps its original position
/// and takes the new path.
#[derive(Debug, Clone, Default)]
pub struct ClasspathMap {
    order: Vec<String>,
    paths: HashMap<String, PathBuf>,
}

impl ClasspathMap {
    pub fn insert(&mut self, key: String, path: PathBuf) -> Option<PathBuf> {
        if !self.paths.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.paths.insert(key, path)
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.paths.get(key).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Paths in first-insertion order of their keys.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.order
            .iter()
            .filter_map(|key| self.paths.get(key).map(PathBuf::as_path))
    }
}

/// A native-library archive to unpack into the natives directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArchive {
    pub archive: PathBuf,
    pub exclude: Vec<String>,
}

/// Everything the library stage needs to download and extract.
#[derive(Debug, Clone, Default)]
pub struct LibraryPlan {
    pub classpath: ClasspathMap,
    pub natives: Vec<NativeArchive>,
    /// Backing artifacts for the classpath winners and native archives,
    /// unique by destination.
    pub artifacts: Vec<Artifact>,
}

pub struct LibraryResolver<'a> {
    platform: &'a Platform,
    libraries_dir: PathBuf,
}

impl<'a> LibraryResolver<'a> {
    pub fn new(platform: &'a Platform, libraries_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            libraries_dir: libraries_dir.into(),
        }
    }

    /// Libraries from every manifest in chain order, then the distribution's
    /// overrides. Later entries with the same override key win.
    pub fn resolve(&self, chain: &ManifestChain, distribution: &Distribution) -> LibraryPlan {
        let entries = chain
            .libraries()
            .chain(distribution.version_data.libraries.iter());
        self.resolve_entries(entries)
    }

    pub fn resolve_entries<'e>(
        &self,
        entries: impl IntoIterator<Item = &'e LibraryEntry>,
    ) -> LibraryPlan {
        let mut classpath = ClasspathMap::default();
        let mut classpath_artifacts: HashMap<String, Artifact> = HashMap::new();
        let mut natives = Vec::new();
        let mut native_artifacts = Vec::new();

        for entry in entries {
            if !is_allowed(entry.rules.as_deref(), entry.natives.as_ref(), self.platform.os) {
                debug!("Skipping {} (rules exclude {})", entry.name, self.platform.os);
                continue;
            }
            let Some(downloads) = entry.downloads.as_ref() else {
                debug!("Skipping {} (no downloads)", entry.name);
                continue;
            };
            let coordinate = match LibraryCoordinate::parse(&entry.name) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Skipping library: {}", e);
                    continue;
                }
            };

            match entry.natives.as_ref() {
                None => {
                    let relative = downloads
                        .artifact
                        .as_ref()
                        .and_then(|a| a.path.as_deref())
                        .map(PathBuf::from)
                        .unwrap_or_else(|| coordinate.relative_path());
                    let destination = self.libraries_dir.join(relative);
                    let key = coordinate.override_key();

                    match downloads
                        .artifact
                        .as_ref()
                        .and_then(|a| a.to_artifact(&destination))
                    {
                        Some(artifact) => {
                            classpath_artifacts.insert(key.clone(), artifact);
                        }
                        None => {
                            classpath_artifacts.remove(&key);
                        }
                    }
                    classpath.insert(key, destination);
                }
                Some(native_map) => {
                    let Some(classifier) = native_classifier(native_map, self.platform) else {
                        debug!("Skipping {} (no natives for {:?})", entry.name, self.platform);
                        continue;
                    };
                    let Some(download) = downloads.classifiers.get(&classifier) else {
                        debug!("Skipping {} (no classifier {})", entry.name, classifier);
                        continue;
                    };

                    let relative = download.path.as_deref().map(PathBuf::from).unwrap_or_else(|| {
                        LibraryCoordinate {
                            classifier: Some(classifier.clone()),
                            ..coordinate.clone()
                        }
                        .relative_path()
                    });
                    let destination = self.libraries_dir.join(relative);
                    let Some(artifact) = download.to_artifact(&destination) else {
                        continue;
                    };

                    let exclude = match entry.extract.as_ref() {
                        Some(rules) if !rules.exclude.is_empty() => rules.exclude.clone(),
                        _ => DEFAULT_NATIVE_EXCLUDES.iter().map(|s| s.to_string()).collect(),
                    };
                    natives.push(NativeArchive {
                        archive: destination,
                        exclude,
                    });
                    native_artifacts.push(artifact);
                }
            }
        }

        let mut seen = HashSet::new();
        let artifacts = classpath
            .keys()
            .filter_map(|key| classpath_artifacts.remove(key))
            .chain(native_artifacts)
            .filter(|a| seen.insert(a.destination().to_path_buf()))
            .collect();

        LibraryPlan {
            classpath,
            natives,
            artifacts,
        }
    }
}
