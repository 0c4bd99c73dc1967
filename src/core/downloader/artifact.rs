use std::path::{Path, PathBuf};

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::core::error::{LauncherError, LauncherResult};

/// Expected content hash of an artifact. MD5 takes precedence when a
/// document declares both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedHash {
    Md5(String),
    Sha1(String),
}

impl ExpectedHash {
    /// Pick the hash to verify against from optional MD5 / SHA-1 fields.
    pub fn from_fields(md5: Option<&str>, sha1: Option<&str>) -> Option<Self> {
        match (md5, sha1) {
            (Some(md5), _) if !md5.is_empty() => Some(ExpectedHash::Md5(md5.to_string())),
            (_, Some(sha1)) if !sha1.is_empty() => Some(ExpectedHash::Sha1(sha1.to_string())),
            _ => None,
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            ExpectedHash::Md5(_) => "md5",
            ExpectedHash::Sha1(_) => "sha1",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ExpectedHash::Md5(value) | ExpectedHash::Sha1(value) => value,
        }
    }

    /// Hex digest of `bytes` under this hash's algorithm.
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            ExpectedHash::Md5(_) => hex::encode(Md5::digest(bytes)),
            ExpectedHash::Sha1(_) => hex::encode(Sha1::digest(bytes)),
        }
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.digest(bytes).eq_ignore_ascii_case(self.value())
    }

    /// Incremental hasher for checking a body while it streams to disk.
    pub fn hasher(&self) -> ContentHasher {
        match self {
            ExpectedHash::Md5(_) => ContentHasher::Md5(Md5::new()),
            ExpectedHash::Sha1(_) => ContentHasher::Sha1(Sha1::new()),
        }
    }
}

pub enum ContentHasher {
    Md5(Md5),
    Sha1(Sha1),
}

impl ContentHasher {
    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            ContentHasher::Md5(h) => h.update(chunk),
            ContentHasher::Sha1(h) => h.update(chunk),
        }
    }

    pub fn finalize_hex(self) -> String {
        match self {
            ContentHasher::Md5(h) => hex::encode(h.finalize()),
            ContentHasher::Sha1(h) => hex::encode(h.finalize()),
        }
    }
}

/// One downloadable file and whether it is known to be satisfied on disk.
#[derive(Debug, Clone)]
pub struct Artifact {
    url: String,
    destination: PathBuf,
    size: Option<u64>,
    hash: Option<ExpectedHash>,
    complete: bool,
}

impl Artifact {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            size: None,
            hash: None,
            complete: false,
        }
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_hash(mut self, hash: Option<ExpectedHash>) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_sha1(self, sha1: Option<&str>) -> Self {
        self.with_hash(ExpectedHash::from_fields(None, sha1))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn expected_hash(&self) -> Option<&ExpectedHash> {
        self.hash.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    /// Check the destination against the expected hash and record the result.
    ///
    /// The digest is recomputed from disk on every call, so a file that was
    /// truncated or edited since the last launch is reported as unsatisfied.
    pub fn verify(&mut self) -> bool {
        let verified = match &self.hash {
            None => true,
            Some(hash) => match std::fs::read(&self.destination) {
                Ok(bytes) => hash.matches(&bytes),
                Err(_) => false,
            },
        };
        self.complete = verified;
        verified
    }
}

/// Verify a set of artifacts off the async runtime and keep the ones that
/// still need downloading.
pub async fn retain_unverified(artifacts: Vec<Artifact>) -> LauncherResult<Vec<Artifact>> {
    tokio::task::spawn_blocking(move || {
        artifacts
            .into_iter()
            .filter_map(|mut artifact| if artifact.verify() { None } else { Some(artifact) })
            .collect()
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))
}
