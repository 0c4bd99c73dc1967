mod artifact;
mod batch;
mod client;

pub use artifact::{retain_unverified, Artifact, ContentHasher, ExpectedHash};
pub use batch::{ArtifactFailure, BatchReport, BatchTracker};
pub use client::Downloader;
