pub mod manifest;
pub mod resolver;
pub mod rules;

pub use manifest::{
    ClientLogging, Distribution, DistributionData, DistributionVersion, ExtractRules,
    FileDownload, LibraryDownloads, LibraryEntry, LoggingSection, NativeClassifier, OsSelector,
    Rule, RuleAction, VersionManifest,
};
pub use resolver::{
    join_url, substitute_placeholders, ChainEntry, HttpManifestSource, ManifestChain,
    ManifestResolver, ManifestSource, ResolvedVersion, ROOT_URL_PLACEHOLDER,
};
