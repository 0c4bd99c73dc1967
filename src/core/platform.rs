// ─── Host Platform ───
// OS / architecture names in the vocabulary used by version manifests.

use std::fmt;

/// Operating system family as spelled in manifest rules and `natives` maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Osx,
    Linux,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::Osx
        } else {
            OsFamily::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Osx => "osx",
            OsFamily::Linux => "linux",
        }
    }

    /// Java classpath separator for this OS.
    pub fn classpath_separator(&self) -> &'static str {
        match self {
            OsFamily::Windows => ";",
            _ => ":",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The platform a launch runs on. Passed explicitly so rule evaluation can be
/// exercised for any host in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OsFamily,
    /// Architecture label (`x64`, `arm64`, `arm`, ...).
    pub arch: String,
}

impl Platform {
    pub fn new(os: OsFamily, arch: impl Into<String>) -> Self {
        Self {
            os,
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::new(OsFamily::current(), current_arch_label())
    }

    /// Value substituted for `${arch}` in native classifiers (`x64` -> `64`).
    pub fn arch_bitness_token(&self) -> String {
        self.arch.replacen('x', "", 1)
    }
}

fn current_arch_label() -> String {
    match std::env::consts::ARCH {
        "x86_64" | "x86" => "x64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitness_token_strips_the_x() {
        assert_eq!(Platform::new(OsFamily::Windows, "x64").arch_bitness_token(), "64");
        assert_eq!(Platform::new(OsFamily::Linux, "arm64").arch_bitness_token(), "arm64");
        assert_eq!(Platform::new(OsFamily::Linux, "xx64").arch_bitness_token(), "x64");
    }

    #[test]
    fn separators_follow_the_os() {
        assert_eq!(OsFamily::Windows.classpath_separator(), ";");
        assert_eq!(OsFamily::Osx.classpath_separator(), ":");
        assert_eq!(OsFamily::Linux.to_string(), "linux");
    }
}
