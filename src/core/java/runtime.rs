// ─── Java Runtime Provisioning ───
// Resolves a Zulu JRE build from the Azul metadata API, installs it under
// `java/<build>` when missing and locates its launcher binary.

use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::archive::{extract_tar_gz, extract_zip, ZipFilter};
use crate::core::config::DataLayout;
use crate::core::downloader::{Artifact, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::{OsFamily, Platform};

pub const AZUL_METADATA_URL: &str = "https://api.azul.com/metadata/v1/zulu/packages";

/// Major version used when a distribution does not name one.
pub const DEFAULT_JRE_VERSION: &str = "8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    pub fn for_os(os: OsFamily) -> Self {
        match os {
            OsFamily::Windows => ArchiveKind::Zip,
            _ => ArchiveKind::TarGz,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => ".zip",
            ArchiveKind::TarGz => ".tar.gz",
        }
    }

    fn query_value(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }
}

/// One downloadable JRE package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaBuild {
    /// Archive file name without its extension; also the install directory.
    pub name: String,
    pub archive: ArchiveKind,
    pub download_url: String,
    pub java_version: String,
    pub size: Option<u64>,
    pub package_uuid: String,
}

impl JavaBuild {
    pub fn archive_file_name(&self) -> String {
        format!("{}{}", self.name, self.archive.extension())
    }
}

/// An installed runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaRuntime {
    /// JRE home (the directory holding `bin/` and `lib/`).
    pub home: PathBuf,
    pub binary: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ZuluPackage {
    package_uuid: String,
    name: String,
    download_url: String,
}

#[derive(Debug, Deserialize)]
struct ZuluPackageDetail {
    #[serde(default)]
    size: Option<u64>,
}

/// Azul's name for the OS.
pub fn azul_os(os: OsFamily) -> &'static str {
    match os {
        OsFamily::Windows => "windows",
        OsFamily::Osx => "macos",
        OsFamily::Linux => "linux",
    }
}

/// Azul's name for the CPU family.
pub fn azul_arch(arch: &str) -> &'static str {
    match arch {
        "x64" | "x86_64" => "x64",
        "arm64" | "aarch64" | "arm" => "arm",
        _ => "x86",
    }
}

fn java_exe(os: OsFamily) -> &'static str {
    match os {
        OsFamily::Windows => "javaw.exe",
        _ => "java",
    }
}

pub struct JavaProvisioner<'a> {
    client: &'a Client,
    layout: &'a DataLayout,
    downloader: &'a Downloader,
    platform: &'a Platform,
    metadata_url: String,
}

impl<'a> JavaProvisioner<'a> {
    pub fn new(
        client: &'a Client,
        layout: &'a DataLayout,
        downloader: &'a Downloader,
        platform: &'a Platform,
    ) -> Self {
        Self {
            client,
            layout,
            downloader,
            platform,
            metadata_url: AZUL_METADATA_URL.to_string(),
        }
    }

    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    /// Latest GA JRE (with JavaFX) for `java_version` on this platform.
    pub async fn resolve_build(&self, java_version: &str) -> LauncherResult<JavaBuild> {
        let archive = ArchiveKind::for_os(self.platform.os);
        let base = self.metadata_url.trim_end_matches('/');
        let list_url = format!("{}/", base);

        let response = self
            .client
            .get(&list_url)
            .query(&[
                ("availability_types", "ca"),
                ("java_version", java_version),
                ("os", azul_os(self.platform.os)),
                ("arch", azul_arch(&self.platform.arch)),
                ("archive_type", archive.query_value()),
                ("javafx_bundled", "true"),
                ("release_status", "ga"),
                ("java_package_features", "fx"),
                ("latest", "true"),
                ("java_package_type", "jre"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LauncherError::DownloadFailed {
                url: list_url,
                status: response.status().as_u16(),
            });
        }
        let packages: Vec<ZuluPackage> = response.json().await?;
        let package = packages.into_iter().last().ok_or_else(|| {
            LauncherError::JavaRuntime(format!(
                "No JRE {} package for {}/{}",
                java_version,
                azul_os(self.platform.os),
                azul_arch(&self.platform.arch)
            ))
        })?;

        let detail_url = format!("{}/{}", base, package.package_uuid);
        let detail: ZuluPackageDetail = self
            .client
            .get(&detail_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let name = package
            .name
            .strip_suffix(archive.extension())
            .or_else(|| package.name.strip_suffix(ArchiveKind::Zip.extension()))
            .unwrap_or(&package.name)
            .to_string();

        Ok(JavaBuild {
            name,
            archive,
            download_url: package.download_url,
            java_version: java_version.to_string(),
            size: detail.size,
            package_uuid: package.package_uuid,
        })
    }

    /// Where `build` lives once installed.
    pub fn install_dir(&self, build: &JavaBuild) -> PathBuf {
        self.layout.java_dir().join(&build.name)
    }

    /// Install `build` if its binary is missing and return the runtime.
    pub async fn ensure(&self, build: &JavaBuild) -> LauncherResult<JavaRuntime> {
        let install_dir = self.install_dir(build);
        if let Some(runtime) = self.locate(&install_dir) {
            debug!("Using installed JRE at {:?}", runtime.home);
            return Ok(runtime);
        }

        info!("Java not found, downloading {}...", build.name);
        let java_dir = self.layout.java_dir();
        let archive_path = java_dir.join(build.archive_file_name());
        let report = self
            .downloader
            .submit(
                "Java",
                vec![Artifact::new(&build.download_url, &archive_path).with_size(build.size)],
            )
            .await;
        if let Some(failure) = report.failures.first() {
            return Err(LauncherError::JavaRuntime(format!(
                "Cannot download {}: {}",
                build.download_url, failure.reason
            )));
        }

        let kind = build.archive;
        let (archive, dest) = (archive_path.clone(), java_dir.clone());
        tokio::task::spawn_blocking(move || match kind {
            ArchiveKind::Zip => extract_zip(&archive, &dest, ZipFilter::default()).map(|_| ()),
            ArchiveKind::TarGz => extract_tar_gz(&archive, &dest),
        })
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;

        tokio::fs::remove_file(&archive_path)
            .await
            .map_err(|e| LauncherError::io(&archive_path, e))?;

        let runtime = self.locate(&install_dir).ok_or_else(|| {
            LauncherError::JavaRuntime(format!("No Java binary in {:?} after extraction", install_dir))
        })?;
        ensure_executable(&runtime.binary)?;
        info!("Installed JRE {} at {:?}", build.name, runtime.home);
        Ok(runtime)
    }

    fn locate(&self, install_dir: &Path) -> Option<JavaRuntime> {
        let binary = locate_java_binary(install_dir, self.platform.os)?;
        let home = binary.parent()?.parent()?.to_path_buf();
        Some(JavaRuntime { home, binary })
    }
}

/// `bin/<java>` first, then the macOS bundle layout, then anywhere below.
pub fn locate_java_binary(runtime_root: &Path, os: OsFamily) -> Option<PathBuf> {
    let exe = java_exe(os);
    let primary = runtime_root.join("bin").join(exe);
    if primary.is_file() {
        return Some(primary);
    }

    let mac_layout = runtime_root.join("Contents").join("Home").join("bin").join(exe);
    if mac_layout.is_file() {
        return Some(mac_layout);
    }

    find_java_binary_recursive(runtime_root, exe)
}

fn find_java_binary_recursive(root: &Path, exe: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_file() {
            let in_bin = path
                .parent()
                .and_then(|p| p.file_name())
                .is_some_and(|name| name == "bin");
            if in_bin && path.file_name().and_then(|n| n.to_str()) == Some(exe) {
                return Some(path);
            }
        } else if file_type.is_dir() {
            if let Some(found) = find_java_binary_recursive(&path, exe) {
                return Some(found);
            }
        }
    }
    None
}

fn ensure_executable(binary: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(binary)
            .map_err(|e| LauncherError::io(binary, e))?
            .permissions();
        if perms.mode() & 0o111 == 0 {
            perms.set_mode(0o755);
            std::fs::set_permissions(binary, perms).map_err(|e| LauncherError::io(binary, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = binary;
    Ok(())
}
