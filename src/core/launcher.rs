// ─── Launch Orchestrator ───
// Resolving -> Java -> Assets -> Libraries -> Minecraft -> Launching -> Running.
// Each stage is awaited before the next starts; a stage error stops the
// launch and is published as `LaunchEvent::Failed`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::assets::{AssetValidator, RESOURCES_URL};
use crate::core::downloader::{retain_unverified, Artifact, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{LaunchEvent, LaunchStage};
use crate::core::java::{JavaProvisioner, JavaRuntime, AZUL_METADATA_URL, DEFAULT_JRE_VERSION};
use crate::core::launch::{
    classpath_entries, extract_natives, merge_legacy_arguments, render_classpath, spawn_game,
    standard_placeholders, substitute_placeholders, supervise, CrashReporter, DisplayMode,
    DockIdentity, GameCommand, GameObservers, LaunchArgumentBuilder, LogCrashReporter,
    ProtocolHandler,
};
use crate::core::libraries::{LibraryPlan, LibraryResolver};
use crate::core::version::{
    HttpManifestSource, ManifestResolver, ManifestSource, ResolvedVersion, VersionManifest,
};
use crate::core::{LaunchContext, LAUNCHER_NAME, LAUNCHER_VERSION};

/// A launch that is ready to spawn.
#[derive(Debug, Clone)]
pub struct PreparedLaunch {
    pub version: ResolvedVersion,
    pub java: JavaRuntime,
    pub command: GameCommand,
    /// Artifacts that could not be verified after their batch drained.
    pub unverified: usize,
}

/// What happened to a spawned game.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    /// `None` when the game was killed by a signal.
    pub exit_code: Option<i32>,
}

pub struct Launcher {
    context: LaunchContext,
    source: Arc<dyn ManifestSource>,
    protocol: Arc<ProtocolHandler>,
    crash_reporter: Arc<dyn CrashReporter>,
    resources_url: String,
    java_metadata_url: String,
}

impl Launcher {
    pub fn new(context: LaunchContext) -> Self {
        let source = Arc::new(HttpManifestSource::new(context.http.clone()));
        Self {
            context,
            source,
            protocol: Arc::new(ProtocolHandler::new()),
            crash_reporter: Arc::new(LogCrashReporter),
            resources_url: RESOURCES_URL.to_string(),
            java_metadata_url: AZUL_METADATA_URL.to_string(),
        }
    }

    pub fn with_manifest_source(mut self, source: Arc<dyn ManifestSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolHandler) -> Self {
        self.protocol = Arc::new(protocol);
        self
    }

    pub fn with_crash_reporter(mut self, reporter: Arc<dyn CrashReporter>) -> Self {
        self.crash_reporter = reporter;
        self
    }

    pub fn with_resources_url(mut self, url: impl Into<String>) -> Self {
        self.resources_url = url.into();
        self
    }

    pub fn with_java_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.java_metadata_url = url.into();
        self
    }

    pub fn context(&self) -> &LaunchContext {
        &self.context
    }

    /// Run every stage up to, but not including, the spawn.
    pub async fn prepare(&self, version: &str) -> LauncherResult<PreparedLaunch> {
        match self.prepare_stages(version).await {
            Ok(prepared) => Ok(prepared),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Prepare, spawn and supervise the game until it exits.
    pub async fn launch(&self, version: &str) -> LauncherResult<LaunchOutcome> {
        let prepared = self.prepare(version).await?;
        match self.run(prepared.command).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn fail(&self, error: &LauncherError) {
        warn!("Launch failed: {}", error);
        self.context.events.emit(LaunchEvent::Failed(error.to_string()));
    }

    fn stage(&self, stage: LaunchStage) {
        info!("Stage: {}", stage);
        self.context.events.emit(LaunchEvent::StageStarted(stage));
    }

    async fn prepare_stages(&self, version: &str) -> LauncherResult<PreparedLaunch> {
        let ctx = &self.context;
        let downloader = ctx.downloader();

        self.stage(LaunchStage::Resolving);
        ctx.layout.ensure_dirs()?;
        let resolver = ManifestResolver::new(
            self.source.as_ref(),
            ctx.config.launcher.artifact_root_url.as_str(),
        );
        let resolved = resolver.resolve(version).await?;
        let mc_version = resolved.distribution.version.mc_version.clone();
        let game = resolved
            .chain
            .game_manifest(&mc_version)
            .ok_or_else(|| LauncherError::MissingManifest(mc_version.clone()))?
            .clone();

        self.stage(LaunchStage::Java);
        let java = self.ensure_java(&resolved, &downloader).await?;

        self.stage(LaunchStage::Assets);
        let mut unverified = self.validate_assets(&resolved, &game, &downloader).await?;

        self.stage(LaunchStage::Libraries);
        let plan = LibraryResolver::new(&ctx.platform, ctx.layout.libraries_dir())
            .resolve(&resolved.chain, &resolved.distribution);
        unverified += submit_unverified(&downloader, "Libraries", plan.artifacts.clone()).await?;

        self.stage(LaunchStage::Minecraft);
        unverified += self.validate_game_files(&mc_version, &game, &downloader).await?;

        self.stage(LaunchStage::Launching);
        let command = self.build_command(&resolved, &game, &plan, &java).await?;
        if unverified > 0 {
            warn!("{} files could not be verified, launching anyway", unverified);
        }

        Ok(PreparedLaunch {
            version: resolved,
            java,
            command,
            unverified,
        })
    }

    async fn ensure_java(
        &self,
        resolved: &ResolvedVersion,
        downloader: &Downloader,
    ) -> LauncherResult<JavaRuntime> {
        let ctx = &self.context;
        if let Some(binary) = &ctx.config.java.java_path {
            if !binary.is_file() {
                return Err(LauncherError::JavaRuntime(format!(
                    "Configured Java binary {:?} does not exist",
                    binary
                )));
            }
            let home = binary
                .parent()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| binary.clone());
            return Ok(JavaRuntime {
                home,
                binary: binary.clone(),
            });
        }

        let jre_version = resolved
            .distribution
            .version
            .jre_version
            .as_deref()
            .unwrap_or(DEFAULT_JRE_VERSION);
        let provisioner = JavaProvisioner::new(&ctx.http, &ctx.layout, downloader, &ctx.platform)
            .with_metadata_url(self.java_metadata_url.as_str());
        let build = provisioner.resolve_build(jre_version).await?;
        provisioner.ensure(&build).await
    }

    async fn validate_assets(
        &self,
        resolved: &ResolvedVersion,
        game: &VersionManifest,
        downloader: &Downloader,
    ) -> LauncherResult<usize> {
        let Some(index) = game.asset_index.as_ref() else {
            warn!("No asset index declared for {}", resolved.id);
            return Ok(0);
        };
        let reports = AssetValidator::new(&self.context.layout, downloader)
            .with_resources_url(self.resources_url.as_str())
            .validate(index, &resolved.distribution.version.mc_version_major)
            .await?;
        Ok(reports.iter().map(|r| r.failures.len()).sum())
    }

    /// Client jar, agent jar and logging configuration.
    async fn validate_game_files(
        &self,
        mc_version: &str,
        game: &VersionManifest,
        downloader: &Downloader,
    ) -> LauncherResult<usize> {
        let layout = &self.context.layout;
        let mut artifacts = Vec::new();
        let mut push = |download: Option<Artifact>, what: &str| match download {
            Some(artifact) => artifacts.push(artifact),
            None => warn!("No {} download declared for {}", what, mc_version),
        };

        push(
            game.download("client")
                .and_then(|d| d.to_artifact(&layout.client_jar(mc_version))),
            "client",
        );
        if let Some(agent) = game.download("agent") {
            push(agent.to_artifact(&layout.agent_jar(mc_version)), "agent");
        }
        if let Some(file) = game.client_logging().and_then(|l| l.file.as_ref()) {
            if let Some(path) = logging_config_path(layout.config_dir().as_path(), game) {
                push(file.to_artifact(&path), "logging configuration");
            }
        }

        submit_unverified(downloader, "Minecraft", artifacts).await
    }

    async fn build_command(
        &self,
        resolved: &ResolvedVersion,
        game: &VersionManifest,
        plan: &LibraryPlan,
        java: &JavaRuntime,
    ) -> LauncherResult<GameCommand> {
        let ctx = &self.context;
        let config = &ctx.config;
        let mc_version = &resolved.distribution.version.mc_version;

        let natives_dir = ctx.layout.natives_dir(&resolved.id);
        let extracted = extract_natives(&plan.natives, &natives_dir).await?;
        info!("Extracted {} native files into {:?}", extracted, natives_dir);

        let main_class = resolved.chain.main_class().ok_or_else(|| {
            LauncherError::Other(format!("No main class declared for {}", resolved.id))
        })?;

        let entries = classpath_entries(
            &ctx.layout.client_jar(mc_version),
            &plan.classpath,
            Some(java.home.as_path()),
        );
        let classpath = render_classpath(&entries, ctx.platform.os);

        let version_name = resolved.distribution.version_name();
        let asset_index_name = game
            .assets
            .clone()
            .unwrap_or_else(|| resolved.distribution.version.mc_version_major.clone());
        let mut game_args = merge_legacy_arguments(resolved.chain.legacy_arguments());
        let table = standard_placeholders(
            &version_name,
            &config.launcher.game_dir,
            &ctx.layout.assets_dir(),
            Some(asset_index_name.as_str()),
        );
        substitute_placeholders(&mut game_args, &table);

        let mut jvm_args = config.java.jvm_args.clone();
        if let Some(argument) = logging_argument(ctx.layout.config_dir().as_path(), game) {
            jvm_args.push(argument);
        }

        let agent_jar = ctx.layout.agent_jar(mc_version);
        let agent_jar = if game.download("agent").is_some() || agent_jar.is_file() {
            Some(agent_jar)
        } else {
            None
        };

        let display = if config.game.fullscreen {
            DisplayMode::Fullscreen
        } else {
            DisplayMode::Windowed(config.game.resolution)
        };

        let args = LaunchArgumentBuilder::new(ctx.platform.os, main_class, classpath)
            .memory_mb(config.effective_memory_mb())
            .jvm_args(jvm_args)
            .natives_dir(natives_dir)
            .launcher_identity(LAUNCHER_NAME, LAUNCHER_VERSION)
            .agent_jar(agent_jar)
            .dock(DockIdentity {
                name: resolved.distribution.client_name.clone(),
                icon: ctx.layout.assets_dir().join("minecraft.icns"),
            })
            .game_args(game_args)
            .display(display)
            .build();

        Ok(GameCommand {
            java: java.binary.clone(),
            args,
            working_dir: config.launcher.game_dir.clone(),
            detached: config.game.detached,
        })
    }

    async fn run(&self, command: GameCommand) -> LauncherResult<LaunchOutcome> {
        let child = spawn_game(&command).await?;
        let pid = child.id();
        let started_at = Utc::now();
        self.context.events.emit(LaunchEvent::Spawned { pid });
        self.stage(LaunchStage::Running);

        let observers = GameObservers {
            protocol: self.protocol.clone(),
            crash_reporter: self.crash_reporter.clone(),
            events: self.context.events.clone(),
        };

        let exit_code = supervise(child, observers).await?;
        Ok(LaunchOutcome {
            pid,
            started_at,
            exit_code,
        })
    }
}

/// Submit whatever does not verify yet and return how many still fail.
async fn submit_unverified(
    downloader: &Downloader,
    label: &str,
    artifacts: Vec<Artifact>,
) -> LauncherResult<usize> {
    let pending = retain_unverified(artifacts).await?;
    if pending.is_empty() {
        info!("{} are up to date", label);
        return Ok(0);
    }
    info!("Downloading {} files for {}...", pending.len(), label);
    let report = downloader.submit(label, pending).await;
    for failure in &report.failures {
        warn!(url = %failure.url, "{}: {}", label, failure.reason);
    }
    Ok(report.failures.len())
}

/// `config/<logging file id>`
fn logging_config_path(config_dir: &Path, game: &VersionManifest) -> Option<PathBuf> {
    let id = game.client_logging()?.file.as_ref()?.id.as_deref()?;
    Some(config_dir.join(id))
}

/// The logging JVM flag with `${path}` filled in, if its file is on disk.
fn logging_argument(config_dir: &Path, game: &VersionManifest) -> Option<String> {
    let template = game.client_logging()?.argument.as_deref()?;
    let path = logging_config_path(config_dir, game)?;
    if !path.is_file() {
        return None;
    }
    Some(template.replace("${path}", &path.to_string_lossy()))
}
