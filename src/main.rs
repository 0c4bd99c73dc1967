use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};

use tune_launcher::core::config::{default_common_dir, LauncherConfig};
use tune_launcher::core::{EventSink, LaunchContext, LaunchEvent, Launcher, LauncherResult};

const CONFIG_FILE_NAME: &str = "launcher_config.json";

/// Tune Client Launcher - validates game files and starts the client
#[derive(Parser)]
#[command(name = "tune-launcher")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to <data dir>/launcher_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Shared data directory holding assets, libraries, versions and JREs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every file and start the game
    Launch {
        /// Distribution identifier (defaults to the configured version)
        version: Option<String>,
    },

    /// Validate every file and print the command that would start the game
    Prepare {
        /// Distribution identifier (defaults to the configured version)
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tune_launcher::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> LauncherResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(|| {
        cli.data_dir
            .clone()
            .unwrap_or_else(default_common_dir)
            .join(CONFIG_FILE_NAME)
    });
    let mut config = LauncherConfig::load(&config_path)?;
    if let Some(data_dir) = cli.data_dir {
        config.launcher.common_dir = data_dir;
    }

    let (events, rx) = EventSink::channel();
    let renderer = tokio::spawn(render_events(rx));
    let launcher = Launcher::new(LaunchContext::new(config, events)?);

    let result = match cli.command {
        Commands::Launch { version } => {
            let version = version.unwrap_or_else(|| launcher.context().config.game.version.clone());
            launcher.launch(&version).await.map(|outcome| {
                info!(
                    "Game started at {} (pid {:?}) exited with code {:?}",
                    outcome.started_at.to_rfc3339(),
                    outcome.pid,
                    outcome.exit_code
                );
            })
        }
        Commands::Prepare { version } => {
            let version = version.unwrap_or_else(|| launcher.context().config.game.version.clone());
            launcher.prepare(&version).await.map(|prepared| {
                let command = &prepared.command;
                println!("cd {}", command.working_dir.display());
                println!(
                    "{} {}",
                    command.java.display(),
                    command.args.join(" ")
                );
            })
        }
    };

    drop(launcher);
    let _ = renderer.await;
    result
}

async fn render_events(mut rx: UnboundedReceiver<LaunchEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            LaunchEvent::StageStarted(stage) => info!("[{}]", stage),
            LaunchEvent::BatchProgress { batch, fraction } => {
                info!(%batch, "{:.1}%", fraction * 100.0)
            }
            LaunchEvent::Spawned { pid } => info!("Game process started (pid {:?})", pid),
            LaunchEvent::Crashed(report) => {
                error!("Game crashed, report at {:?}", report.report_path)
            }
            LaunchEvent::Exited { code } => info!("Game exited with code {:?}", code),
            LaunchEvent::Failed(reason) => error!("Launch failed: {}", reason),
        }
    }
}
