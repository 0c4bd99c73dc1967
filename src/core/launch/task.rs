// ─── Launch Task ───
// Spawns the game process and follows its output until it exits.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LaunchEvent};

use super::crash::{read_crash_report, CrashReporter};
use super::protocol::{ProtocolHandler, ProtocolReplier, ProtocolReply};

/// A fully prepared game invocation.
#[derive(Debug, Clone)]
pub struct GameCommand {
    pub java: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Start the game in its own process group so it outlives a killed launcher.
    pub detached: bool,
}

impl GameCommand {
    /// Directory holding the Java binary, prepended to `PATH`.
    pub fn java_bin_dir(&self) -> Option<&Path> {
        self.java.parent()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.args(&self.args);
        cmd.current_dir(&self.working_dir);
        if let Some(bin) = self.java_bin_dir() {
            cmd.env("PATH", append_env_path("PATH", &bin.to_string_lossy()));
        }
        configure_platform_spawn(&mut cmd, self.detached);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

/// Start the game. Returns as soon as the process exists.
pub async fn spawn_game(command: &GameCommand) -> LauncherResult<Child> {
    tokio::fs::create_dir_all(&command.working_dir)
        .await
        .map_err(|e| LauncherError::io(&command.working_dir, e))?;

    info!(
        "Launching Minecraft process (java: {:?}, cwd: {:?}, args: {})",
        command.java,
        command.working_dir,
        command.args.len()
    );
    debug!("Command (copy/paste): {}", format_command_for_logs(command));

    command
        .to_command()
        .spawn()
        .map_err(|e| LauncherError::ProcessLaunch(format!("{}: {}", command.java.display(), e)))
}

/// Collaborators that interpret the game's output.
#[derive(Clone)]
pub struct GameObservers {
    pub protocol: Arc<ProtocolHandler>,
    pub crash_reporter: Arc<dyn CrashReporter>,
    pub events: EventSink,
}

/// Follow a running game until it exits and return its exit code.
///
/// Every output line is first offered to the protocol handler. Unclaimed
/// stdout lines are logged and checked for the crash marker; unclaimed
/// stderr lines are logged as errors.
pub async fn supervise(mut child: Child, observers: GameObservers) -> LauncherResult<Option<i32>> {
    let pid = child.id();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ProtocolReply>();
    let replier = ProtocolReplier::new(reply_tx);

    let writer = child.stdin.take().map(|mut stdin| {
        tokio::spawn(async move {
            while let Some(reply) = reply_rx.recv().await {
                let line = reply.to_line();
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    warn!("Cannot write protocol reply to the game: {}", e);
                    break;
                }
                let _ = stdin.flush().await;
            }
        })
    });

    let stdout_task = child.stdout.take().map(|stdout| {
        let observers = observers.clone();
        let replier = replier.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim();
                if observers.protocol.handle(line, &replier) {
                    continue;
                }
                info!(target: "minecraft", "{}", line);
                if let Some(report) = read_crash_report(line).await {
                    observers.events.emit(LaunchEvent::Crashed(report.clone()));
                    observers.crash_reporter.report(&report).await;
                }
            }
        })
    });

    let stderr_task = child.stderr.take().map(|stderr| {
        let protocol = observers.protocol.clone();
        let replier = replier.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !protocol.handle(&line, &replier) {
                    error!(target: "minecraft", "{}", line);
                }
            }
        })
    });
    drop(replier);

    let status = child
        .wait()
        .await
        .map_err(|e| LauncherError::ProcessLaunch(format!("waiting on pid {:?}: {}", pid, e)))?;

    for task in [stdout_task, stderr_task].into_iter().flatten() {
        let _ = task.await;
    }
    if let Some(writer) = writer {
        writer.abort();
    }

    let code = status.code();
    info!("Minecraft process exited with code {:?}", code);
    observers.events.emit(LaunchEvent::Exited { code });
    Ok(code)
}

#[cfg(target_os = "windows")]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

fn configure_platform_spawn(cmd: &mut Command, detached: bool) {
    #[cfg(target_os = "windows")]
    {
        // Terminal session variables make LWJGL treat the game as a console app.
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
        cmd.env_remove("ConEmuANSI");
        if detached {
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }
    }
    #[cfg(unix)]
    if detached {
        cmd.process_group(0);
    }
}

fn append_env_path(var_name: &str, value: &str) -> String {
    let separator = if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    };
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

fn format_command_for_logs(command: &GameCommand) -> String {
    std::iter::once(command.java.to_string_lossy().to_string())
        .chain(command.args.iter().cloned())
        .map(|part| shell_escape(&part))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
