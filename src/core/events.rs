// ─── Launch Events ───
// Push-based progress stream consumed by whatever presents the launch.

use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::launch::CrashReport;

/// Stages of a launch, in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Resolving,
    Java,
    Assets,
    Libraries,
    Minecraft,
    Launching,
    Running,
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LaunchStage::Resolving => "Validating",
            LaunchStage::Java => "Java",
            LaunchStage::Assets => "Assets",
            LaunchStage::Libraries => "Libraries",
            LaunchStage::Minecraft => "Minecraft",
            LaunchStage::Launching => "Launching",
            LaunchStage::Running => "Game Running",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub enum LaunchEvent {
    StageStarted(LaunchStage),
    /// Monotonic progress of one download batch, in `[0, 1]`.
    BatchProgress { batch: Uuid, fraction: f64 },
    Spawned { pid: Option<u32> },
    Crashed(CrashReport),
    Exited { code: Option<i32> },
    /// Terminal error; the launch stops after this.
    Failed(String),
}

/// Cloneable handle for publishing [`LaunchEvent`]s.
///
/// A disabled sink drops everything, which keeps the core usable without a
/// listener attached.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<LaunchEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LaunchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: LaunchEvent) {
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is watching anymore.
            let _ = tx.send(event);
        }
    }
}
