use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, warn};

/// Printed by the client on stdout, followed by the crash-report path.
pub const CRASH_MARKER: &str = "#@!@# Game crashed! Crash report saved to: #@!@#";

#[derive(Debug, Clone)]
pub struct CrashReport {
    pub report_path: PathBuf,
    pub contents: String,
    /// First exception line and its `\tat` frames, when the report has one.
    pub stack_trace: Option<String>,
}

/// Receives crash reports, e.g. to upload or display them.
#[async_trait]
pub trait CrashReporter: Send + Sync {
    async fn report(&self, crash: &CrashReport);
}

/// Writes the crash to the log.
#[derive(Debug, Default)]
pub struct LogCrashReporter;

#[async_trait]
impl CrashReporter for LogCrashReporter {
    async fn report(&self, crash: &CrashReport) {
        match &crash.stack_trace {
            Some(trace) => error!(
                target: "minecraft",
                "Game crashed (report: {:?}):\n{}", crash.report_path, trace
            ),
            None => error!(
                target: "minecraft",
                "A crash has been detected during runtime (report: {:?})", crash.report_path
            ),
        }
    }
}

/// Crash-report path announced by a stdout line, if it carries the marker.
pub fn crash_report_path(line: &str) -> Option<PathBuf> {
    let (_, rest) = line.split_once(CRASH_MARKER)?;
    let path = rest.trim();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// First stack trace in `contents`: a line directly followed by one or more
/// lines starting with a tab and `at`.
pub fn extract_stack_trace(contents: &str) -> Option<String> {
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.windows(2).position(|pair| {
        !pair[0].trim().is_empty() && !is_frame(pair[0]) && is_frame(pair[1])
    })?;

    let frames = lines[start + 1..]
        .iter()
        .take_while(|line| is_frame(line))
        .count();
    Some(lines[start..=start + frames].join("\n"))
}

fn is_frame(line: &str) -> bool {
    line.starts_with("\tat")
}

/// Read the report named by `line`, if `line` announces a crash.
pub async fn read_crash_report(line: &str) -> Option<CrashReport> {
    let report_path = crash_report_path(line)?;
    let contents = match tokio::fs::read_to_string(&report_path).await {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Cannot read crash report {:?}: {}", report_path, e);
            String::new()
        }
    };
    Some(build_report(&report_path, contents))
}

fn build_report(path: &Path, contents: String) -> CrashReport {
    CrashReport {
        report_path: path.to_path_buf(),
        stack_trace: extract_stack_trace(&contents),
        contents,
    }
}
