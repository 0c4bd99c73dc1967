use std::sync::{Mutex, MutexGuard};

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::DEFAULT_DOWNLOAD_CONCURRENCY;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LaunchEvent};

use super::artifact::Artifact;
use super::batch::{ArtifactFailure, BatchReport, BatchTracker};

/// Bounded-concurrency download engine.
///
/// Each `submit` call is one batch: artifacts stream to disk through a pool of
/// at most `concurrency` transfers, and the batch's aggregate progress is
/// pushed to the event sink.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel transfers per batch.
    concurrency: usize,
    events: EventSink,
}

impl Downloader {
    pub fn new(client: Client, events: EventSink) -> Self {
        Self {
            client,
            concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            events,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    // ── Batch ───────────────────────────────────────────

    /// Download every artifact and resolve once each one is terminal.
    ///
    /// A failing artifact is logged and left unverified; it never stops its
    /// siblings. The report lists what did not end up verified.
    pub async fn submit(&self, label: &str, artifacts: Vec<Artifact>) -> BatchReport {
        let sizes = artifacts.iter().map(|a| a.size().unwrap_or(0)).collect();
        let tracker = Mutex::new(BatchTracker::new(sizes));
        let batch = lock(&tracker).id();

        info!(
            batch = %batch,
            label,
            files = artifacts.len(),
            bytes = lock(&tracker).total_bytes(),
            concurrency = self.concurrency,
            "Starting download batch"
        );

        let tracker_ref = &tracker;
        let mut results: Vec<(usize, Artifact, LauncherResult<u64>)> =
            stream::iter(artifacts.into_iter().enumerate())
                .map(|(index, mut artifact)| async move {
                    let result = self.transfer(batch, index, &artifact, tracker_ref).await;
                    artifact.set_complete(result.is_ok());
                    let progress = lock(tracker_ref).record_terminal(index);
                    self.publish(batch, progress);
                    (index, artifact, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);

        let mut failures = Vec::new();
        let mut bytes_transferred = 0;
        let mut finished = Vec::with_capacity(results.len());
        for (_, artifact, result) in results {
            match result {
                Ok(bytes) => bytes_transferred += bytes,
                Err(e) => {
                    warn!(url = artifact.url(), "Download failed: {}", e);
                    failures.push(ArtifactFailure {
                        url: artifact.url().to_string(),
                        destination: artifact.destination().to_path_buf(),
                        reason: e.to_string(),
                    });
                }
            }
            finished.push(artifact);
        }

        let final_progress = lock(&tracker).finish();
        self.publish(batch, final_progress);

        info!(
            batch = %batch,
            label,
            failed = failures.len(),
            bytes = bytes_transferred,
            "Download batch finished"
        );

        BatchReport {
            id: batch,
            label: label.to_string(),
            artifacts: finished,
            failures,
            bytes_transferred,
        }
    }

    // ── Single transfer ─────────────────────────────────

    /// Stream one artifact to its destination, hashing as it goes.
    /// Returns the number of bytes written.
    async fn transfer(
        &self,
        batch: Uuid,
        index: usize,
        artifact: &Artifact,
        tracker: &Mutex<BatchTracker>,
    ) -> LauncherResult<u64> {
        let dest = artifact.destination();
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.client.get(artifact.url()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: artifact.url().to_string(),
                status: status.as_u16(),
            });
        }

        let mut hasher = artifact.expected_hash().map(|h| h.hasher());
        let mut written: u64 = 0;

        // Scoped so the handle is closed before the file is inspected again.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(dest, e))?;
                if let Some(hasher) = hasher.as_mut() {
                    hasher.update(&chunk);
                }
                written += chunk.len() as u64;
                let progress = lock(tracker).record_transfer(index, written);
                self.publish(batch, progress);
            }
            file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
        }

        if let (Some(hasher), Some(expected)) = (hasher, artifact.expected_hash()) {
            let actual = hasher.finalize_hex();
            if !actual.eq_ignore_ascii_case(expected.value()) {
                return Err(LauncherError::Other(format!(
                    "{} mismatch for {}: expected {}, got {}",
                    expected.algorithm(),
                    dest.display(),
                    expected.value(),
                    actual
                )));
            }
        }

        debug!("Downloaded: {} -> {:?}", artifact.url(), dest);
        Ok(written)
    }

    fn publish(&self, batch: Uuid, progress: Option<f64>) {
        if let Some(fraction) = progress {
            self.events.emit(LaunchEvent::BatchProgress { batch, fraction });
        }
    }
}

fn lock(tracker: &Mutex<BatchTracker>) -> MutexGuard<'_, BatchTracker> {
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::ExpectedHash;

    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    fn drain_progress(
        rx: &mut tokio::sync::mpsc::UnboundedReceiver<LaunchEvent>,
    ) -> Vec<f64> {
        let mut values = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let LaunchEvent::BatchProgress { fraction, .. } = event {
                values.push(fraction);
            }
        }
        values
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/ok.txt")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/missing.txt")
            .with_status(404)
            .create_async()
            .await;
        let corrupt = server
            .mock("GET", "/corrupt.txt")
            .with_status(200)
            .with_body("hellp")
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let (events, mut rx) = EventSink::channel();
        let downloader = Downloader::new(Client::new(), events).with_concurrency(2);

        let artifacts = vec![
            Artifact::new(format!("{}/ok.txt", server.url()), temp.path().join("a/ok.txt"))
                .with_size(Some(5))
                .with_sha1(Some(HELLO_SHA1)),
            Artifact::new(format!("{}/missing.txt", server.url()), temp.path().join("b/missing.txt"))
                .with_size(Some(5)),
            Artifact::new(format!("{}/corrupt.txt", server.url()), temp.path().join("c/corrupt.txt"))
                .with_size(Some(5))
                .with_hash(Some(ExpectedHash::Sha1(HELLO_SHA1.into()))),
        ];

        let report = downloader.submit("test", artifacts).await;

        ok.assert_async().await;
        missing.assert_async().await;
        corrupt.assert_async().await;

        assert_eq!(report.artifacts.len(), 3);
        assert_eq!(report.verified_count(), 1);
        assert_eq!(report.failures.len(), 2);
        assert!(report.artifacts[0].is_complete());
        assert_eq!(
            std::fs::read_to_string(temp.path().join("a/ok.txt")).unwrap(),
            "hello"
        );

        // The corrupt file is on disk but fails the next verification.
        let mut recheck = report.artifacts[2].clone();
        assert!(!recheck.verify());

        let progress = drain_progress(&mut rx);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert_eq!(progress.last().copied(), Some(1.0));
        assert_eq!(progress.iter().filter(|p| **p >= 1.0).count(), 2);
    }

    #[tokio::test]
    async fn transfers_never_exceed_the_concurrency_limit() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::time::Duration;
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let served = Arc::new(AtomicUsize::new(0));

        let counters = (in_flight.clone(), peak.clone(), served.clone());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let (in_flight, peak, served) = counters.clone();
                tokio::spawn(async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    let mut request = [0u8; 2048];
                    let _ = socket.read(&mut request).await;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    served.fetch_add(1, Ordering::SeqCst);
                    // Released before replying so the next request cannot overlap it.
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    let _ = socket
                        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello")
                        .await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        let temp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(Client::new(), EventSink::disabled()).with_concurrency(2);
        let artifacts = (0..6)
            .map(|i| {
                Artifact::new(
                    format!("http://{}/file{}.txt", addr, i),
                    temp.path().join(format!("file{}.txt", i)),
                )
                .with_size(Some(5))
                .with_sha1(Some(HELLO_SHA1))
            })
            .collect();

        let report = downloader.submit("bounded", artifacts).await;

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(served.load(Ordering::SeqCst), 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_batch_completes_immediately() {
        let (events, mut rx) = EventSink::channel();
        let downloader = Downloader::new(Client::new(), events);
        let report = downloader.submit("nothing", Vec::new()).await;
        assert!(report.is_success());
        assert_eq!(drain_progress(&mut rx), vec![1.0]);
    }
}
