use std::path::PathBuf;

use uuid::Uuid;

use super::artifact::Artifact;

/// Highest fraction reported while any artifact in the batch is still pending.
const PENDING_CEILING: f64 = 0.999;

/// Aggregate byte accounting for one batch.
///
/// Pure bookkeeping: the download engine feeds it transfer updates and
/// terminal states, and it answers with the fraction to publish, if that
/// fraction moved forward.
#[derive(Debug)]
pub struct BatchTracker {
    id: Uuid,
    sizes: Vec<u64>,
    in_flight: Vec<u64>,
    terminal: Vec<bool>,
    total_bytes: u64,
    completed_bytes: u64,
    reported: f64,
}

impl BatchTracker {
    /// `sizes[i]` is the expected byte count of artifact `i`; unknown sizes
    /// count as zero. A batch without any expected bytes is tracked by count.
    pub fn new(sizes: Vec<u64>) -> Self {
        let total_bytes = sizes.iter().sum();
        let len = sizes.len();
        Self {
            id: Uuid::new_v4(),
            sizes,
            in_flight: vec![0; len],
            terminal: vec![false; len],
            total_bytes,
            completed_bytes: 0,
            reported: 0.0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn reported(&self) -> f64 {
        self.reported
    }

    pub fn is_finished(&self) -> bool {
        self.terminal.iter().all(|done| *done)
    }

    /// Record `transferred` bytes received so far for artifact `index`.
    /// In-flight bytes are capped at the expected size, so an artifact of
    /// unknown size contributes nothing until it is terminal.
    pub fn record_transfer(&mut self, index: usize, transferred: u64) -> Option<f64> {
        if self.terminal.get(index).copied().unwrap_or(true) {
            return None;
        }
        self.in_flight[index] = transferred.min(self.sizes[index]);
        self.advance()
    }

    /// Mark artifact `index` terminal. Failed artifacts count their full size
    /// as done, so a failure never stalls the fraction.
    pub fn record_terminal(&mut self, index: usize) -> Option<f64> {
        match self.terminal.get_mut(index) {
            Some(done) if !*done => *done = true,
            _ => return None,
        }
        self.in_flight[index] = 0;
        self.completed_bytes += self.sizes[index];
        self.advance()
    }

    /// Close the batch. Returns `1.0` once every artifact is terminal.
    pub fn finish(&mut self) -> Option<f64> {
        if !self.is_finished() {
            return None;
        }
        self.reported = 1.0;
        Some(1.0)
    }

    fn raw_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            if self.sizes.is_empty() {
                return 1.0;
            }
            let done = self.terminal.iter().filter(|done| **done).count();
            return done as f64 / self.sizes.len() as f64;
        }
        let in_flight: u64 = self.in_flight.iter().sum();
        (self.completed_bytes + in_flight) as f64 / self.total_bytes as f64
    }

    fn advance(&mut self) -> Option<f64> {
        let mut fraction = self.raw_fraction().min(1.0);
        if !self.is_finished() {
            fraction = fraction.min(PENDING_CEILING);
        }
        if fraction > self.reported {
            self.reported = fraction;
            Some(fraction)
        } else {
            None
        }
    }
}

/// An artifact that did not end up verified on disk.
#[derive(Debug, Clone)]
pub struct ArtifactFailure {
    pub url: String,
    pub destination: PathBuf,
    pub reason: String,
}

/// Outcome of a drained batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub id: Uuid,
    pub label: String,
    /// Every artifact in the batch with its final completion flag.
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<ArtifactFailure>,
    pub bytes_transferred: u64,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn verified_count(&self) -> usize {
        self.artifacts.iter().filter(|a| a.is_complete()).count()
    }
}
