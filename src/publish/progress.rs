//! Upload progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the progress of one upload and logs only when the whole-number
/// percentage changes.
#[derive(Debug)]
pub struct UploadProgress {
    key: String,
    last_percent: AtomicU64,
}

impl UploadProgress {
    /// Creates a tracker for the upload to `key`, starting at 0%.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            last_percent: AtomicU64::new(0),
        }
    }

    /// Destination key being tracked.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last percentage reported.
    pub fn percent(&self) -> u64 {
        self.last_percent.load(Ordering::Relaxed)
    }

    /// Records `sent` of `total` bytes. Returns the new percentage when it
    /// differs from the last one reported (and logs it), `None` otherwise.
    pub fn record(&self, sent: u64, total: u64) -> Option<u64> {
        let percent = percent_of(sent, total);
        let previous = self.last_percent.swap(percent, Ordering::Relaxed);
        if percent == previous {
            return None;
        }
        log::info!(">> Uploading {} {}%", self.key, percent);
        Some(percent)
    }
}

/// `floor(sent / total * 100)`, capped at 100; an empty upload is complete.
pub fn percent_of(sent: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    ((u128::from(sent) * 100) / u128::from(total)).min(100) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_only_on_change() {
        let progress = UploadProgress::new("2.1.0-abc1234/darwin/x64/N1.zip");
        let emitted: Vec<u64> = [0u64, 33, 33, 66, 100]
            .into_iter()
            .filter_map(|pc| progress.record(pc, 100))
            .collect();
        assert_eq!(emitted, vec![33, 66, 100]);
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn floors_fractional_percentages() {
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 66);
        assert_eq!(percent_of(999, 1000), 99);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn byte_counts_map_to_same_bucket() {
        let progress = UploadProgress::new("k");
        assert_eq!(progress.record(10, 1000), Some(1));
        assert_eq!(progress.record(19, 1000), None);
        assert_eq!(progress.record(20, 1000), Some(2));
    }
}
