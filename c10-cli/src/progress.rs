//! Progress reporting
//!
//! Scans and rewrites notify an observer as they go; nothing in the search or
//! rewrite logic depends on what the observer does.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait ProgressObserver: Send + Sync {
    /// A file is about to be processed (`index` is 0-based)
    fn file_started(&self, _path: &Path, _index: usize, _total: usize, _bytes: u64) {}

    /// `bytes` more of the file have been consumed
    fn advanced(&self, _path: &Path, _bytes: u64) {}

    /// Processing of a file ended (successfully or not)
    fn file_finished(&self, _path: &Path, _ok: bool) {}
}

/// Observer that ignores everything
pub struct Silent;

impl ProgressObserver for Silent {}

/// Observer that logs file-level progress
#[derive(Default)]
pub struct LogProgress {
    finished: AtomicU64,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for LogProgress {
    fn file_started(&self, path: &Path, index: usize, total: usize, bytes: u64) {
        log::info!(
            "[{}/{}] {} ({} bytes)",
            index + 1,
            total,
            path.display(),
            bytes
        );
    }

    fn advanced(&self, path: &Path, bytes: u64) {
        log::trace!("{}: +{} bytes", path.display(), bytes);
    }

    fn file_finished(&self, path: &Path, ok: bool) {
        let done = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        if ok {
            log::debug!("Finished {} ({} files done)", path.display(), done);
        } else {
            log::debug!("Gave up on {} ({} files done)", path.display(), done);
        }
    }
}
