//! Reconciliation loop: list both sides → diff → download what is missing → (sleep → repeat).
//!
//! This module provides the orchestration that mirrors a bucket into the sync root.
//! A pass:
//!   - Lists the sync root ([`local::scan_dir`]) and the bucket ([`remote::list_remote`])
//!   - Diffs the two listings both ways ([`diff::difference`])
//!   - Warns about local files the bucket does not know, never deleting them
//!   - Downloads every missing object in remote enumeration order, one at a time
//!
//! # Major Types
//! - [`Reconciler`]: owns the store, the resolved config and the injected logger
//! - [`SyncSession`]: the two listings and their differences for one pass
//! - [`SyncReport`]: what a pass did, for the CLI and tests
//!
//! # Error Handling
//! Anything that makes a listing incomplete aborts the pass with an error, since a
//! partial listing would produce a wrong diff. A failed download is logged, its
//! partial file removed, and the pass carries on; the object is retried on the next
//! pass because it is still missing.
//!
//! # Cancellation
//! A [`Shutdown`] interrupts the sleep between passes and any in-flight download.
//! The fetcher observes it cooperatively, so an interrupted download has closed
//! and removed its file before the pass ends. Listing and diffing are never
//! interrupted.

use std::future::Future;

use serde::Serialize;
use tracing::instrument::WithSubscriber;
use tracing::{info, warn, Dispatch};

use crate::config::MirrorConfig;
use crate::contract::ObjectStore;
use crate::diff::difference;
use crate::error::{MirrorError, Result};
use crate::progress::progress_line;
use crate::remote::RemoteListing;
use crate::schedule::{Shutdown, Tick, Ticker};
use crate::{fetch, local, remote};

/// Whether to stop after one pass or keep polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Once,
    Continuous,
}

/// The listings of one pass and their differences.
#[derive(Debug, Clone)]
pub struct SyncSession {
    pub local: Vec<String>,
    pub remote: RemoteListing,
    /// Present locally, absent remotely. Reported, never acted upon.
    pub local_only: Vec<String>,
    /// Present remotely, absent locally. The download worklist.
    pub remote_only: Vec<String>,
}

impl SyncSession {
    pub fn new(local: Vec<String>, remote: RemoteListing) -> Self {
        let local_only = difference(&local, &remote.keys);
        let remote_only = difference(&remote.keys, &local);
        SyncSession {
            local,
            remote,
            local_only,
            remote_only,
        }
    }
}

/// Outcome of a single pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub local_files: usize,
    pub remote_files: usize,
    pub remote_bytes: u64,
    pub local_only: Vec<String>,
    pub downloaded: Vec<String>,
    pub failed: Vec<FailedDownload>,
    /// Set when shutdown cut the worklist short.
    pub interrupted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDownload {
    pub key: String,
    pub error: String,
}

impl SyncReport {
    fn for_session(session: &SyncSession) -> Self {
        SyncReport {
            local_files: session.local.len(),
            remote_files: session.remote.keys.len(),
            remote_bytes: session.remote.total_bytes,
            local_only: session.local_only.clone(),
            ..SyncReport::default()
        }
    }
}

/// Drives passes against one bucket and one sync root.
pub struct Reconciler<S> {
    store: S,
    config: MirrorConfig,
    logger: Option<Dispatch>,
}

impl<S> Reconciler<S>
where
    S: ObjectStore,
{
    pub fn new(store: S, config: MirrorConfig) -> Self {
        Reconciler {
            store,
            config,
            logger: None,
        }
    }

    /// Routes every event emitted by this reconciler to `logger` instead of the
    /// thread's default subscriber.
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Runs in the given mode until done (`Once`) or until shutdown (`Continuous`).
    /// Returns the report of the last pass.
    pub async fn run(&self, mode: SyncMode, shutdown: Shutdown) -> Result<SyncReport> {
        match mode {
            SyncMode::Once => self.synchronise(shutdown).await,
            SyncMode::Continuous => self.watch(shutdown).await,
        }
    }

    /// One pass.
    pub async fn synchronise(&self, mut shutdown: Shutdown) -> Result<SyncReport> {
        self.logged(async move {
            info!("Starting sync pass");
            self.pass(&mut shutdown).await
        })
        .await
    }

    /// Passes separated by the poll interval, until `shutdown` fires.
    ///
    /// A listing error ends the loop with that error.
    pub async fn watch(&self, mut shutdown: Shutdown) -> Result<SyncReport> {
        self.logged(async move {
            let mut ticker = Ticker::new(self.config.poll_interval);
            let mut passes: u64 = 0;
            loop {
                passes += 1;
                info!(pass = passes, "Starting sync pass");
                let report = self.pass(&mut shutdown).await?;
                if report.interrupted {
                    info!(passes, "Shutdown requested, stopping");
                    return Ok(report);
                }

                info!(
                    interval_secs = ticker.period().as_secs_f64(),
                    "Sleeping until next pass"
                );
                if ticker.wait(&mut shutdown).await == Tick::Shutdown {
                    info!(passes, "Shutdown requested, stopping");
                    return Ok(report);
                }
            }
        })
        .await
    }

    async fn logged<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        match &self.logger {
            Some(logger) => fut.with_subscriber(logger.clone()).await,
            None => fut.await,
        }
    }

    async fn pass(&self, shutdown: &mut Shutdown) -> Result<SyncReport> {
        let root = &self.config.sync_dir;
        let bucket = &self.config.storage.bucket;

        info!(sync_dir = %root.display(), "Reading local files");
        let local = local::scan_dir(root)?;

        info!(bucket = %bucket, "Listing remote objects");
        let remote = remote::list_remote(&self.store, bucket).await?;

        let session = SyncSession::new(local, remote);
        let mut report = SyncReport::for_session(&session);

        if !session.local_only.is_empty() {
            warn!(
                count = session.local_only.len(),
                "Found local files not in remote"
            );
            for key in &session.local_only {
                warn!(path = %key, "Local file not in remote");
            }
        }

        if session.remote_only.is_empty() {
            info!("No new remote files");
            return Ok(report);
        }

        let total = session.remote_only.len();
        info!(count = total, "Found new remote files");

        for (i, key) in session.remote_only.iter().enumerate() {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }

            info!(key = %key, "{}", progress_line(key, i + 1, total));
            match self.download(key, shutdown).await {
                Ok(_) => report.downloaded.push(key.clone()),
                Err(MirrorError::Interrupted) => {
                    warn!(key = %key, "Download interrupted by shutdown");
                    report.interrupted = true;
                    break;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to download file");
                    report.failed.push(FailedDownload {
                        key: key.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            downloaded = report.downloaded.len(),
            failed = report.failed.len(),
            "Sync pass finished"
        );
        Ok(report)
    }

    async fn download(&self, key: &str, shutdown: &mut Shutdown) -> Result<u64> {
        let root = &self.config.sync_dir;
        let dest = local::key_to_path(root, key)?;
        local::refuse_links(root, &dest, key).await?;

        fetch::fetch_object(
            &self.store,
            &self.config.storage.bucket,
            key,
            &dest,
            self.config.progress,
            shutdown,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn session_diffs_both_ways() {
        let session = SyncSession::new(
            keys(&["a.txt", "b.txt"]),
            RemoteListing {
                keys: keys(&["a.txt", "c.txt"]),
                total_bytes: 3,
            },
        );
        assert_eq!(session.local_only, keys(&["b.txt"]));
        assert_eq!(session.remote_only, keys(&["c.txt"]));
    }

    #[test]
    fn worklist_follows_remote_order() {
        let session = SyncSession::new(
            keys(&["m"]),
            RemoteListing {
                keys: keys(&["z", "m", "a", "q"]),
                total_bytes: 0,
            },
        );
        assert_eq!(session.remote_only, keys(&["z", "a", "q"]));
    }

    #[test]
    fn report_starts_from_session_counts() {
        let session = SyncSession::new(
            keys(&["a", "b"]),
            RemoteListing {
                keys: keys(&["a"]),
                total_bytes: 42,
            },
        );
        let report = SyncReport::for_session(&session);
        assert_eq!(report.local_files, 2);
        assert_eq!(report.remote_files, 1);
        assert_eq!(report.remote_bytes, 42);
        assert_eq!(report.local_only, keys(&["b"]));
        assert!(report.downloaded.is_empty());
        assert!(!report.interrupted);
    }
}
