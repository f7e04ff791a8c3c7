//! Single-object download into the sync root.

use std::io::ErrorKind;
use std::path::Path;

use indicatif::ProgressBar;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::contract::{ObjectReader, ObjectStore};
use crate::error::{MirrorError, Result};
use crate::progress::ProgressDisplay;
use crate::schedule::Shutdown;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Downloads `key` from `bucket` into `dest`, returning the number of bytes written.
///
/// Parent directories are created as needed and `dest` is truncated if it
/// exists. Shutdown is observed while waiting on the store and between reads;
/// once `dest` has been created, any failure or interruption flushes and closes
/// the handle and then removes the partial file.
pub async fn fetch_object<S>(
    store: &S,
    bucket: &str,
    key: &str,
    dest: &Path,
    display: ProgressDisplay,
    shutdown: &mut Shutdown,
) -> Result<u64>
where
    S: ObjectStore + ?Sized,
{
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| MirrorError::io(parent, e))?;
    }

    let stat = tokio::select! {
        biased;
        _ = shutdown.triggered() => return Err(MirrorError::Interrupted),
        stat = store.stat_object(bucket, key) => stat.map_err(|source| MirrorError::Stat {
            key: key.to_string(),
            source,
        })?,
    };

    let mut reader = tokio::select! {
        biased;
        _ = shutdown.triggered() => return Err(MirrorError::Interrupted),
        reader = store.get_object(bucket, key) => reader.map_err(|source| MirrorError::Open {
            key: key.to_string(),
            source,
        })?,
    };

    // nothing is on disk yet
    if shutdown.is_triggered() {
        return Err(MirrorError::Interrupted);
    }

    let bar = display.transfer_bar(stat.size);
    let copied = {
        let mut out = File::create(dest)
            .await
            .map_err(|e| MirrorError::io(dest, e))?;
        let copied = copy_with_progress(&mut reader, &mut out, &bar, shutdown).await;
        if !matches!(copied, Ok(Copied::Complete(_))) {
            // let writes already handed to the blocking pool land before the handle drops
            let _ = out.flush().await;
        }
        copied
    };

    match copied {
        Ok(Copied::Complete(bytes)) => {
            bar.finish_and_clear();
            if bytes != stat.size {
                debug!(
                    key,
                    expected = stat.size,
                    written = bytes,
                    "Object size changed during transfer"
                );
            }
            Ok(bytes)
        }
        Ok(Copied::Interrupted) => {
            bar.abandon();
            remove_partial(dest).await;
            Err(MirrorError::Interrupted)
        }
        Err(e) => {
            bar.abandon();
            remove_partial(dest).await;
            Err(MirrorError::io(dest, e))
        }
    }
}

enum Copied {
    Complete(u64),
    Interrupted,
}

enum Step {
    Read(std::io::Result<usize>),
    Shutdown,
}

async fn copy_with_progress(
    reader: &mut ObjectReader,
    out: &mut File,
    bar: &ProgressBar,
    shutdown: &mut Shutdown,
) -> std::io::Result<Copied> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut written: u64 = 0;
    loop {
        let step = tokio::select! {
            biased;
            _ = shutdown.triggered() => Step::Shutdown,
            read = reader.read(&mut buf) => Step::Read(read),
        };
        let n = match step {
            Step::Shutdown => return Ok(Copied::Interrupted),
            Step::Read(read) => read?,
        };
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).await?;
        written += n as u64;
        bar.inc(n as u64);
    }
    out.flush().await?;
    Ok(Copied::Complete(written))
}

/// Removes a partially written download. A missing file is not an error.
pub async fn remove_partial(dest: &Path) {
    match fs::remove_file(dest).await {
        Ok(()) => debug!(path = %dest.display(), "Removed partial download"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dest.display(), error = %e, "Failed to clean up partial download"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockObjectStore, ObjectStat};
    use crate::schedule::shutdown_channel;
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn store_serving(body: &'static [u8]) -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store.expect_stat_object().returning(move |_, key| {
            Ok(ObjectStat {
                key: key.to_string(),
                size: body.len() as u64,
            })
        });
        store
            .expect_get_object()
            .returning(move |_, _| Ok(Box::pin(Cursor::new(body)) as ObjectReader));
        store
    }

    #[tokio::test]
    async fn writes_object_and_creates_parents() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("shows/season 1/e01.mkv");
        let store = store_serving(b"episode bytes");

        let written = fetch_object(
            &store,
            "media",
            "shows/season 1/e01.mkv",
            &dest,
            ProgressDisplay::Hidden,
            &mut Shutdown::never(),
        )
        .await
        .unwrap();

        assert_eq!(written, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"episode bytes");
    }

    #[tokio::test]
    async fn truncates_existing_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a.txt");
        std::fs::write(&dest, b"a much longer stale body").unwrap();
        let store = store_serving(b"new");

        fetch_object(
            &store,
            "media",
            "a.txt",
            &dest,
            ProgressDisplay::Hidden,
            &mut Shutdown::never(),
        )
        .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn stat_failure_is_reported_before_any_file_is_created() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a.txt");
        let mut store = MockObjectStore::new();
        store
            .expect_stat_object()
            .returning(|_, _| Err("no such key".into()));
        store.expect_get_object().never();

        let err = fetch_object(
            &store,
            "media",
            "a.txt",
            &dest,
            ProgressDisplay::Hidden,
            &mut Shutdown::never(),
        )
        .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::Stat { .. }), "got {err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn shutdown_while_opening_leaves_no_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a.txt");
        let (trigger, mut shutdown) = shutdown_channel();
        let trigger = Arc::new(trigger);

        let mut store = MockObjectStore::new();
        store.expect_stat_object().returning(|_, key| {
            Ok(ObjectStat {
                key: key.to_string(),
                size: 3,
            })
        });
        let fire = trigger.clone();
        store.expect_get_object().returning(move |_, _| {
            fire.trigger();
            Ok(Box::pin(Cursor::new(&b"new"[..])) as ObjectReader)
        });

        let err = fetch_object(
            &store,
            "media",
            "a.txt",
            &dest,
            ProgressDisplay::Hidden,
            &mut shutdown,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MirrorError::Interrupted), "got {err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn failed_copy_removes_partial_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a.txt");
        let mut store = MockObjectStore::new();
        store.expect_stat_object().returning(|_, key| {
            Ok(ObjectStat {
                key: key.to_string(),
                size: 10,
            })
        });
        store.expect_get_object().returning(|_, _| {
            let body = Cursor::new(&b"par"[..]).chain(FailingRead);
            Ok(Box::pin(body) as ObjectReader)
        });

        let err = fetch_object(
            &store,
            "media",
            "a.txt",
            &dest,
            ProgressDisplay::Hidden,
            &mut Shutdown::never(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MirrorError::Io { .. }), "got {err:?}");
        assert!(!dest.exists());
    }

    struct FailingRead;

    impl tokio::io::AsyncRead for FailingRead {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )))
        }
    }

    #[tokio::test]
    async fn remove_partial_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("never-written");
        remove_partial(&dest).await;

        std::fs::write(&dest, b"partial").unwrap();
        remove_partial(&dest).await;
        assert!(!dest.exists());
    }
}
