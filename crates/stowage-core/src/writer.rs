//! Durable copy of a payload into a destination file.
//!
//! # Design
//! - Destinations are opened with truncation; seekable payloads are rewound first.
//! - The plain path is one `tokio::io::copy` raced against cancellation.
//! - The progress path reads one chunk, writes it fully, then reports; writes never overlap.
//! - Nothing is rolled back: a cancelled or failed write leaves a prefix of the payload behind.

use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CoreResult, SaveError, SaveStage};
use crate::model::{ProgressSink, SavePayload};

/// Chunk size used by the progress-reporting copy.
pub const DEFAULT_CHUNK_SIZE: usize = 81_920;

/// Copies payloads into destination files.
#[derive(Clone, Copy, Debug)]
pub struct StreamWriter {
    chunk_size: usize,
}

impl Default for StreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamWriter {
    /// Writer using [`DEFAULT_CHUNK_SIZE`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Writer using a custom chunk size for the progress path. Zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Configured chunk size.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Copy `payload` into `destination` and return the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Cancelled`] if the token fires, [`SaveError::DestinationUnwritable`]
    /// if the destination cannot be opened and [`SaveError::WriteFailed`] on copy failures.
    pub async fn write(
        &self,
        mut payload: SavePayload,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> CoreResult<u64> {
        ensure_not_cancelled(cancel)?;
        let mut file = open_truncated(destination).await?;

        let outcome: CoreResult<u64> = async {
            payload
                .rewind()
                .await
                .map_err(|source| SaveError::write_failed("rewind_source", destination, source))?;
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(SaveError::Cancelled { stage: SaveStage::Write }),
                result = tokio::io::copy(&mut payload, &mut file) => {
                    result.map_err(|source| SaveError::write_failed("copy", destination, source))
                }
            }
        }
        .await;

        finish(file, destination, outcome).await
    }

    /// Copy `payload` chunk by chunk, reporting `written / total` after every chunk.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Unsupported`] when the payload length is unknown (before the
    /// destination is touched), [`SaveError::LengthMismatch`] when the payload does not match
    /// its length, plus the failures of [`StreamWriter::write`].
    pub async fn write_with_progress(
        &self,
        mut payload: SavePayload,
        destination: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> CoreResult<u64> {
        if !payload.has_known_length() {
            return Err(SaveError::unsupported(
                "write_with_progress",
                "payload length unknown",
            ));
        }
        ensure_not_cancelled(cancel)?;
        let mut file = open_truncated(destination).await?;

        let outcome = self
            .copy_chunks(&mut payload, &mut file, destination, progress, cancel)
            .await;
        finish(file, destination, outcome).await
    }

    async fn copy_chunks(
        &self,
        payload: &mut SavePayload,
        file: &mut File,
        destination: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> CoreResult<u64> {
        payload
            .rewind()
            .await
            .map_err(|source| SaveError::write_failed("rewind_source", destination, source))?;
        let total = payload.length().ok_or(SaveError::Unsupported {
            operation: "write_with_progress",
            reason: "payload length unknown",
        })?;
        debug!(
            destination = %destination.display(),
            total,
            chunk_size = self.chunk_size,
            "starting chunked write"
        );

        let mut buffer = vec![0_u8; self.chunk_size];
        let mut written: u64 = 0;
        loop {
            ensure_not_cancelled(cancel)?;
            let read = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(SaveError::Cancelled { stage: SaveStage::Write });
                }
                result = payload.read(&mut buffer) => result
                    .map_err(|source| SaveError::write_failed("read_chunk", destination, source))?,
            };
            if read == 0 {
                break;
            }

            let next = written + read as u64;
            if next > total {
                return Err(SaveError::LengthMismatch {
                    path: destination.to_path_buf(),
                    expected: total,
                    actual: next,
                });
            }
            file.write_all(&buffer[..read])
                .await
                .map_err(|source| SaveError::write_failed("write_chunk", destination, source))?;
            written = next;
            progress.report(fraction(written, total));
        }

        if written != total {
            return Err(SaveError::LengthMismatch {
                path: destination.to_path_buf(),
                expected: total,
                actual: written,
            });
        }
        Ok(written)
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(written: u64, total: u64) -> f64 {
    (written as f64 / total as f64).min(1.0)
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> CoreResult<()> {
    if cancel.is_cancelled() {
        return Err(SaveError::Cancelled {
            stage: SaveStage::Write,
        });
    }
    Ok(())
}

async fn open_truncated(destination: &Path) -> CoreResult<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(destination)
        .await
        .map_err(|source| SaveError::unwritable("open", destination, source))
}

async fn finish(mut file: File, destination: &Path, outcome: CoreResult<u64>) -> CoreResult<u64> {
    match outcome {
        Ok(written) => {
            file.flush()
                .await
                .map_err(|source| SaveError::write_failed("flush", destination, source))?;
            file.sync_all()
                .await
                .map_err(|source| SaveError::write_failed("sync", destination, source))?;
            Ok(written)
        }
        Err(error) => {
            // Wait for in-flight writes so the handle is released before returning.
            if let Err(flush_error) = file.flush().await {
                warn!(
                    destination = %destination.display(),
                    error = %flush_error,
                    "flush after failed write did not complete"
                );
            }
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use stowage_test_support::fixtures::{payload_bytes, temp_dir};
    use stowage_test_support::progress::ProgressRecorder;
    use stowage_test_support::readers::{FailingReader, StallingReader};
    use tokio::sync::mpsc;
    use tokio::time::{Duration, sleep, timeout};

    #[tokio::test]
    async fn write_copies_all_bytes_and_truncates_existing_content() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("out.bin");
        tokio::fs::write(&destination, vec![9_u8; 4096]).await?;

        let bytes = payload_bytes(1000, 1);
        let written = StreamWriter::new()
            .write(
                SavePayload::from_bytes(bytes.clone()),
                &destination,
                &CancellationToken::new(),
            )
            .await?;
        assert_eq!(written, 1000);
        assert_eq!(tokio::fs::read(&destination).await?, bytes);
        Ok(())
    }

    #[tokio::test]
    async fn write_rewinds_partially_consumed_seekable_source() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("rewound.txt");
        let mut cursor = Cursor::new(b"0123456789".to_vec());
        cursor.set_position(6);

        StreamWriter::new()
            .write(
                SavePayload::seekable(cursor, None),
                &destination,
                &CancellationToken::new(),
            )
            .await?;
        assert_eq!(tokio::fs::read(&destination).await?, b"0123456789");
        Ok(())
    }

    #[tokio::test]
    async fn progress_path_reports_monotonic_fractions_ending_at_one() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("chunked.bin");
        let bytes = payload_bytes(10_000, 2);
        let recorder = ProgressRecorder::new();

        StreamWriter::with_chunk_size(1024)
            .write_with_progress(
                SavePayload::from_bytes(bytes.clone()),
                &destination,
                &recorder.sink(),
                &CancellationToken::new(),
            )
            .await?;

        let values = recorder.values();
        assert_eq!(values.len(), 10);
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(values.iter().all(|value| (0.0..=1.0).contains(value)));
        assert_eq!(values.last().copied(), Some(1.0));
        assert_eq!(tokio::fs::read(&destination).await?, bytes);
        Ok(())
    }

    #[tokio::test]
    async fn progress_path_requires_known_length() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("never.bin");
        let recorder = ProgressRecorder::new();

        let error = StreamWriter::new()
            .write_with_progress(
                SavePayload::from_reader(&b"abc"[..], None),
                &destination,
                &recorder.sink(),
                &CancellationToken::new(),
            )
            .await
            .expect_err("unknown length should be rejected");
        assert!(matches!(error, SaveError::Unsupported { .. }));
        assert!(!destination.exists());
        assert!(recorder.values().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn progress_path_fails_when_payload_is_shorter_than_declared() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("short.bin");
        let recorder = ProgressRecorder::new();

        let error = StreamWriter::with_chunk_size(2)
            .write_with_progress(
                SavePayload::from_reader(&b"abcd"[..], Some(10)),
                &destination,
                &recorder.sink(),
                &CancellationToken::new(),
            )
            .await
            .expect_err("short payload should fail");
        assert!(matches!(
            error,
            SaveError::LengthMismatch {
                expected: 10,
                actual: 4,
                ..
            }
        ));
        assert!(recorder.values().iter().all(|value| *value < 1.0));
        Ok(())
    }

    #[tokio::test]
    async fn progress_path_fails_when_payload_overruns_declared_length() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("long.bin");

        let error = StreamWriter::with_chunk_size(4)
            .write_with_progress(
                SavePayload::from_reader(&b"abcdefgh"[..], Some(6)),
                &destination,
                &|_: f64| {},
                &CancellationToken::new(),
            )
            .await
            .expect_err("overrun should fail");
        assert!(matches!(error, SaveError::LengthMismatch { expected: 6, .. }));
        assert_eq!(tokio::fs::read(&destination).await?, b"abcd");
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_token_leaves_destination_untouched() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("existing.txt");
        tokio::fs::write(&destination, b"keep me").await?;
        let token = CancellationToken::new();
        token.cancel();

        let error = StreamWriter::new()
            .write(SavePayload::from_bytes(b"new".to_vec()), &destination, &token)
            .await
            .expect_err("cancelled");
        assert!(matches!(
            error,
            SaveError::Cancelled {
                stage: SaveStage::Write
            }
        ));
        assert_eq!(tokio::fs::read(&destination).await?, b"keep me");
        Ok(())
    }

    #[tokio::test]
    async fn missing_parent_directory_is_unwritable() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("missing").join("out.txt");

        let error = StreamWriter::new()
            .write(
                SavePayload::from_bytes(b"x".to_vec()),
                &destination,
                &CancellationToken::new(),
            )
            .await
            .expect_err("parent does not exist");
        assert!(matches!(
            error,
            SaveError::DestinationUnwritable {
                operation: "open",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_mid_write_keeps_chunk_aligned_prefix() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("partial.bin");
        let (mut producer, consumer) = tokio::io::duplex(1 << 16);
        producer.write_all(b"0123456789").await?;

        let token = CancellationToken::new();
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let sink = move |value: f64| {
            let _ = progress_tx.send(value);
        };

        let writer_token = token.clone();
        let writer_destination = destination.clone();
        let task = tokio::spawn(async move {
            StreamWriter::with_chunk_size(4)
                .write_with_progress(
                    SavePayload::from_reader(consumer, Some(100)),
                    &writer_destination,
                    &sink,
                    &writer_token,
                )
                .await
        });

        loop {
            let value = timeout(Duration::from_secs(2), progress_rx.recv())
                .await?
                .ok_or_else(|| anyhow::anyhow!("progress channel closed"))?;
            if value >= 0.1 {
                break;
            }
        }
        token.cancel();

        let error = task.await?.expect_err("cancelled write must fail");
        assert!(matches!(
            error,
            SaveError::Cancelled {
                stage: SaveStage::Write
            }
        ));
        assert_eq!(tokio::fs::read(&destination).await?, b"0123456789");
        drop(producer);
        Ok(())
    }

    #[tokio::test]
    async fn progress_path_propagates_read_errors() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("broken.bin");
        let recorder = ProgressRecorder::new();

        let error = StreamWriter::with_chunk_size(2)
            .write_with_progress(
                SavePayload::from_reader(
                    FailingReader::new(b"abcd".to_vec(), "disk gone"),
                    Some(10),
                ),
                &destination,
                &recorder.sink(),
                &CancellationToken::new(),
            )
            .await
            .expect_err("read failure must surface");
        assert!(matches!(
            error,
            SaveError::WriteFailed {
                operation: "read_chunk",
                ..
            }
        ));
        assert!(error.detail().contains("disk gone"));
        assert_eq!(recorder.values(), vec![0.2, 0.4]);
        assert_eq!(tokio::fs::read(&destination).await?, b"abcd");
        Ok(())
    }

    #[tokio::test]
    async fn plain_path_cancellation_mid_copy_fails_and_keeps_prefix() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("stalled.bin");
        let token = CancellationToken::new();

        let writer_token = token.clone();
        let writer_destination = destination.clone();
        let task = tokio::spawn(async move {
            StreamWriter::new()
                .write(
                    SavePayload::from_reader(StallingReader::new(b"abcdefgh".to_vec()), None),
                    &writer_destination,
                    &writer_token,
                )
                .await
        });

        timeout(Duration::from_secs(2), async {
            loop {
                let len = tokio::fs::metadata(&destination)
                    .await
                    .map_or(0, |meta| meta.len());
                if len == 8 {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await?;
        token.cancel();

        let error = task.await?.expect_err("cancelled copy must fail");
        assert!(matches!(
            error,
            SaveError::Cancelled {
                stage: SaveStage::Write
            }
        ));
        assert_eq!(tokio::fs::read(&destination).await?, b"abcdefgh");
        Ok(())
    }
}
