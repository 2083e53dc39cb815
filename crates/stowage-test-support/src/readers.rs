//! Byte sources that misbehave on purpose.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

fn read_prefix(prefix: &[u8], position: &mut usize, buf: &mut ReadBuf<'_>) -> bool {
    let remaining = &prefix[*position..];
    if remaining.is_empty() {
        return false;
    }
    let take = remaining.len().min(buf.remaining());
    buf.put_slice(&remaining[..take]);
    *position += take;
    true
}

/// Yields `prefix`, then fails every further read with `message`.
#[derive(Debug, Clone)]
pub struct FailingReader {
    prefix: Vec<u8>,
    position: usize,
    message: String,
}

impl FailingReader {
    /// Reader failing after `prefix` has been consumed.
    #[must_use]
    pub fn new(prefix: Vec<u8>, message: impl Into<String>) -> Self {
        Self {
            prefix,
            position: 0,
            message: message.into(),
        }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if read_prefix(&this.prefix, &mut this.position, buf) {
            return Poll::Ready(Ok(()));
        }
        Poll::Ready(Err(io::Error::other(this.message.clone())))
    }
}

/// Yields `prefix`, then never produces another byte.
///
/// Only useful when the read is raced against something else, such as a cancellation token.
#[derive(Debug, Clone)]
pub struct StallingReader {
    prefix: Vec<u8>,
    position: usize,
}

impl StallingReader {
    /// Reader stalling after `prefix` has been consumed.
    #[must_use]
    pub const fn new(prefix: Vec<u8>) -> Self {
        Self {
            prefix,
            position: 0,
        }
    }
}

impl AsyncRead for StallingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if read_prefix(&this.prefix, &mut this.position, buf) {
            return Poll::Ready(Ok(()));
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::time::{Duration, timeout};

    #[tokio::test]
    async fn failing_reader_errors_after_prefix() -> io::Result<()> {
        let mut reader = FailingReader::new(b"abc".to_vec(), "gone");
        let mut buffer = Vec::new();
        let error = reader
            .read_to_end(&mut buffer)
            .await
            .expect_err("reader fails");
        assert_eq!(error.to_string(), "gone");
        assert_eq!(buffer, b"abc");
        Ok(())
    }

    #[tokio::test]
    async fn stalling_reader_never_finishes() {
        let mut reader = StallingReader::new(b"xy".to_vec());
        let mut buffer = [0_u8; 8];
        let read = reader.read(&mut buffer).await.expect("prefix");
        assert_eq!(&buffer[..read], b"xy");
        assert!(
            timeout(Duration::from_millis(20), reader.read(&mut buffer))
                .await
                .is_err()
        );
    }
}
