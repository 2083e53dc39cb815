//! Byte sources consumed by a save.
//!
//! # Design
//! - A payload is owned by exactly one save; moving it into the request is the consumption.
//! - Seekable sources are rewound before copying and can report their own length.
//! - Sequential sources only carry the length their producer declared.

use std::fmt;
use std::io::{self, Cursor, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, ReadBuf};

/// Random-access byte source accepted by [`SavePayload::seekable`].
pub trait SeekableSource: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> SeekableSource for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

enum Source {
    Seekable(Box<dyn SeekableSource>),
    Sequential(Box<dyn AsyncRead + Send + Unpin>),
}

/// Single-consumer byte source with an optional known length.
pub struct SavePayload {
    source: Source,
    length: Option<u64>,
}

impl SavePayload {
    /// Wrap an in-memory buffer.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let length = u64::try_from(bytes.len()).ok();
        Self {
            source: Source::Seekable(Box::new(Cursor::new(bytes))),
            length,
        }
    }

    /// Wrap an open file; its length is taken from the file metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub async fn from_file(file: File) -> io::Result<Self> {
        let length = file.metadata().await?.len();
        Ok(Self::seekable(file, Some(length)))
    }

    /// Open the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or inspected.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path).await?;
        Self::from_file(file).await
    }

    /// Wrap a random-access reader. When `length` is `None` it is measured before copying.
    #[must_use]
    pub fn seekable<R>(reader: R, length: Option<u64>) -> Self
    where
        R: AsyncRead + AsyncSeek + Send + Unpin + 'static,
    {
        Self {
            source: Source::Seekable(Box::new(reader)),
            length,
        }
    }

    /// Wrap a forward-only reader with the length its producer declared, if any.
    #[must_use]
    pub fn from_reader<R>(reader: R, length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            source: Source::Sequential(Box::new(reader)),
            length,
        }
    }

    /// Total payload length when known.
    #[must_use]
    pub const fn length(&self) -> Option<u64> {
        self.length
    }

    /// Whether the source supports rewinding.
    #[must_use]
    pub const fn is_seekable(&self) -> bool {
        matches!(self.source, Source::Seekable(_))
    }

    /// Whether a total length is available, either declared or measurable.
    #[must_use]
    pub const fn has_known_length(&self) -> bool {
        self.length.is_some() || self.is_seekable()
    }

    /// Rewind seekable sources to their start, measuring their length when it was not declared.
    pub(crate) async fn rewind(&mut self) -> io::Result<()> {
        if let Source::Seekable(reader) = &mut self.source {
            if self.length.is_none() {
                self.length = Some(reader.seek(SeekFrom::End(0)).await?);
            }
            reader.seek(SeekFrom::Start(0)).await?;
        }
        Ok(())
    }
}

impl AsyncRead for SavePayload {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().source {
            Source::Seekable(reader) => Pin::new(reader).poll_read(cx, buf),
            Source::Sequential(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

impl fmt::Debug for SavePayload {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SavePayload")
            .field("seekable", &self.is_seekable())
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn bytes_payload_is_seekable_with_length() -> io::Result<()> {
        let mut payload = SavePayload::from_bytes(b"hello".to_vec());
        assert!(payload.is_seekable());
        assert_eq!(payload.length(), Some(5));

        let mut first = [0_u8; 2];
        payload.read_exact(&mut first).await?;
        payload.rewind().await?;
        let mut all = Vec::new();
        payload.read_to_end(&mut all).await?;
        assert_eq!(all, b"hello");
        Ok(())
    }

    #[tokio::test]
    async fn seekable_payload_measures_missing_length() -> io::Result<()> {
        let mut payload = SavePayload::seekable(Cursor::new(vec![7_u8; 42]), None);
        assert_eq!(payload.length(), None);
        assert!(payload.has_known_length());
        payload.rewind().await?;
        assert_eq!(payload.length(), Some(42));
        Ok(())
    }

    #[tokio::test]
    async fn sequential_payload_keeps_declared_length() -> io::Result<()> {
        let mut payload = SavePayload::from_reader(&b"abc"[..], None);
        assert!(!payload.is_seekable());
        assert!(!payload.has_known_length());
        payload.rewind().await?;
        assert_eq!(payload.length(), None);

        let declared = SavePayload::from_reader(&b"abc"[..], Some(3));
        assert!(declared.has_known_length());
        assert!(format!("{declared:?}").contains("seekable: false"));
        Ok(())
    }
}
