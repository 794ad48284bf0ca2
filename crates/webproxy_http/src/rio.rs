//! Buffered, robust socket reader.
//!
//! Wraps any `AsyncRead` and hands back whole lines or bounded chunks no
//! matter how the peer fragments its writes.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Duration, timeout};

/// Longest line handed back in one piece; longer lines are split.
pub const MAX_LINE: usize = 8192;

const READ_SIZE: usize = 4096;

pub struct LineReader<S> {
    inner: S,
    buf: BytesMut,
    eof: bool,
}

impl<S> LineReader<S>
where
    S: AsyncRead + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_SIZE),
            eof: false,
        }
    }

    /// Next line including its `\n`.
    ///
    /// At end of stream the remaining partial bytes are returned as-is; an
    /// empty result means the peer closed with nothing left to read.
    pub async fn read_line(&mut self) -> io::Result<Bytes> {
        loop {
            let window = self.buf.len().min(MAX_LINE);
            if let Some(pos) = self.buf[..window].iter().position(|b| *b == b'\n') {
                return Ok(self.buf.split_to(pos + 1).freeze());
            }
            if self.buf.len() >= MAX_LINE {
                return Ok(self.buf.split_to(MAX_LINE).freeze());
            }
            if self.fill().await? == 0 {
                return Ok(self.buf.split().freeze());
            }
        }
    }

    /// Same as [`read_line`](Self::read_line) but gives up with
    /// `ErrorKind::TimedOut` when no line completes within `dur`.
    pub async fn read_line_timeout(&mut self, dur: Duration) -> io::Result<Bytes> {
        match timeout(dur, self.read_line()).await {
            Ok(res) => res,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "timed out waiting for a line",
            )),
        }
    }

    /// Exactly `n` bytes, or fewer if the stream closes first.
    pub async fn read_exact(&mut self, n: usize) -> io::Result<Bytes> {
        while self.buf.len() < n {
            if self.fill().await? == 0 {
                break;
            }
        }
        let take = n.min(self.buf.len());
        Ok(self.buf.split_to(take).freeze())
    }

    /// Up to `max` bytes: buffered leftovers first, otherwise a single read.
    /// Empty at end of stream.
    pub async fn read_chunk(&mut self, max: usize) -> io::Result<Bytes> {
        if self.buf.is_empty() && self.fill().await? == 0 {
            return Ok(Bytes::new());
        }
        let take = max.min(self.buf.len());
        Ok(self.buf.split_to(take).freeze())
    }

    /// Bytes read from the socket but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    async fn fill(&mut self) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        let mut tmp = [0u8; READ_SIZE];
        let n = loop {
            match self.inner.read(&mut tmp).await {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&tmp[..n]);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn read_line_joins_partial_reads() {
        let mock = Builder::new()
            .read(b"GET http://a/ ")
            .read(b"HTTP/1.0\r")
            .read(b"\nHost: a\r\n")
            .build();
        let mut rio = LineReader::new(mock);

        let line = rio.read_line().await.unwrap();
        assert_eq!(&line[..], b"GET http://a/ HTTP/1.0\r\n");
        let line = rio.read_line().await.unwrap();
        assert_eq!(&line[..], b"Host: a\r\n");
        let line = rio.read_line().await.unwrap();
        assert!(line.is_empty());
    }

    #[tokio::test]
    async fn read_line_returns_partial_tail_at_eof() {
        let mock = Builder::new().read(b"abc\r\ntail").build();
        let mut rio = LineReader::new(mock);

        assert_eq!(&rio.read_line().await.unwrap()[..], b"abc\r\n");
        assert_eq!(&rio.read_line().await.unwrap()[..], b"tail");
        assert!(rio.read_line().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_line_splits_overlong_lines() {
        let data = vec![b'x'; MAX_LINE + 10];
        let (mut tx, rx) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            tx.write_all(&data).await.unwrap();
            tx.write_all(b"\n").await.unwrap();
        });

        let mut rio = LineReader::new(rx);
        let first = rio.read_line().await.unwrap();
        assert_eq!(first.len(), MAX_LINE);
        let second = rio.read_line().await.unwrap();
        assert_eq!(second.len(), 11);
        assert_eq!(second.last(), Some(&b'\n'));
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn read_line_caps_pieces_when_reads_are_large() {
        let mut tail = vec![b'x'; 1000];
        tail.push(b'\n');
        let mock = Builder::new()
            .read(&[b'x'; 4000])
            .read(&[b'x'; 4000])
            .read(&tail)
            .build();
        let mut rio = LineReader::new(mock);

        let first = rio.read_line().await.unwrap();
        assert_eq!(first.len(), MAX_LINE);
        assert!(!first.contains(&b'\n'));
        let second = rio.read_line().await.unwrap();
        assert_eq!(second.len(), 9001 - MAX_LINE);
        assert_eq!(second.last(), Some(&b'\n'));
        assert!(rio.read_line().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_exact_stops_short_on_close() {
        let mock = Builder::new().read(b"12").read(b"345").build();
        let mut rio = LineReader::new(mock);

        assert_eq!(&rio.read_exact(4).await.unwrap()[..], b"1234");
        assert_eq!(&rio.read_exact(4).await.unwrap()[..], b"5");
        assert!(rio.read_exact(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_chunk_drains_leftovers_before_reading() {
        let mock = Builder::new().read(b"line\r\nbody").read(b"more").build();
        let mut rio = LineReader::new(mock);

        assert_eq!(&rio.read_line().await.unwrap()[..], b"line\r\n");
        assert_eq!(rio.buffered(), 4);
        assert_eq!(&rio.read_chunk(2).await.unwrap()[..], b"bo");
        assert_eq!(&rio.read_chunk(100).await.unwrap()[..], b"dy");
        assert_eq!(&rio.read_chunk(100).await.unwrap()[..], b"more");
        assert!(rio.read_chunk(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_line_propagates_transport_errors() {
        let mock = Builder::new()
            .read(b"GET ")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut rio = LineReader::new(mock);

        let err = rio.read_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn read_line_timeout_fires_on_silent_peer() {
        let (_tx, rx) = tokio::io::duplex(64);
        let mut rio = LineReader::new(rx);

        let err = rio
            .read_line_timeout(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
