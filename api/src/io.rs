//! Socket-level inactivity deadlines for admin connections.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

/// Applies read and write inactivity deadlines to a stream. A deadline is
/// armed when an operation first returns pending and cleared on progress, so
/// an idle or stalled peer surfaces as `TimedOut` instead of parking the
/// connection forever.
pub(crate) struct TimedStream<S> {
    inner: S,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S> TimedStream<S> {
    pub(crate) fn new(
        inner: S,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner,
            read_timeout,
            write_timeout,
            read_deadline: None,
            write_deadline: None,
        }
    }

    fn poll_deadline(
        deadline: &mut Option<Pin<Box<Sleep>>>,
        timeout: Option<Duration>,
        cx: &mut Context<'_>,
        what: &str,
    ) -> Poll<io::Result<()>> {
        let Some(timeout) = timeout else {
            return Poll::Pending;
        };
        let sleep = deadline.get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
        match sleep.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{what} timed out"),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TimedStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.read_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => {
                Self::poll_deadline(&mut this.read_deadline, this.read_timeout, cx, "read")
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TimedStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => {
                match Self::poll_deadline(&mut this.write_deadline, this.write_timeout, cx, "write")
                {
                    Poll::Ready(Err(error)) => Poll::Ready(Err(error)),
                    _ => Poll::Pending,
                }
            }
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn read_times_out_without_data() {
        let (client, server) = tokio::io::duplex(64);
        let mut timed = TimedStream::new(server, Some(Duration::from_millis(50)), None);
        let mut buf = [0u8; 8];
        let err = timed.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        drop(client);
    }

    #[tokio::test]
    async fn read_passes_data_through() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut timed = TimedStream::new(server, Some(Duration::from_secs(5)), None);
        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        timed.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn write_times_out_when_the_peer_stalls() {
        let (_client, server) = tokio::io::duplex(4);
        let mut timed = TimedStream::new(server, None, Some(Duration::from_millis(50)));
        // Overfill the pipe; nobody ever drains the other end.
        let err = timed.write_all(&[0u8; 64]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn no_deadlines_means_no_interference() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut timed = TimedStream::new(server, None, None);
        client.write_all(b"ok").await.unwrap();
        let mut buf = [0u8; 2];
        timed.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok");
    }
}
