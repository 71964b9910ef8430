use std::io;
use std::time::Duration;

use bladelink_frame::{BladeCodec, FrameError};
use bytes::BytesMut;
use futures_util::SinkExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

const READ_CAPACITY: usize = 4096;

/// Open a TCP connection to `host:port`, giving up after `timeout`.
pub(crate) async fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {host}:{port} timed out after {timeout:?}"),
            )
        })??;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// One outbound frame queued for the writer task.
pub(crate) struct WriteRequest {
    pub frame: String,
    /// `None` for fire-and-forget frames such as heartbeats.
    pub reply: Option<oneshot::Sender<Result<()>>>,
}

/// An established session: the read side, its buffer and the writer task.
///
/// Dropping a `Link` aborts the writer and closes both socket halves.
pub(crate) struct Link {
    pub reader: OwnedReadHalf,
    pub buffer: BytesMut,
    pub codec: BladeCodec,
    writes: mpsc::UnboundedSender<WriteRequest>,
    /// Resolves when the writer hits a socket error.
    pub write_failed: oneshot::Receiver<io::Error>,
    writer: JoinHandle<()>,
}

impl Link {
    pub fn open(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        let (writes, queue) = mpsc::unbounded_channel();
        let (failed_tx, write_failed) = oneshot::channel();
        let writer = tokio::spawn(write_loop(writer, queue, failed_tx));
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CAPACITY),
            codec: BladeCodec::new(),
            writes,
            write_failed,
            writer,
        }
    }

    /// Make room for the next read.
    pub fn reserve(&mut self) {
        self.buffer.reserve(READ_CAPACITY);
    }

    /// Queue a frame. Returns the request back if the writer is gone.
    pub fn write(&self, request: WriteRequest) -> std::result::Result<(), WriteRequest> {
        self.writes.send(request).map_err(|err| err.0)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

async fn write_loop(
    half: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<WriteRequest>,
    failed: oneshot::Sender<io::Error>,
) {
    let mut sink = FramedWrite::new(half, BladeCodec::new());
    while let Some(WriteRequest { frame, reply }) = queue.recv().await {
        match sink.send(frame.as_str()).await {
            Ok(()) => {
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
            }
            Err(FrameError::Io(err)) => {
                warn!(error = %err, "socket write failed");
                if let Some(reply) = reply {
                    let _ = reply.send(Err(SessionError::Io(io::Error::new(
                        err.kind(),
                        err.to_string(),
                    ))));
                }
                let _ = failed.send(err);
                return;
            }
            Err(err) => {
                debug!(error = %err, %frame, "frame rejected by encoder");
                if let Some(reply) = reply {
                    let _ = reply.send(Err(err.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn writer_appends_crlf_and_replies() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = connect("127.0.0.1", port, Duration::from_secs(1)).await.unwrap();
        let (mut device, _) = listener.accept().await.unwrap();
        let link = Link::open(stream);

        let (reply, done) = oneshot::channel();
        assert!(link
            .write(WriteRequest {
                frame: "<SYS?>".into(),
                reply: Some(reply),
            })
            .is_ok());
        done.await.unwrap().unwrap();

        let mut received = [0u8; 8];
        device.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"<SYS?>\r\n");
    }

    #[tokio::test]
    async fn dropping_link_closes_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = connect("127.0.0.1", port, Duration::from_secs(1)).await.unwrap();
        let (mut device, _) = listener.accept().await.unwrap();
        drop(Link::open(stream));

        let mut buf = [0u8; 1];
        let n = device.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
