use futures_util::Stream;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::debug;

use super::ByteProgress;

/// Chunks read ahead of the transport.
const READ_AHEAD: usize = 4;

/// Upload body that reads a file in chunks on a background task and reports
/// `(bytes_sent, total)` each time the transport pulls a chunk.
///
/// Dropping the stream (e.g. when the request is aborted) closes the channel,
/// which stops the reader task.
pub struct ProgressBody {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    sent: u64,
    total: u64,
    progress: ByteProgress,
}

impl ProgressBody {
    pub async fn open(path: &Path, chunk_size: usize, progress: ByteProgress) -> io::Result<Self> {
        let mut file = File::open(path).await?;
        let total = file.metadata().await?.len();
        let (tx, rx) = mpsc::channel(READ_AHEAD);
        let chunk_size = chunk_size.max(1);

        tokio::spawn(async move {
            loop {
                let mut buf = vec![0u8; chunk_size];
                let chunk = match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        buf.truncate(n);
                        Ok(buf)
                    }
                    Err(e) => Err(e),
                };
                let failed = chunk.is_err();
                if tx.send(chunk).await.is_err() {
                    debug!("Upload body dropped, stopping file reader");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        Ok(Self {
            rx,
            sent: 0,
            total,
            progress,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Stream for ProgressBody {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                (this.progress)(this.sent, this.total);
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}
