use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{BoundedLine, LineAssembler};

/// Async counterpart of [`SyncBoundedLineReader`](super::SyncBoundedLineReader).
pub(crate) struct AsyncBoundedLineReader<R: AsyncRead + Unpin> {
    reader: R,
    lines: LineAssembler,
}

impl<R: AsyncRead + Unpin> AsyncBoundedLineReader<R> {
    pub(crate) fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            lines: LineAssembler::new(max_line_bytes),
        }
    }

    pub(crate) fn reached_eof(&self) -> bool {
        self.lines.reached_eof()
    }

    pub(crate) fn into_inner(self) -> R {
        self.reader
    }

    pub(crate) async fn next_line(&mut self) -> Option<BoundedLine> {
        loop {
            if self.lines.is_done() {
                return None;
            }

            if self.lines.needs_fill() {
                match self.reader.read(self.lines.spare()).await {
                    Ok(n) => {
                        if let Some(line) = self.lines.filled(n) {
                            return Some(line);
                        }
                        continue;
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => return Some(self.lines.failed(err)),
                }
            }

            if let Some(line) = self.lines.scan() {
                return Some(line);
            }
        }
    }
}
