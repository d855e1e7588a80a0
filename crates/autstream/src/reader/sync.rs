use std::io::{ErrorKind, Read};

use super::{BoundedLine, LineAssembler};

/// Line reader over a blocking byte source with a per-line size bound.
pub(crate) struct SyncBoundedLineReader<R: Read> {
    reader: R,
    lines: LineAssembler,
}

impl<R: Read> SyncBoundedLineReader<R> {
    pub(crate) fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            lines: LineAssembler::new(max_line_bytes),
        }
    }

    /// True once a clean end of input was read.
    pub(crate) fn reached_eof(&self) -> bool {
        self.lines.reached_eof()
    }

    pub(crate) fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for SyncBoundedLineReader<R> {
    type Item = BoundedLine;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.lines.is_done() {
                return None;
            }

            if self.lines.needs_fill() {
                match self.reader.read(self.lines.spare()) {
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
