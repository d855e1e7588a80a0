use std::io;

mod sync;

#[cfg(feature = "tokio")]
mod tokio;

pub(crate) use sync::SyncBoundedLineReader;

#[cfg(feature = "tokio")]
pub(crate) use self::tokio::AsyncBoundedLineReader;

const CHUNK_SIZE_BYTES: usize = 8192;

#[derive(Debug)]
pub(crate) enum BoundedLine {
    Line {
        line_number: usize,
        bytes: Vec<u8>,
    },
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    IoError {
        line_number: usize,
        error: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ReadState {
    Reading,
    Eof,
    Failed,
}

/// Chunk scanning shared by the sync and async readers.
///
/// An oversized line or a read failure ends the stream; only a clean
/// zero-byte read counts as end of input.
struct LineAssembler {
    max_line_bytes: usize,
    buffer: Box<[u8]>,
    buffer_pos: usize,
    buffer_len: usize,
    current_line: Vec<u8>,
    line_number: usize,
    state: ReadState,
}

impl LineAssembler {
    fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            buffer: vec![0u8; CHUNK_SIZE_BYTES].into_boxed_slice(),
            buffer_pos: 0,
            buffer_len: 0,
            current_line: Vec::new(),
            line_number: 0,
            state: ReadState::Reading,
        }
    }

    fn is_done(&self) -> bool {
        self.state != ReadState::Reading
    }

    fn reached_eof(&self) -> bool {
        self.state == ReadState::Eof
    }

    fn needs_fill(&self) -> bool {
        self.buffer_pos >= self.buffer_len
    }

    fn spare(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Records a read of `n` bytes into [`LineAssembler::spare`].
    fn filled(&mut self, n: usize) -> Option<BoundedLine> {
        self.buffer_pos = 0;
        self.buffer_len = n;
        if n > 0 {
            return None;
        }
        self.state = ReadState::Eof;
        // A final line without terminator still counts.
        (!self.current_line.is_empty()).then(|| self.finish_line())
    }

    fn failed(&mut self, error: io::Error) -> BoundedLine {
        self.state = ReadState::Failed;
        self.line_number += 1;
        BoundedLine::IoError {
            line_number: self.line_number,
            error,
        }
    }

    fn scan(&mut self) -> Option<BoundedLine> {
        let (take, newline) = {
            let pending = &self.buffer[self.buffer_pos..self.buffer_len];
            match pending.iter().position(|b| *b == b'\n') {
                Some(idx) => (idx, true),
                None => (pending.len(), false),
            }
        };

        let observed_bytes = self.current_line.len().saturating_add(take);
        if observed_bytes > self.max_line_bytes {
            self.state = ReadState::Failed;
            self.line_number += 1;
            self.current_line.clear();
            return Some(BoundedLine::LineTooLong {
                line_number: self.line_number,
                observed_bytes,
                max_line_bytes: self.max_line_bytes,
            });
        }

        let end = self.buffer_pos + take;
        self.current_line
            .extend_from_slice(&self.buffer[self.buffer_pos..end]);
        self.buffer_pos = end + usize::from(newline);
        newline.then(|| self.finish_line())
    }

    fn finish_line(&mut self) -> BoundedLine {
        self.line_number += 1;
        BoundedLine::Line {
            line_number: self.line_number,
            bytes: std::mem::take(&mut self.current_line),
        }
    }
}
