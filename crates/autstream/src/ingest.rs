use std::{
    collections::VecDeque,
    fs::File,
    io::{self, Cursor, Read},
    iter::FusedIterator,
    process::ChildStdout,
};

use tracing::{debug, warn};

use crate::config::{IngestConfig, IngestLimits, ParseOptions};
use crate::dictionary::ApDictionary;
use crate::error::IngestError;
use crate::parser::AutomatonParser;
use crate::process::{self, CommandMode, CommandOutput, RunningCommand};
use crate::reader::{BoundedLine, SyncBoundedLineReader};
use crate::source::{Source, SourceKind};

fn decode_line(line: BoundedLine, provenance: &str) -> Result<(usize, String), IngestError> {
    match line {
        BoundedLine::Line { line_number, bytes } => {
            let mut text = String::from_utf8(bytes).map_err(|_| IngestError::InvalidUtf8 {
                provenance: provenance.to_string(),
                line_number,
            })?;
            if text.ends_with('\r') {
                text.pop();
            }
            Ok((line_number, text))
        }
        BoundedLine::LineTooLong {
            line_number,
            observed_bytes,
            max_line_bytes,
        } => Err(IngestError::LineTooLong {
            provenance: provenance.to_string(),
            line_number,
            observed_bytes,
            max_line_bytes,
        }),
        BoundedLine::IoError { line_number, error } => {
            debug!(provenance, line_number, "read failed");
            Err(IngestError::Io {
                provenance: provenance.to_string(),
                source: error,
            })
        }
    }
}

/// A parser bound to one open byte channel.
pub struct AutomatonReader<R: Read, P: AutomatonParser> {
    lines: SyncBoundedLineReader<R>,
    parser: P,
    provenance: String,
    debug: bool,
    exhausted: bool,
}

impl<R: Read, P: AutomatonParser> AutomatonReader<R, P> {
    pub fn new(reader: R, provenance: &str, options: &ParseOptions, limits: IngestLimits) -> Self {
        Self {
            lines: SyncBoundedLineReader::new(reader, limits.max_line_bytes),
            parser: P::open(provenance, options),
            provenance: provenance.to_string(),
            debug: options.debug,
            exhausted: false,
        }
    }

    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    /// Reads until the parser completes an automaton. `Ok(None)` once the
    /// channel reached its natural end.
    pub fn next_automaton(
        &mut self,
        dict: &ApDictionary,
    ) -> Result<Option<P::Automaton>, IngestError> {
        if self.exhausted {
            return Ok(None);
        }

        while let Some(line) = self.lines.next() {
            let (line_number, text) = decode_line(line, &self.provenance)?;
            if self.debug {
                debug!(
                    provenance = %self.provenance,
                    line_number,
                    line = %text,
                    "parser input"
                );
            }
            if let Some(automaton) = self.parser.parse_line(&text, line_number, dict)? {
                return Ok(Some(automaton));
            }
        }

        if !self.lines.reached_eof() {
            // The stream failed earlier and that error was already returned.
            return Ok(None);
        }
        self.exhausted = true;
        self.parser.finish(dict).map_err(IngestError::from)
    }

    /// True once the parser has seen the end of the channel.
    pub fn reached_eof(&self) -> bool {
        self.exhausted
    }

    /// Splits the reader so the parser can be released before the channel.
    pub fn into_parts(self) -> (P, R) {
        (self.parser, self.lines.into_inner())
    }
}

enum Channel {
    File(File),
    Inline(Cursor<Vec<u8>>),
    Pipe(ChildStdout),
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Channel::File(file) => file.read(buf),
            Channel::Inline(cursor) => cursor.read(buf),
            Channel::Pipe(pipe) => pipe.read(buf),
        }
    }
}

/// Live state for the source currently being read.
struct Session<P: AutomatonParser> {
    source: Source,
    reader: AutomatonReader<Channel, P>,
    process: Option<RunningCommand>,
}

impl<P: AutomatonParser> Session<P> {
    fn open(source: Source, config: &IngestConfig) -> Result<Self, IngestError> {
        let mut process = None;
        let channel = match source.kind() {
            SourceKind::File => {
                let file = File::open(source.text()).map_err(|err| IngestError::OpenFile {
                    path: source.text().into(),
                    source: err,
                })?;
                Channel::File(file)
            }
            SourceKind::Literal => Channel::Inline(Cursor::new(source.text().as_bytes().to_vec())),
            SourceKind::Command => {
                match process::run(source.text(), CommandMode::from_timeout(config.timeout))? {
                    CommandOutput::Captured(output) => Channel::Inline(Cursor::new(output.stdout)),
                    CommandOutput::Streaming(mut running) => {
                        let pipe =
                            running
                                .take_stdout()
                                .ok_or_else(|| IngestError::StdoutUnavailable {
                                    command: running.command().to_string(),
                                })?;
                        process = Some(running);
                        Channel::Pipe(pipe)
                    }
                }
            }
        };

        debug!(kind = ?source.kind(), provenance = source.provenance(), "opened source");
        let reader = AutomatonReader::new(
            channel,
            source.provenance(),
            &config.parse_options,
            config.limits,
        );
        Ok(Self {
            source,
            reader,
            process,
        })
    }

    /// Releases the parser, then settles the command, then closes the channel.
    ///
    /// The command's exit status is waited for only if the parser saw the end
    /// of its output; otherwise it is merely polled.
    fn close(self) -> Result<(), IngestError> {
        let reached_eof = self.reader.reached_eof();
        self.teardown(reached_eof)
    }

    /// Teardown for error and abandonment paths: the command's status is only
    /// polled, even if its output was read to the end.
    fn close_early(self) -> Result<(), IngestError> {
        self.teardown(false)
    }

    fn teardown(self, reached_eof: bool) -> Result<(), IngestError> {
        let (parser, channel) = self.reader.into_parts();
        drop(parser);
        let settled = match self.process {
            Some(running) => running.reconcile(reached_eof),
            None => Ok(()),
        };
        drop(channel);
        debug!(provenance = self.source.provenance(), reached_eof, "closed source");
        settled
    }
}

/// Lazy sequence of automata read from a list of sources.
///
/// Sources are opened one at a time, in order. The first error ends the
/// sequence: later sources are never opened. Dropping the sequence early
/// tears down the open source, killing a still-running command.
pub struct Automata<P: AutomatonParser> {
    sources: VecDeque<String>,
    session: Option<Session<P>>,
    config: IngestConfig,
    dictionary: ApDictionary,
    done: bool,
}

/// Reads automata from `sources` with parser `P`.
///
/// Each source is classified with [`Source::classify`]: a trailing `|` runs a
/// shell command, an embedded newline marks inline text, anything else is a
/// file path.
pub fn ingest<P, I, S>(sources: I, config: IngestConfig) -> Automata<P>
where
    P: AutomatonParser,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Automata::new(sources, config)
}

impl<P: AutomatonParser> Automata<P> {
    pub fn new<I, S>(sources: I, config: IngestConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dictionary = config.dictionary.clone().unwrap_or_default();
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            session: None,
            config,
            dictionary,
            done: false,
        }
    }

    /// Dictionary shared by every automaton of this call.
    pub fn dictionary(&self) -> &ApDictionary {
        &self.dictionary
    }

    /// The source currently open, if any.
    pub fn current_source(&self) -> Option<&Source> {
        self.session.as_ref().map(|session| &session.source)
    }

    fn fail(&mut self, err: IngestError) -> Option<Result<P::Automaton, IngestError>> {
        self.done = true;
        self.sources.clear();
        Some(Err(err))
    }
}

impl<P: AutomatonParser> Iterator for Automata<P> {
    type Item = Result<P::Automaton, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.session.is_none() {
                let Some(raw) = self.sources.pop_front() else {
                    self.done = true;
                    return None;
                };
                match Session::open(Source::classify(raw), &self.config) {
                    Ok(session) => self.session = Some(session),
                    Err(err) => return self.fail(err),
                }
            }
            let Some(session) = self.session.as_mut() else {
                continue;
            };

            match session.reader.next_automaton(&self.dictionary) {
                Ok(Some(automaton)) => return Some(Ok(automaton)),
                Ok(None) => {
                    if let Some(session) = self.session.take() {
                        if let Err(err) = session.close() {
                            return self.fail(err);
                        }
                    }
                }
                Err(err) => {
                    if let Some(session) = self.session.take() {
                        if let Err(dropped) = session.close_early() {
                            warn!(error = %dropped, reported = %err, "teardown error superseded");
                        }
                    }
                    return self.fail(err);
                }
            }
        }
    }
}

impl<P: AutomatonParser> FusedIterator for Automata<P> {}

impl<P: AutomatonParser> Drop for Automata<P> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(
                provenance = session.source.provenance(),
                "ingestion abandoned with an open source"
            );
            if let Err(err) = session.close_early() {
                debug!(error = %err, "teardown after abandonment reported an error");
            }
        }
    }
}

#[cfg(feature = "tokio")]
mod tokio_ingest {
    use std::{
        collections::VecDeque,
        io::{self, Cursor},
        pin::Pin,
        task::{Context, Poll},
    };

    use tokio::io::{AsyncRead, ReadBuf};
    use tracing::{debug, warn};

    use super::decode_line;
    use crate::config::{IngestConfig, IngestLimits, ParseOptions};
    use crate::dictionary::ApDictionary;
    use crate::error::IngestError;
    use crate::parser::AutomatonParser;
    use crate::process::{run_async, AsyncCommandOutput, AsyncRunningCommand, CommandMode};
    use crate::reader::AsyncBoundedLineReader;
    use crate::source::{Source, SourceKind};

    /// Async counterpart of [`AutomatonReader`](super::AutomatonReader).
    pub struct AsyncAutomatonReader<R: AsyncRead + Unpin, P: AutomatonParser> {
        lines: AsyncBoundedLineReader<R>,
        parser: P,
        provenance: String,
        debug: bool,
        exhausted: bool,
    }

    impl<R: AsyncRead + Unpin, P: AutomatonParser> AsyncAutomatonReader<R, P> {
        pub fn new(
            reader: R,
            provenance: &str,
            options: &ParseOptions,
            limits: IngestLimits,
        ) -> Self {
            Self {
                lines: AsyncBoundedLineReader::new(reader, limits.max_line_bytes),
                parser: P::open(provenance, options),
                provenance: provenance.to_string(),
                debug: options.debug,
                exhausted: false,
            }
        }

        pub async fn next_automaton(
            &mut self,
            dict: &ApDictionary,
        ) -> Result<Option<P::Automaton>, IngestError> {
            if self.exhausted {
                return Ok(None);
            }

            while let Some(line) = self.lines.next_line().await {
                let (line_number, text) = decode_line(line, &self.provenance)?;
                if self.debug {
                    debug!(
                        provenance = %self.provenance,
                        line_number,
                        line = %text,
                        "parser input"
                    );
                }
                if let Some(automaton) = self.parser.parse_line(&text, line_number, dict)? {
                    return Ok(Some(automaton));
                }
            }

            if !self.lines.reached_eof() {
                return Ok(None);
            }
            self.exhausted = true;
            self.parser.finish(dict).map_err(IngestError::from)
        }

        pub fn reached_eof(&self) -> bool {
            self.exhausted
        }

        pub fn into_parts(self) -> (P, R) {
            (self.parser, self.lines.into_inner())
        }
    }

    enum AsyncChannel {
        File(tokio::fs::File),
        Inline(Cursor<Vec<u8>>),
        Pipe(tokio::process::ChildStdout),
    }

    impl AsyncRead for AsyncChannel {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.get_mut() {
                AsyncChannel::File(file) => Pin::new(file).poll_read(cx, buf),
                AsyncChannel::Inline(cursor) => Pin::new(cursor).poll_read(cx, buf),
                AsyncChannel::Pipe(pipe) => Pin::new(pipe).poll_read(cx, buf),
            }
        }
    }

    struct AsyncSession<P: AutomatonParser> {
        source: Source,
        reader: AsyncAutomatonReader<AsyncChannel, P>,
        process: Option<AsyncRunningCommand>,
    }

    impl<P: AutomatonParser> AsyncSession<P> {
        async fn open(source: Source, config: &IngestConfig) -> Result<Self, IngestError> {
            let mut process = None;
            let channel = match source.kind() {
                SourceKind::File => {
                    let file = tokio::fs::File::open(source.text()).await.map_err(|err| {
                        IngestError::OpenFile {
                            path: source.text().into(),
                            source: err,
                        }
                    })?;
                    AsyncChannel::File(file)
                }
                SourceKind::Literal => {
                    AsyncChannel::Inline(Cursor::new(source.text().as_bytes().to_vec()))
                }
                SourceKind::Command => {
                    match run_async(source.text(), CommandMode::from_timeout(config.timeout))
                        .await?
                    {
                        AsyncCommandOutput::Captured(output) => {
                            AsyncChannel::Inline(Cursor::new(output.stdout))
                        }
                        AsyncCommandOutput::Streaming(mut running) => {
                            let pipe = running.take_stdout().ok_or_else(|| {
                                IngestError::StdoutUnavailable {
                                    command: running.command().to_string(),
                                }
                            })?;
                            process = Some(running);
                            AsyncChannel::Pipe(pipe)
                        }
                    }
                }
            };

            debug!(kind = ?source.kind(), provenance = source.provenance(), "opened source");
            let reader = AsyncAutomatonReader::new(
                channel,
                source.provenance(),
                &config.parse_options,
                config.limits,
            );
            Ok(Self {
                source,
                reader,
                process,
            })
        }

        async fn close(self) -> Result<(), IngestError> {
            let reached_eof = self.reader.reached_eof();
            let (parser, channel) = self.reader.into_parts();
            drop(parser);
            let settled = match self.process {
                Some(running) => running.reconcile(reached_eof).await,
                None => Ok(()),
            };
            drop(channel);
            debug!(provenance = self.source.provenance(), reached_eof, "closed source");
            settled
        }

        /// Teardown that never awaits, for drop paths.
        fn close_early(self) -> Result<(), IngestError> {
            let (parser, channel) = self.reader.into_parts();
            drop(parser);
            let settled = match self.process {
                Some(running) => running.reconcile_early(),
                None => Ok(()),
            };
            drop(channel);
            settled
        }
    }

    /// Async counterpart of [`Automata`](super::Automata), pulled with
    /// [`AsyncAutomata::next_automaton`].
    pub struct AsyncAutomata<P: AutomatonParser> {
        sources: VecDeque<String>,
        session: Option<AsyncSession<P>>,
        config: IngestConfig,
        dictionary: ApDictionary,
        done: bool,
    }

    pub fn ingest_async<P, I, S>(sources: I, config: IngestConfig) -> AsyncAutomata<P>
    where
        P: AutomatonParser,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dictionary = config.dictionary.clone().unwrap_or_default();
        AsyncAutomata {
            sources: sources.into_iter().map(Into::into).collect(),
            session: None,
            config,
            dictionary,
            done: false,
        }
    }

    impl<P: AutomatonParser> AsyncAutomata<P> {
        pub fn dictionary(&self) -> &ApDictionary {
            &self.dictionary
        }

        fn fail(&mut self, err: IngestError) -> Option<Result<P::Automaton, IngestError>> {
            self.done = true;
            self.sources.clear();
            Some(Err(err))
        }

        /// Next automaton, `None` once every source was read or after an error.
        pub async fn next_automaton(&mut self) -> Option<Result<P::Automaton, IngestError>> {
            if self.done {
                return None;
            }

            loop {
                if self.session.is_none() {
                    let Some(raw) = self.sources.pop_front() else {
                        self.done = true;
                        return None;
                    };
                    match AsyncSession::open(Source::classify(raw), &self.config).await {
                        Ok(session) => self.session = Some(session),
                        Err(err) => return self.fail(err),
                    }
                }
                let Some(session) = self.session.as_mut() else {
                    continue;
                };

                match session.reader.next_automaton(&self.dictionary).await {
                    Ok(Some(automaton)) => return Some(Ok(automaton)),
                    Ok(None) => {
                        if let Some(session) = self.session.take() {
                            if let Err(err) = session.close().await {
                                return self.fail(err);
                            }
                        }
                    }
                    Err(err) => {
                        if let Some(session) = self.session.take() {
                            if let Err(dropped) = session.close_early() {
                                warn!(
                                    error = %dropped,
                                    reported = %err,
                                    "teardown error superseded"
                                );
                            }
                        }
                        return self.fail(err);
                    }
                }
            }
        }

        /// Drains the remaining automata, stopping at the first error.
        pub async fn collect_all(mut self) -> Result<Vec<P::Automaton>, IngestError> {
            let mut out = Vec::new();
            while let Some(item) = self.next_automaton().await {
                out.push(item?);
            }
            Ok(out)
        }
    }

    impl<P: AutomatonParser> Drop for AsyncAutomata<P> {
        fn drop(&mut self) {
            if let Some(session) = self.session.take() {
                if let Err(err) = session.close_early() {
                    debug!(error = %err, "teardown after abandonment reported an error");
                }
            }
        }
    }
}

#[cfg(feature = "tokio")]
pub use tokio_ingest::{ingest_async, AsyncAutomata, AsyncAutomatonReader};
