//! Batch splitting entry points and the event stream.
//!
//! [`BatchParser`] holds the immutable configuration (line terminator and
//! separator keyword). Each call starts a fresh run with its own
//! [`ScanState`], so one parser can split any number of scripts.
//!
//! Events come out in the order the scanner produces them: every
//! [`BatchEvent::Directive`] is immediately preceded by the
//! [`BatchEvent::Batch`] it flushed, even when that batch is empty. The final
//! batch at end of input is emitted only when it has content.
//!
//! # Examples
//!
//! ```
//! use sqlbatch_core::{BatchEvent, BatchParser, SplitOptions};
//!
//! let parser = BatchParser::new("\n").unwrap();
//! let events = parser
//!     .split_str("create table t (id int)\nGO\ninsert into t values (1)", SplitOptions::default())
//!     .unwrap();
//!
//! assert_eq!(events.len(), 3);
//! assert_eq!(events[0], BatchEvent::Batch("create table t (id int)\n".into()));
//! assert!(matches!(&events[1], BatchEvent::Directive(d) if d.token == "GO"));
//! assert_eq!(events[2], BatchEvent::Batch("insert into t values (1)\n".into()));
//! ```

use serde::Serialize;

use crate::directive::{DEFAULT_SEPARATOR, Directive, DirectiveRecognizer};
use crate::error::{BatchError, Result};
use crate::scanner::{LineOutcome, ScanState};
use crate::source::{LineSource, ReaderSource};

/// One unit of splitter output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BatchEvent {
    /// SQL text ready to send to the database as one execution unit.
    Batch(String),
    /// A separator line, reported right after the batch it closed.
    Directive(Directive),
}

/// Per-run options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitOptions {
    /// Drop comment text from emitted batches instead of keeping it verbatim.
    pub strip_comments: bool,
}

impl SplitOptions {
    /// Options with comment stripping enabled.
    pub fn stripped() -> Self {
        Self {
            strip_comments: true,
        }
    }
}

/// Splits SQL scripts into batches at separator lines.
#[derive(Debug, Clone)]
pub struct BatchParser {
    terminator: String,
    recognizer: DirectiveRecognizer,
}

impl BatchParser {
    /// Creates a parser that joins retained lines with `terminator` and
    /// recognizes the default `GO` separator.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidTerminator`] if `terminator` is empty.
    pub fn new(terminator: impl Into<String>) -> Result<Self> {
        let terminator = terminator.into();
        if terminator.is_empty() {
            return Err(BatchError::InvalidTerminator);
        }
        Ok(Self {
            terminator,
            recognizer: DirectiveRecognizer::new(DEFAULT_SEPARATOR)?,
        })
    }

    /// Replaces the separator keyword.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidSeparator`] if the keyword is empty or
    /// contains whitespace.
    pub fn with_separator(mut self, keyword: &str) -> Result<Self> {
        self.recognizer = DirectiveRecognizer::new(keyword)?;
        Ok(self)
    }

    /// The terminator inserted between retained lines.
    pub fn terminator(&self) -> &str {
        &self.terminator
    }

    /// The separator keyword.
    pub fn separator(&self) -> &str {
        self.recognizer.keyword()
    }

    /// Lazily splits `source`, pulling one line at a time.
    ///
    /// Events already yielded stay valid if a later item is an error; after
    /// an error the iterator is exhausted.
    pub fn batches<S: LineSource>(&self, source: S, options: SplitOptions) -> Batches<'_, S> {
        Batches {
            parser: self,
            source,
            state: ScanState::new(options.strip_comments),
            lookahead: None,
            started: false,
            queued: None,
            done: false,
        }
    }

    /// Splits `source` completely.
    ///
    /// # Errors
    ///
    /// On any error no events are returned, even those produced before it.
    pub fn split<S: LineSource>(&self, source: S, options: SplitOptions) -> Result<Vec<BatchEvent>> {
        self.batches(source, options).collect()
    }

    /// Splits an in-memory script on `'\n'` (CRLF tolerated).
    ///
    /// # Errors
    ///
    /// See [`split`](Self::split).
    pub fn split_str(&self, script: &str, options: SplitOptions) -> Result<Vec<BatchEvent>> {
        self.split(ReaderSource::new(script.as_bytes()), options)
    }

    /// Delivers each event to `on_event` as soon as it is produced, before the
    /// next line is scanned. The source is read one line ahead, so the line
    /// after a separator has already been pulled when its events arrive.
    ///
    /// Returns the number of events delivered.
    ///
    /// # Errors
    ///
    /// Stops at the first error; events delivered before it are not retracted.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlbatch_core::{BatchEvent, BatchParser, LinesSource, SplitOptions};
    ///
    /// let parser = BatchParser::new("\n").unwrap();
    /// let mut batches = Vec::new();
    /// parser
    ///     .process(LinesSource::new(["select 1", "go", "select 2"]), SplitOptions::default(), |event| {
    ///         if let BatchEvent::Batch(sql) = event {
    ///             batches.push(sql);
    ///         }
    ///     })
    ///     .unwrap();
    /// assert_eq!(batches, vec!["select 1\n", "select 2\n"]);
    /// ```
    pub fn process<S, F>(&self, source: S, options: SplitOptions, mut on_event: F) -> Result<usize>
    where
        S: LineSource,
        F: FnMut(BatchEvent),
    {
        let mut delivered = 0;
        for event in self.batches(source, options) {
            on_event(event?);
            delivered += 1;
        }
        Ok(delivered)
    }
}

/// Lazy event stream returned by [`BatchParser::batches`].
#[derive(Debug)]
pub struct Batches<'a, S> {
    parser: &'a BatchParser,
    source: S,
    state: ScanState,
    lookahead: Option<String>,
    started: bool,
    queued: Option<BatchEvent>,
    done: bool,
}

impl<S: LineSource> Batches<'_, S> {
    fn step(&mut self) -> Result<Option<BatchEvent>> {
        if !self.started {
            self.lookahead = self.source.next_line()?;
            self.started = true;
        }

        while let Some(line) = self.lookahead.take() {
            // One line of look-ahead tells the scanner whether this is the last.
            self.lookahead = self.source.next_line()?;
            let is_last = self.lookahead.is_none();

            match self.state.scan_line(
                &line,
                is_last,
                &self.parser.recognizer,
                &self.parser.terminator,
            ) {
                LineOutcome::Content => {}
                LineOutcome::Directive(directive) => {
                    self.queued = Some(BatchEvent::Directive(directive));
                    return Ok(Some(BatchEvent::Batch(self.state.take_pending())));
                }
            }
        }

        self.done = true;
        Ok(self.state.finish()?.map(BatchEvent::Batch))
    }
}

impl<S: LineSource> Iterator for Batches<'_, S> {
    type Item = Result<BatchEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.queued.take() {
            return Some(Ok(event));
        }
        if self.done {
            return None;
        }
        match self.step() {
            Ok(event) => event.map(Ok),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LinesSource;

    fn parser() -> BatchParser {
        BatchParser::new("\n").unwrap()
    }

    #[test]
    fn test_empty_terminator_rejected() {
        assert!(matches!(
            BatchParser::new(""),
            Err(BatchError::InvalidTerminator)
        ));
    }

    #[test]
    fn test_custom_terminator_is_reinserted() {
        let lf = parser();
        let crlf = BatchParser::new("\r\n").unwrap();
        let lines = ["a", "b"];
        assert_eq!(
            crlf.split(LinesSource::new(lines), SplitOptions::default())
                .unwrap(),
            vec![BatchEvent::Batch("a\r\nb\r\n".into())]
        );
        assert_eq!(
            lf.split(LinesSource::new(lines), SplitOptions::default())
                .unwrap(),
            vec![BatchEvent::Batch("a\nb\n".into())]
        );
    }

    #[test]
    fn test_custom_separator() {
        let parser = parser().with_separator("END").unwrap();
        assert_eq!(parser.separator(), "END");
        let events = parser
            .split_str("select 1\ngo\nend 2", SplitOptions::default())
            .unwrap();
        assert_eq!(events[0], BatchEvent::Batch("select 1\ngo\n".into()));
        assert!(matches!(&events[1], BatchEvent::Directive(d) if d.count == Some(2)));
    }

    #[test]
    fn test_iterator_yields_batches_before_error() {
        let events: Vec<_> = parser()
            .batches(
                LinesSource::new(["select 1", "go", "/* open"]),
                SplitOptions::default(),
            )
            .collect();
        assert_eq!(events.len(), 3);
        assert!(events[0].is_ok());
        assert!(events[1].is_ok());
        assert!(matches!(
            events[2],
            Err(BatchError::UnterminatedComment { line: 3 })
        ));
    }

    #[test]
    fn test_iterator_is_fused_after_error() {
        let parser = parser();
        let mut batches = parser.batches(LinesSource::new(["/*"]), SplitOptions::default());
        assert!(batches.next().unwrap().is_err());
        assert!(batches.next().is_none());
        assert!(batches.next().is_none());
    }

    #[test]
    fn test_source_error_is_reported() {
        let bytes: &[u8] = &[b'g', b'o', b'\n', 0xfe];
        let result = parser().split(ReaderSource::new(bytes), SplitOptions::default());
        assert!(matches!(result, Err(BatchError::Source(_))));
    }

    #[test]
    fn test_process_counts_events() {
        let mut seen = Vec::new();
        let delivered = parser()
            .process(
                LinesSource::new(["a", "go 3", "b"]),
                SplitOptions::default(),
                |event| seen.push(event),
            )
            .unwrap();
        assert_eq!(delivered, 3);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_events_serialize_with_kind_tag() {
        let events = parser().split_str("x\ngo 2", SplitOptions::default()).unwrap();
        let json = serde_json::to_value(&events).unwrap();
        assert_eq!(json[0]["kind"], "batch");
        assert_eq!(json[1]["kind"], "directive");
        assert_eq!(json[0]["value"], "x\n");
        assert_eq!(json[1]["value"]["token"], "go 2");
        assert_eq!(json[1]["value"]["count"], 2);
    }
}
