//! Line-at-a-time lexical state machine.
//!
//! [`ScanState`] bundles everything the splitter mutates while reading a
//! script: the lexical state, the pending batch and line bookkeeping. It has
//! no I/O of its own; [`Batches`](crate::Batches) drives it from a
//! [`LineSource`](crate::LineSource).
//!
//! Comment rules:
//!
//! - `/*` opens a block comment closed by the first `*/`; block comments do
//!   not nest and may span lines.
//! - `--` starts a line comment running to the end of the line.
//! - `#` is never a comment marker.
//!
//! A line is a directive when it does not end inside an open block comment
//! and its text matches the separator keyword (plus an optional count):
//!
//! - when stripping, the line's non-comment text is matched, since its
//!   comment text would be discarded anyway;
//! - when keeping comments, the line must start outside a comment and only a
//!   trailing comment may follow the keyword. `GO -- next` separates
//!   batches, while `*/ GO` and `G/* x */O` are content.

use tracing::{debug, trace};

use crate::directive::{Directive, DirectiveRecognizer};
use crate::error::{BatchError, Result};

/// Lexical state carried between characters and lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexState {
    #[default]
    Plain,
    LineComment,
    BlockComment,
}

/// What a single scanned line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line's retained text (and terminator, if any) joined the pending
    /// batch.
    Content,
    /// The line was a separator; the pending batch must be flushed before the
    /// directive is reported.
    Directive(Directive),
}

/// Text kept from one line, split by what the directive check needs.
#[derive(Debug, Default)]
struct ScannedLine {
    /// Characters outside any comment.
    plain: String,
    /// Characters to append to the batch: plain text plus, unless stripping,
    /// comment text.
    retained: String,
    /// Byte offset of the first comment marker on the line.
    first_comment: Option<usize>,
}

/// Explicit state of one splitting run.
#[derive(Debug, Clone)]
pub struct ScanState {
    lex: LexState,
    pending: String,
    strip_comments: bool,
    line_number: usize,
    comment_opened_on: usize,
}

impl ScanState {
    /// Creates an empty state in [`LexState::Plain`].
    pub fn new(strip_comments: bool) -> Self {
        Self {
            lex: LexState::Plain,
            pending: String::new(),
            strip_comments,
            line_number: 0,
            comment_opened_on: 0,
        }
    }

    /// Current lexical state.
    pub fn lex_state(&self) -> LexState {
        self.lex
    }

    /// Text accumulated since the last flush.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Number of lines scanned so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Scans one line and updates the pending batch.
    ///
    /// `terminator` is appended after retained lines: always for a line that
    /// is not the last one (unless the break sits inside a block comment that
    /// is being stripped), and for the last line only when the pending batch
    /// is non-empty. Directive lines append nothing; the caller is expected
    /// to [`take_pending`](Self::take_pending) and report the directive.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlbatch_core::{DirectiveRecognizer, LineOutcome, ScanState};
    ///
    /// let go = DirectiveRecognizer::new("GO").unwrap();
    /// let mut state = ScanState::new(false);
    ///
    /// assert_eq!(state.scan_line("select 1", false, &go, "\n"), LineOutcome::Content);
    /// assert!(matches!(state.scan_line("GO", true, &go, "\n"), LineOutcome::Directive(_)));
    /// assert_eq!(state.take_pending(), "select 1\n");
    /// ```
    pub fn scan_line(
        &mut self,
        line: &str,
        is_last: bool,
        recognizer: &DirectiveRecognizer,
        terminator: &str,
    ) -> LineOutcome {
        self.line_number += 1;
        let starts_in_comment = self.lex == LexState::BlockComment;
        let scanned = self.scan_chars(line);

        let candidate = if self.strip_comments {
            Some(scanned.plain.as_str())
        } else if starts_in_comment {
            None
        } else {
            // Only a trailing comment may share the line with the keyword.
            let head = &line[..scanned.first_comment.unwrap_or(line.len())];
            (head.trim() == scanned.plain.trim()).then_some(head)
        };

        if self.lex != LexState::BlockComment
            && let Some(directive) = candidate.and_then(|text| recognizer.recognize(text))
        {
            debug!(
                line = self.line_number,
                token = %directive.token,
                "batch separator"
            );
            return LineOutcome::Directive(directive);
        }

        self.pending.push_str(&scanned.retained);
        if !is_last {
            if !(self.lex == LexState::BlockComment && self.strip_comments) {
                self.pending.push_str(terminator);
            }
        } else if !self.pending.is_empty() {
            self.pending.push_str(terminator);
        }
        LineOutcome::Content
    }

    /// Returns the pending batch and resets it to empty.
    pub fn take_pending(&mut self) -> String {
        trace!(len = self.pending.len(), "flush batch");
        std::mem::take(&mut self.pending)
    }

    /// Ends the run.
    ///
    /// Returns the final batch if anything is pending, `None` if nothing is.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::UnterminatedComment`] if a block comment is
    /// still open; the pending text is discarded.
    pub fn finish(&mut self) -> Result<Option<String>> {
        if self.lex == LexState::BlockComment {
            self.pending.clear();
            return Err(BatchError::UnterminatedComment {
                line: self.comment_opened_on,
            });
        }
        if self.pending.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.take_pending()))
    }

    fn scan_chars(&mut self, line: &str) -> ScannedLine {
        let bytes = line.as_bytes();
        let mut out = ScannedLine::default();
        // Start of the current run of same-class text. All markers are ASCII,
        // so every slice boundary below is a char boundary.
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match self.lex {
                LexState::Plain => {
                    let opens_block = bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*');
                    let opens_line = bytes[i] == b'-' && bytes.get(i + 1) == Some(&b'-');
                    if opens_block || opens_line {
                        keep_plain(&mut out, &line[start..i]);
                        out.first_comment.get_or_insert(i);
                        start = i;
                        i += 2;
                        if opens_block {
                            self.lex = LexState::BlockComment;
                            self.comment_opened_on = self.line_number;
                        } else {
                            self.lex = LexState::LineComment;
                        }
                    } else {
                        i += 1;
                    }
                }
                LexState::BlockComment => {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        i += 2;
                        self.keep_comment(&mut out, &line[start..i]);
                        start = i;
                        self.lex = LexState::Plain;
                    } else {
                        i += 1;
                    }
                }
                LexState::LineComment => {
                    i = bytes.len();
                }
            }
        }

        match self.lex {
            LexState::Plain => keep_plain(&mut out, &line[start..]),
            LexState::BlockComment => self.keep_comment(&mut out, &line[start..]),
            LexState::LineComment => {
                self.keep_comment(&mut out, &line[start..]);
                self.lex = LexState::Plain;
            }
        }
        out
    }

    fn keep_comment(&self, out: &mut ScannedLine, text: &str) {
        if !self.strip_comments {
            out.retained.push_str(text);
        }
    }
}

fn keep_plain(out: &mut ScannedLine, text: &str) {
    out.plain.push_str(text);
    out.retained.push_str(text);
}
