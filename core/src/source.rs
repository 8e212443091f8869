//! Line sources feeding the batch scanner.
//!
//! A [`LineSource`] hands out one line at a time, with its terminator already
//! removed. Two implementations are provided:
//!
//! - [`LinesSource`] wraps a finite sequence of strings, one line each.
//! - [`ReaderSource`] reads a [`BufRead`] incrementally and splits it at a
//!   terminator character, so arbitrarily large scripts never have to be held
//!   in memory.
//!
//! # Examples
//!
//! ```
//! use sqlbatch_core::{LineSource, LinesSource, ReaderSource};
//!
//! let mut lines = LinesSource::new(["select 1", "go"]);
//! assert_eq!(lines.next_line().unwrap().as_deref(), Some("select 1"));
//!
//! let mut stream = ReaderSource::new("\nasd".as_bytes());
//! assert_eq!(stream.next_line().unwrap().as_deref(), Some(""));
//! assert_eq!(stream.next_line().unwrap().as_deref(), Some("asd"));
//! assert_eq!(stream.next_line().unwrap(), None);
//! ```

use std::io::{self, BufRead};

/// A lazy, forward-only producer of lines.
///
/// Sources are not rewindable; to read the same origin again, construct a
/// new source over it.
pub trait LineSource {
    /// Returns the next line without its terminator, or `None` once the
    /// origin is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the underlying origin cannot be read or does
    /// not contain valid UTF-8.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        (**self).next_line()
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        (**self).next_line()
    }
}

/// List-backed source: each item is one line with no embedded terminator.
#[derive(Debug, Clone)]
pub struct LinesSource<I> {
    lines: I,
}

impl<I, T> LinesSource<I>
where
    I: Iterator<Item = T>,
    T: Into<String>,
{
    /// Wraps any finite sequence of lines.
    pub fn new(lines: impl IntoIterator<IntoIter = I, Item = T>) -> Self {
        Self {
            lines: lines.into_iter(),
        }
    }
}

impl<I, T> LineSource for LinesSource<I>
where
    I: Iterator<Item = T>,
    T: Into<String>,
{
    fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.next().map(Into::into))
    }
}

/// Stream-backed source splitting a reader at a fixed terminator character.
///
/// The terminator is discarded. An empty reader yields no lines, and a reader
/// holding only a terminator yields exactly one empty line. A trailing
/// terminator does not produce an extra empty line.
///
/// With the default `'\n'` terminator, a `'\r'` directly before it is treated
/// as part of the terminator, so CRLF scripts split the same way as LF ones.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    terminator: char,
    buf: Vec<u8>,
}

impl<R: BufRead> ReaderSource<R> {
    /// Creates a source splitting on `'\n'`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            terminator: '\n',
            buf: Vec::new(),
        }
    }

    /// Splits on `terminator` instead of `'\n'`.
    pub fn with_terminator(mut self, terminator: char) -> Self {
        self.terminator = terminator;
        self
    }

    /// Consumes the source and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn take_line(&mut self) -> io::Result<String> {
        String::from_utf8(std::mem::take(&mut self.buf))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut encoded = [0u8; 4];
        let terminator = self.terminator.encode_utf8(&mut encoded).as_bytes();
        let delimiter = terminator[terminator.len() - 1];

        self.buf.clear();
        loop {
            let read = self.reader.read_until(delimiter, &mut self.buf)?;
            if read == 0 {
                break;
            }
            if self.buf.ends_with(terminator) {
                self.buf.truncate(self.buf.len() - terminator.len());
                if self.terminator == '\n' && self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
                return self.take_line().map(Some);
            }
            // Multi-byte terminators share their last byte with other
            // characters; keep reading until the whole sequence matches.
            if self.buf.last() != Some(&delimiter) {
                break;
            }
        }

        if self.buf.is_empty() {
            return Ok(None);
        }
        self.take_line().map(Some)
    }
}
