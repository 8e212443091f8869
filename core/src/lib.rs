//! Streaming splitter for multi-batch SQL scripts.
//!
//! Migration scripts written for SQL Server style tooling separate execution
//! batches with a separator line such as `GO` or `GO 3`. This crate turns
//! such a script into an ordered stream of events:
//!
//! - [`BatchEvent::Batch`]: SQL text to send to the database as one unit.
//! - [`BatchEvent::Directive`]: the separator that closed the preceding
//!   batch, with its optional repeat count.
//!
//! The pieces, leaf-first:
//!
//! - [`LineSource`] ([`LinesSource`], [`ReaderSource`]): pull-based line
//!   input; the reader variant never holds the whole script in memory.
//! - [`ScanState`]: the lexical state machine (plain text, `--` line
//!   comments, `/* */` block comments) and the pending batch.
//! - [`DirectiveRecognizer`]: strict whole-line separator matching.
//! - [`BatchParser`] / [`Batches`]: configuration and the event stream.
//!
//! The splitter never validates SQL. The only structural error is a block
//! comment still open at end of input ([`BatchError::UnterminatedComment`]).
//!
//! # Example
//!
//! ```
//! use sqlbatch_core::*;
//!
//! let parser = BatchParser::new("\n").unwrap();
//! let script = "/* setup */\ncreate table t (id int)\nGO\n-- seed\ninsert into t values (1)\nGO 2";
//!
//! let events = parser.split_str(script, SplitOptions::stripped()).unwrap();
//! assert_eq!(
//!     events,
//!     vec![
//!         BatchEvent::Batch("\ncreate table t (id int)\n".into()),
//!         BatchEvent::Directive(Directive { token: "GO".into(), count: None }),
//!         BatchEvent::Batch("\ninsert into t values (1)\n".into()),
//!         BatchEvent::Directive(Directive { token: "GO 2".into(), count: Some(2) }),
//!     ]
//! );
//! ```

mod directive;
mod error;
mod parser;
mod scanner;
mod source;

pub use directive::{DEFAULT_SEPARATOR, Directive, DirectiveRecognizer};
pub use error::{BatchError, Result};
pub use parser::{BatchEvent, BatchParser, Batches, SplitOptions};
pub use scanner::{LexState, LineOutcome, ScanState};
pub use source::{LineSource, LinesSource, ReaderSource};
