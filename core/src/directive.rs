//! Whole-line recognition of batch-separator directives such as `GO` or
//! `GO 5`.

use regex::Regex;
use serde::Serialize;

use crate::error::{BatchError, Result};

/// Separator keyword used when none is configured.
pub const DEFAULT_SEPARATOR: &str = "GO";

/// A recognized batch-separator line.
///
/// `token` keeps the keyword's original case; when a repeat count is present
/// it is appended after a single space (`"go 3"`), whatever whitespace the
/// script used between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub token: String,
    pub count: Option<u32>,
}

impl Directive {
    /// Number of times the preceding batch should run. Defaults to 1.
    pub fn repeat_count(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

/// Matches trimmed line content against `KEYWORD [count]`,
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct DirectiveRecognizer {
    keyword: String,
    pattern: Regex,
}

impl DirectiveRecognizer {
    /// Builds a recognizer for `keyword`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidSeparator`] if the keyword is empty or
    /// contains whitespace.
    pub fn new(keyword: &str) -> Result<Self> {
        if keyword.is_empty() || keyword.chars().any(char::is_whitespace) {
            return Err(BatchError::InvalidSeparator(keyword.to_string()));
        }
        let pattern = Regex::new(&format!(r"(?i)^({})(?:\s+([0-9]+))?$", regex::escape(keyword)))
            .map_err(|_| BatchError::InvalidSeparator(keyword.to_string()))?;
        Ok(Self {
            keyword: keyword.to_string(),
            pattern,
        })
    }

    /// The configured keyword, as given.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns the directive if `content`, once trimmed, is nothing but the
    /// keyword and an optional non-negative count.
    ///
    /// Anything else, including a count too large for `u32`, is ordinary
    /// SQL content.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlbatch_core::DirectiveRecognizer;
    ///
    /// let go = DirectiveRecognizer::new("GO").unwrap();
    /// let d = go.recognize("  go \t 3 ").unwrap();
    /// assert_eq!(d.token, "go 3");
    /// assert_eq!(d.count, Some(3));
    ///
    /// assert!(go.recognize("go;").is_none());
    /// assert!(go.recognize("goto").is_none());
    /// ```
    pub fn recognize(&self, content: &str) -> Option<Directive> {
        let caps = self.pattern.captures(content.trim())?;
        let keyword = caps.get(1)?.as_str();
        match caps.get(2) {
            None => Some(Directive {
                token: keyword.to_string(),
                count: None,
            }),
            Some(digits) => {
                let count = digits.as_str().parse::<u32>().ok()?;
                Some(Directive {
                    token: format!("{keyword} {}", digits.as_str()),
                    count: Some(count),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn go() -> DirectiveRecognizer {
        DirectiveRecognizer::new(DEFAULT_SEPARATOR).unwrap()
    }

    #[test]
    fn test_plain_keyword_keeps_case() {
        let go = go();
        assert_eq!(go.recognize("gO").unwrap().token, "gO");
        assert_eq!(go.recognize("GO").unwrap().count, None);
    }

    #[test]
    fn test_count_whitespace_is_collapsed() {
        let go = go();
        let d = go.recognize("go 1 ").unwrap();
        assert_eq!(d.token, "go 1");
        assert_eq!(d.count, Some(1));

        let d = go.recognize("\tGo   \t 42").unwrap();
        assert_eq!(d.token, "Go 42");
        assert_eq!(d.repeat_count(), 42);
    }

    #[test]
    fn test_near_misses_are_content() {
        let go = go();
        for line in ["go 1 2", "go x", "go1", "go -1", "go;", "ago", "select go", ""] {
            assert!(go.recognize(line).is_none(), "{line:?} should not match");
        }
    }

    #[test]
    fn test_oversized_count_is_content() {
        let go = go();
        assert!(go.recognize("go 99999999999999999999").is_none());
    }

    #[test]
    fn test_zero_count() {
        let d = go().recognize("go 0").unwrap();
        assert_eq!(d.count, Some(0));
        assert_eq!(d.repeat_count(), 0);
    }

    #[test]
    fn test_custom_keyword_is_escaped() {
        let r = DirectiveRecognizer::new("$$").unwrap();
        assert_eq!(r.recognize("$$ 2").unwrap().token, "$$ 2");
        assert!(r.recognize("go").is_none());
    }

    #[test]
    fn test_invalid_keywords_rejected() {
        assert!(matches!(
            DirectiveRecognizer::new(""),
            Err(BatchError::InvalidSeparator(_))
        ));
        assert!(matches!(
            DirectiveRecognizer::new("end batch"),
            Err(BatchError::InvalidSeparator(_))
        ));
    }
}
