//! Line codec for the recorder's ASCII query protocol
//!
//! Replies look like `!bank_set? 0 : A : VSN-001 : B : VSN-002 ;`. The first `=` (or, failing
//! that, the first `?`) separates the echoed command from its arguments, and the arguments are
//! separated by the literal token `": "`. There is no quoting or escaping.
//!
//! Several queries may share one line, joined by `;`. The device answers with one reply per
//! query, each terminated by `;`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Terminator the device expects after every query line
pub const LINE_TERMINATOR: &str = "\n\r";

/// Separator between queries in a batch, and between replies
pub const QUERY_SEPARATOR: char = ';';

/// Separator between the arguments of one reply
const FIELD_SEPARATOR: &str = ": ";

/// Status codes accepted by default: 0 (done) and 1 (initiated)
pub const DEFAULT_ACCEPTED: &[&str] = &["0", "1"];

/// One decoded reply
///
/// Field 0 is the echoed command, field 1 the status code; everything after that is
/// query-specific and is interpreted by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    fields: Vec<String>,
}

impl Reply {
    /// Decode one raw reply segment into fields
    ///
    /// Never fails: a line without a separator decodes to a single field, which callers must
    /// treat as an echo-only (malformed) reply.
    pub fn decode(raw: &str) -> Self {
        let body = match raw.rfind(QUERY_SEPARATOR) {
            Some(end) => &raw[..end],
            None => raw,
        };

        let separator = body.find('=').or_else(|| body.find('?'));
        let fields = match separator {
            Some(index) if !body[index + 1..].trim().is_empty() => {
                std::iter::once(body[..index].trim())
                    .chain(body[index + 1..].split(FIELD_SEPARATOR).map(str::trim))
                    .map(String::from)
                    .collect()
            }
            _ => vec![body.trim().to_string()],
        };

        Self { fields }
    }

    /// All decoded fields
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the reply has no fields (never true for decoded replies)
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Echoed command name (field 0)
    pub fn command(&self) -> &str {
        self.field(0).unwrap_or_default()
    }

    /// Status code (field 1), absent for echo-only replies
    pub fn status(&self) -> Option<&str> {
        self.field(1)
    }

    /// Field at `index`, if present
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Field at `index`, or a [`Error::MalformedReply`] naming what was expected there
    pub fn require(&self, index: usize, what: &str) -> Result<&str> {
        self.field(index)
            .ok_or_else(|| self.malformed(format!("missing {} (field {})", what, index)))
    }

    /// Parse the field at `index`
    pub fn parse_field<T: FromStr>(&self, index: usize, what: &str) -> Result<T> {
        let raw = self.require(index, what)?;
        raw.parse()
            .map_err(|_| self.malformed(format!("{} '{}' is not a number", what, raw)))
    }

    /// Build a [`Error::MalformedReply`] for this reply
    pub fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedReply {
            query: self.command().to_string(),
            reply: self.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(" : "))
    }
}

/// Encode a single query as a wire line
pub fn encode(query: &str) -> String {
    format!("{}{}", query, LINE_TERMINATOR)
}

/// Encode several queries as one wire line
pub fn encode_batch<S: AsRef<str>>(queries: &[S]) -> String {
    let joined: Vec<&str> = queries.iter().map(AsRef::as_ref).collect();
    encode(&joined.join(";"))
}

/// Split a batched reply into per-query segments
///
/// The device terminates every reply with `;`, so the segment after the last separator is
/// dropped. A reply without any separator yields no segments.
pub fn split_batch(raw: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = raw.split(QUERY_SEPARATOR).collect();
    segments.pop();
    segments
}
