//! Reading single lines under a fixed length ceiling.

use std::io::{self, BufRead, Read};

/// One line read by [`read_bounded_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundedLine {
    /// The reader was already exhausted.
    Eof,
    /// A line within the ceiling, without its `\n` terminator.
    Line(String),
    /// The line ran past the ceiling; the rest of it was left unread.
    TooLong,
}

/// Reads the next line from `reader`, refusing lines longer than `limit`
/// bytes (the `\n` terminator does not count).
///
/// At most `limit + 1` bytes are consumed, so an unterminated or oversized
/// line never grows the buffer past the ceiling.
///
/// # Errors
///
/// Returns the underlying IO error, or [`io::ErrorKind::InvalidData`] when the
/// line is not valid UTF-8.
pub fn read_bounded_line<R: BufRead>(reader: &mut R, limit: usize) -> io::Result<BoundedLine> {
    let budget = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    if reader.by_ref().take(budget).read_until(b'\n', &mut bytes)? == 0 {
        return Ok(BoundedLine::Eof);
    }
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    if bytes.len() > limit {
        return Ok(BoundedLine::TooLong);
    }
    String::from_utf8(bytes)
        .map(BoundedLine::Line)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}
