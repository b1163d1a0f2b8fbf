//! Extraction of `KEY value` pairs from the line-oriented config format.

use std::collections::HashMap;
use std::io::{self, BufRead};

use crate::defaults::MAX_LINE_BUF;
use crate::line::{BoundedLine, read_bounded_line};

/// Why a config file could not be scanned.
#[derive(Debug)]
pub(crate) enum ParseError {
    Io(io::Error),
    /// One-based number of a line longer than [`MAX_LINE_BUF`].
    LineTooLong(usize),
}

/// Values captured for the recognised keys of one config file.
#[derive(Debug, Default)]
pub(crate) struct Entries {
    values: HashMap<&'static str, String>,
}

impl Entries {
    /// Reads every line from `reader`, keeping the last value seen for each of
    /// the `known` keys.
    pub(crate) fn parse<R: BufRead>(
        mut reader: R,
        known: &[&'static str],
    ) -> Result<Self, ParseError> {
        let mut values = HashMap::new();
        for number in 1.. {
            let line = match read_bounded_line(&mut reader, MAX_LINE_BUF) {
                Ok(BoundedLine::Line(text)) => text,
                Ok(BoundedLine::Eof) => break,
                Ok(BoundedLine::TooLong) => return Err(ParseError::LineTooLong(number)),
                Err(error) => return Err(ParseError::Io(error)),
            };
            let Some(content) = significant(&line) else {
                continue;
            };
            if let Some((key, value)) = known
                .iter()
                .find_map(|key| extract(content, key).map(|value| (*key, value)))
            {
                values.insert(key, value.to_owned());
            }
        }
        Ok(Self { values })
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Strips leading blanks, returning `None` for comments and blank lines.
fn significant(line: &str) -> Option<&str> {
    let content = line.trim_start_matches([' ', '\t']);
    match content.chars().next() {
        None | Some('#' | ';' | '\r') => None,
        Some(_) => Some(content),
    }
}

/// Returns the value when `line` starts with `key` followed by whitespace.
///
/// Surrounding whitespace and a single trailing `;` terminator are dropped.
/// Empty values yield `None` so callers treat them like an absent key.
fn extract<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let value = rest.trim();
    let value = value.strip_suffix(';').map_or(value, str::trim_end);
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Entries, ParseError, extract, significant};
    use crate::MAX_LINE_BUF;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("# comment")]
    #[case("\t; also a comment")]
    fn skips_comments_and_blank_lines(#[case] line: &str) {
        assert_eq!(significant(line), None);
    }

    #[rstest]
    #[case("psadCmd /usr/sbin/psad", Some("/usr/sbin/psad"))]
    #[case("psadCmd \t /usr/sbin/psad;  ", Some("/usr/sbin/psad"))]
    #[case("psadCmd\t/usr/sbin/psad", Some("/usr/sbin/psad"))]
    #[case("psadCmdX /usr/sbin/psad", None)]
    #[case("psadCmd", None)]
    #[case("psadCmd   ;", None)]
    fn extracts_values_after_whitespace(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract(line, "psadCmd"), expected);
    }

    #[rstest]
    fn keeps_last_occurrence_and_ignores_unknown_keys() {
        let text = "\
# watchdog settings
EMAIL_ADDRESSES first@example.org;
UNKNOWN_KEY whatever
  EMAIL_ADDRESSES   second@example.org third@example.org;
";
        let entries =
            Entries::parse(text.as_bytes(), &["EMAIL_ADDRESSES"]).expect("parse should succeed");
        assert_eq!(
            entries.get("EMAIL_ADDRESSES"),
            Some("second@example.org third@example.org")
        );
        assert_eq!(entries.get("UNKNOWN_KEY"), None);
    }

    #[rstest]
    fn lines_at_the_ceiling_are_accepted() {
        let value = "x".repeat(MAX_LINE_BUF - "EMAIL_ADDRESSES ".len());
        let text = format!("EMAIL_ADDRESSES {value}\n");

        let entries =
            Entries::parse(text.as_bytes(), &["EMAIL_ADDRESSES"]).expect("parse should succeed");

        assert_eq!(entries.get("EMAIL_ADDRESSES"), Some(value.as_str()));
    }

    #[rstest]
    fn overlong_lines_are_rejected_with_their_number() {
        let text = format!("# settings\n#{}\nEMAIL_ADDRESSES root;\n", "-".repeat(MAX_LINE_BUF));

        let error = Entries::parse(text.as_bytes(), &["EMAIL_ADDRESSES"])
            .expect_err("parse should fail");

        assert!(matches!(error, ParseError::LineTooLong(2)), "unexpected error: {error:?}");
    }
}
