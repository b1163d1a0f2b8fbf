//! Reading process ids from pid files.

use std::fs::File;
use std::io::{self, BufReader};

use camino::Utf8Path;
use nix::unistd::Pid;
use psadwatch_config::{BoundedLine, MAX_LINE_BUF, read_bounded_line};

/// What was found in a pid file.
#[derive(Debug)]
pub enum PidFileRead {
    /// The file could not be opened or read.
    Unreadable(io::Error),
    /// The first line did not hold a usable process id, or was longer than
    /// [`MAX_LINE_BUF`].
    Malformed(String),
    /// The recorded process id.
    Pid(Pid),
}

/// Reads the process id from the first line of `path`.
pub fn read_pid_file(path: &Utf8Path) -> PidFileRead {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => return PidFileRead::Unreadable(error),
    };
    let line = match read_bounded_line(&mut BufReader::new(file), MAX_LINE_BUF) {
        Ok(BoundedLine::Line(text)) => text,
        Ok(BoundedLine::Eof) => String::new(),
        Ok(BoundedLine::TooLong) => {
            return PidFileRead::Malformed(format!("first line exceeds {MAX_LINE_BUF} bytes"));
        }
        Err(error) => return PidFileRead::Unreadable(error),
    };
    match parse_pid(&line) {
        Some(pid) => PidFileRead::Pid(pid),
        None => PidFileRead::Malformed(line.trim_end().to_owned()),
    }
}

/// Parses a positive decimal process id, ignoring surrounding whitespace.
///
/// Zero, negative, and out-of-range values are rejected: signalling them
/// would address a process group rather than one process.
#[must_use]
pub fn parse_pid(line: &str) -> Option<Pid> {
    line.trim()
        .parse::<i32>()
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8Path;
    use nix::unistd::Pid;
    use rstest::rstest;
    use tempfile::TempDir;

    use psadwatch_config::MAX_LINE_BUF;

    use super::{PidFileRead, parse_pid, read_pid_file};

    #[rstest]
    #[case("4242\n", Some(4242))]
    #[case("  99999  ", Some(99_999))]
    #[case("", None)]
    #[case("0\n", None)]
    #[case("-12\n", None)]
    #[case("12ab\n", None)]
    #[case("9999999999\n", None)]
    fn parses_positive_pids_only(#[case] line: &str, #[case] expected: Option<i32>) {
        assert_eq!(parse_pid(line), expected.map(Pid::from_raw));
    }

    #[rstest]
    fn reads_only_the_first_line() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8Path::from_path(dir.path())
            .expect("temp dir should be UTF-8")
            .join("psad.pid");
        fs::write(&path, "1234\n5678\n").expect("write pid file");

        match read_pid_file(&path) {
            PidFileRead::Pid(pid) => assert_eq!(pid.as_raw(), 1234),
            other => panic!("unexpected read: {other:?}"),
        }
    }

    #[rstest]
    fn missing_files_are_unreadable() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8Path::from_path(dir.path())
            .expect("temp dir should be UTF-8")
            .join("absent.pid");

        assert!(matches!(read_pid_file(&path), PidFileRead::Unreadable(_)));
    }

    #[rstest]
    fn overlong_first_lines_are_malformed() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8Path::from_path(dir.path())
            .expect("temp dir should be UTF-8")
            .join("psad.pid");
        fs::write(&path, format!("{}1234\n", "0".repeat(MAX_LINE_BUF))).expect("write pid file");

        match read_pid_file(&path) {
            PidFileRead::Malformed(text) => assert!(text.contains("exceeds"), "got {text}"),
            other => panic!("unexpected read: {other:?}"),
        }
    }
}
