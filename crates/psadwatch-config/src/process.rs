//! Identities of the supervised daemons.

use camino::Utf8PathBuf;
use strum::{Display, EnumString, IntoStaticStr};

/// One of the daemons the watchdog keeps alive.
///
/// The set is closed: each identity owns a fixed group of configuration keys
/// and a slot in the retry ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ProcessName {
    /// The port scan attack detector.
    Psad,
    /// The kernel message collector feeding psad.
    Kmsgsd,
    /// The disk usage monitor.
    Diskmond,
}

impl ProcessName {
    /// Every identity in the order the supervisor checks them.
    pub const ALL: [Self; 3] = [Self::Psad, Self::Kmsgsd, Self::Diskmond];

    /// Lowercase name used in alerts and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Config key naming the daemon binary.
    #[must_use]
    pub const fn binary_key(self) -> &'static str {
        match self {
            Self::Psad => "psadCmd",
            Self::Kmsgsd => "kmsgsdCmd",
            Self::Diskmond => "diskmondCmd",
        }
    }

    /// Config key naming the daemon pid file.
    #[must_use]
    pub const fn pid_file_key(self) -> &'static str {
        match self {
            Self::Psad => "PSAD_PID_FILE",
            Self::Kmsgsd => "KMSGSD_PID_FILE",
            Self::Diskmond => "DISKMOND_PID_FILE",
        }
    }

    /// Config key naming the command-line file, for daemons restarted with
    /// their original arguments.
    #[must_use]
    pub const fn cmdline_file_key(self) -> Option<&'static str> {
        match self {
            Self::Psad => Some("PSAD_CMDLINE_FILE"),
            Self::Kmsgsd | Self::Diskmond => None,
        }
    }
}

/// A daemon under supervision, as described by the active configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredProcess {
    /// Which daemon this is.
    pub name: ProcessName,
    /// File the daemon writes its own process id to.
    pub pid_file: Utf8PathBuf,
    /// File holding the daemon's original arguments, when it has one.
    pub cmdline_file: Option<Utf8PathBuf>,
    /// Binary executed to restart the daemon.
    pub binary: Utf8PathBuf,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::ProcessName;

    #[rstest]
    #[case(ProcessName::Psad, "psad")]
    #[case(ProcessName::Kmsgsd, "kmsgsd")]
    #[case(ProcessName::Diskmond, "diskmond")]
    fn names_are_lowercase(#[case] name: ProcessName, #[case] expected: &str) {
        assert_eq!(name.as_str(), expected);
        assert_eq!(name.to_string(), expected);
        assert_eq!(ProcessName::from_str(expected).expect("name should parse"), name);
    }

    #[rstest]
    fn only_psad_has_a_cmdline_key() {
        let with_cmdline: Vec<_> = ProcessName::ALL
            .into_iter()
            .filter(|name| name.cmdline_file_key().is_some())
            .collect();
        assert_eq!(with_cmdline, vec![ProcessName::Psad]);
    }
}
