//! Operator alerts sent through the configured mail pipeline.

use std::process::Command;

use camino::Utf8PathBuf;
use psadwatch_config::{Config, ProcessName};
use tracing::{info, warn};

const ALERT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::alert");
const MAIL_REDIRECT: &str = " < /dev/null > /dev/null 2>&1";

/// Why an alert is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// The daemon's pid file was missing or unreadable; it is being restarted.
    RestartMissingPidFile,
    /// The pid file named a process that is gone; the daemon is being
    /// restarted.
    RestartDeadProcess,
    /// The retry limit was reached and the watchdog is exiting.
    GaveUp,
}

/// An alert about one daemon on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    kind: AlertKind,
    process: ProcessName,
    host: String,
}

impl AlertMessage {
    /// Builds an alert of `kind` about `process` on `host`.
    #[must_use]
    pub fn new(kind: AlertKind, process: ProcessName, host: impl Into<String>) -> Self {
        Self {
            kind,
            process,
            host: host.into(),
        }
    }

    /// Why the alert is being sent.
    #[must_use]
    pub const fn kind(&self) -> AlertKind {
        self.kind
    }

    /// The daemon the alert is about.
    #[must_use]
    pub const fn process(&self) -> ProcessName {
        self.process
    }

    /// Mail subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        match self.kind {
            AlertKind::RestartMissingPidFile | AlertKind::RestartDeadProcess => format!(
                "psadwatchd: Restarting {} on {}",
                self.process, self.host
            ),
            AlertKind::GaveUp => format!(
                "psadwatchd: Could not restart {} on {}.  Exiting.",
                self.process, self.host
            ),
        }
    }
}

/// Where and how alerts are delivered, taken from the active configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTransport {
    /// Shell that runs the mail pipeline.
    pub shell: Utf8PathBuf,
    /// Mail command invoked by the shell.
    pub mail_command: String,
    /// Space-separated recipients.
    pub recipients: String,
}

impl AlertTransport {
    /// Extracts the alert settings from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            shell: config.shell_command.clone(),
            mail_command: config.mail_command.clone(),
            recipients: config.email_addresses.clone(),
        }
    }
}

/// Hands alerts to an external delivery mechanism.
///
/// Delivery is fire-and-forget: failures are not reported back to the
/// supervisor and never retried.
pub trait AlertNotifier {
    /// Sends `message` to the recipients named by `transport`.
    fn notify(&self, transport: &AlertTransport, message: &AlertMessage);
}

/// Notifier that runs `<mail> -s "<subject>" <recipients>` through the
/// configured shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct MailNotifier;

impl MailNotifier {
    /// Shell command line used to deliver `message`.
    #[must_use]
    pub fn command_line(transport: &AlertTransport, message: &AlertMessage) -> String {
        format!(
            "{} -s \"{}\" {}{MAIL_REDIRECT}",
            transport.mail_command,
            message.subject(),
            transport.recipients
        )
    }
}

impl AlertNotifier for MailNotifier {
    fn notify(&self, transport: &AlertTransport, message: &AlertMessage) {
        let command_line = Self::command_line(transport, message);
        info!(
            target: ALERT_TARGET,
            process = %message.process(),
            kind = ?message.kind(),
            recipients = %transport.recipients,
            "sending alert"
        );
        match Command::new(&transport.shell)
            .arg("-c")
            .arg(&command_line)
            .status()
        {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(
                target: ALERT_TARGET,
                exit_code = ?status.code(),
                "mail pipeline exited unsuccessfully"
            ),
            Err(error) => warn!(
                target: ALERT_TARGET,
                shell = %transport.shell,
                error = %error,
                "failed to run mail pipeline"
            ),
        }
    }
}
