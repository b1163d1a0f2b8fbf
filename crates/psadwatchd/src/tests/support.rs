//! Sandboxes and recording collaborators shared by the watchdog suites.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use nix::unistd::Pid;
use psadwatch_config::ProcessName;
use tempfile::TempDir;

use crate::alert::{AlertKind, AlertMessage, AlertNotifier, AlertTransport};
use crate::launcher::{LaunchError, LaunchReport, ProcessLauncher};
use crate::monitor::LivenessProbe;
use crate::process::{DaemonizeError, Daemonizer};
use crate::supervisor::{Collaborators, Pause};

pub(crate) const TEST_HOST: &str = "sentry";

/// Temporary directory holding a config file and the daemons' pid files.
pub(crate) struct Sandbox {
    _dir: TempDir,
    root: Utf8PathBuf,
    generation: AtomicUsize,
}

impl Sandbox {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8Path::from_path(dir.path())
            .expect("temp dir should be UTF-8")
            .to_path_buf();
        Self {
            _dir: dir,
            root,
            generation: AtomicUsize::new(0),
        }
    }

    pub(crate) fn config_path(&self) -> Utf8PathBuf {
        self.root.join("psadwatchd.conf")
    }

    pub(crate) fn watchdog_pid_file(&self) -> Utf8PathBuf {
        self.root.join("psadwatchd.pid")
    }

    pub(crate) fn pid_file(&self, name: ProcessName) -> Utf8PathBuf {
        self.root.join(format!("{name}.pid"))
    }

    pub(crate) fn binary(&self, name: ProcessName) -> Utf8PathBuf {
        self.root.join("sbin").join(name.as_str())
    }

    /// Writes a complete config file and stamps it with a fresh modification
    /// time so every rewrite is seen as a change.
    pub(crate) fn write_config(&self, max_retries: u32, interval_secs: u32) {
        let mut text = String::from("# psadwatchd test configuration\n");
        for name in ProcessName::ALL {
            text.push_str(&format!(
                "{}    {};\n{}    {};\n",
                name.binary_key(),
                self.binary(name),
                name.pid_file_key(),
                self.pid_file(name),
            ));
        }
        text.push_str(&format!(
            "shCmd    /bin/sh;\n\
             mailCmd    /bin/true;\n\
             EMAIL_ADDRESSES    root@localhost;\n\
             PSADWATCHD_CHECK_INTERVAL    {interval_secs};\n\
             PSADWATCHD_MAX_RETRIES    {max_retries};\n\
             PSADWATCHD_PID_FILE    {};\n",
            self.watchdog_pid_file(),
        ));
        let path = self.config_path();
        fs::write(&path, text).expect("write config");

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) as u64;
        let stamp = UNIX_EPOCH + Duration::from_secs(1_700_000_000 + generation * 60);
        set_modified(&path, stamp);
    }

    pub(crate) fn write_pid(&self, name: ProcessName, pid: i32) {
        fs::write(self.pid_file(name), format!("{pid}\n")).expect("write pid file");
    }

    pub(crate) fn remove_pid(&self, name: ProcessName) {
        let path = self.pid_file(name);
        if path.exists() {
            fs::remove_file(path).expect("remove pid file");
        }
    }
}

fn set_modified(path: &Utf8Path, stamp: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(stamp))
        .expect("set modification time");
}

/// Probe answering from a shared set of live pids and recording every pid it
/// was asked about.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeProbe {
    alive: Arc<Mutex<BTreeSet<i32>>>,
    probed: Arc<Mutex<Vec<i32>>>,
}

impl FakeProbe {
    pub(crate) fn mark_alive(&self, pid: i32) {
        self.alive.lock().expect("probe mutex").insert(pid);
    }

    pub(crate) fn mark_dead(&self, pid: i32) {
        self.alive.lock().expect("probe mutex").remove(&pid);
    }

    pub(crate) fn probes_of(&self, pid: i32) -> usize {
        self.probed
            .lock()
            .expect("probe mutex")
            .iter()
            .filter(|probed| **probed == pid)
            .count()
    }
}

impl LivenessProbe for FakeProbe {
    fn is_alive(&self, pid: Pid) -> bool {
        self.probed.lock().expect("probe mutex").push(pid.as_raw());
        self.alive.lock().expect("probe mutex").contains(&pid.as_raw())
    }
}

/// Launcher that records launches instead of spawning anything.
///
/// A binary registered through [`RecordingLauncher::revive_on_launch`] writes
/// its pid file when launched, emulating a daemon that came back.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingLauncher {
    launches: Arc<Mutex<Vec<Utf8PathBuf>>>,
    revivals: Arc<Mutex<BTreeMap<Utf8PathBuf, (Utf8PathBuf, i32)>>>,
    fail_spawns: Arc<Mutex<bool>>,
}

impl RecordingLauncher {
    pub(crate) fn revive_on_launch(&self, binary: Utf8PathBuf, pid_file: Utf8PathBuf, pid: i32) {
        self.revivals
            .lock()
            .expect("launcher mutex")
            .insert(binary, (pid_file, pid));
    }

    pub(crate) fn fail_spawns(&self) {
        *self.fail_spawns.lock().expect("launcher mutex") = true;
    }

    pub(crate) fn launches_of(&self, binary: &Utf8Path) -> usize {
        self.launches
            .lock()
            .expect("launcher mutex")
            .iter()
            .filter(|launched| launched.as_path() == binary)
            .count()
    }

    pub(crate) fn total_launches(&self) -> usize {
        self.launches.lock().expect("launcher mutex").len()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch_and_wait(
        &self,
        binary: &Utf8Path,
        _cmdline_file: Option<&Utf8Path>,
    ) -> Result<LaunchReport, LaunchError> {
        if *self.fail_spawns.lock().expect("launcher mutex") {
            return Err(LaunchError::Spawn {
                binary: binary.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        self.launches
            .lock()
            .expect("launcher mutex")
            .push(binary.to_path_buf());
        if let Some((pid_file, pid)) = self.revivals.lock().expect("launcher mutex").get(binary) {
            fs::write(pid_file, format!("{pid}\n")).expect("write revived pid file");
        }
        Ok(LaunchReport { exit_code: Some(0) })
    }
}

/// Notifier that keeps every alert it is handed.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingNotifier {
    messages: Arc<Mutex<Vec<AlertMessage>>>,
}

impl RecordingNotifier {
    pub(crate) fn messages(&self) -> Vec<AlertMessage> {
        self.messages.lock().expect("notifier mutex").clone()
    }

    pub(crate) fn last_of_kind(&self, kind: AlertKind) -> Option<AlertMessage> {
        self.messages()
            .into_iter()
            .rev()
            .find(|message| message.kind() == kind)
    }
}

impl AlertNotifier for RecordingNotifier {
    fn notify(&self, _transport: &AlertTransport, message: &AlertMessage) {
        self.messages
            .lock()
            .expect("notifier mutex")
            .push(message.clone());
    }
}

/// Pause that returns immediately and records the requested intervals.
///
/// When a file is registered through [`RecordingPause::snapshot_on_pause`],
/// its contents are captured at every pause (`None` when unreadable).
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingPause {
    intervals: Arc<Mutex<Vec<Duration>>>,
    snapshot_path: Arc<Mutex<Option<Utf8PathBuf>>>,
    snapshots: Arc<Mutex<Vec<Option<String>>>>,
}

impl RecordingPause {
    pub(crate) fn intervals(&self) -> Vec<Duration> {
        self.intervals.lock().expect("pause mutex").clone()
    }

    pub(crate) fn snapshot_on_pause(&self, path: Utf8PathBuf) {
        *self.snapshot_path.lock().expect("pause mutex") = Some(path);
    }

    pub(crate) fn snapshots(&self) -> Vec<Option<String>> {
        self.snapshots.lock().expect("pause mutex").clone()
    }
}

impl Pause for RecordingPause {
    fn pause(&self, interval: Duration) {
        self.intervals.lock().expect("pause mutex").push(interval);
        if let Some(path) = self.snapshot_path.lock().expect("pause mutex").as_ref() {
            let contents = fs::read_to_string(path).ok();
            self.snapshots.lock().expect("pause mutex").push(contents);
        }
    }
}

/// Daemoniser that only counts how often detachment was requested.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingDaemonizer {
    calls: Arc<AtomicUsize>,
}

impl CountingDaemonizer {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Daemonizer for CountingDaemonizer {
    fn daemonize(&self, _work_dir: &Utf8Path) -> Result<(), DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Recording collaborators plus handles for inspecting them afterwards.
#[derive(Debug, Clone, Default)]
pub(crate) struct Fakes {
    pub(crate) probe: FakeProbe,
    pub(crate) launcher: RecordingLauncher,
    pub(crate) notifier: RecordingNotifier,
    pub(crate) pause: RecordingPause,
}

impl Fakes {
    pub(crate) fn collaborators(
        &self,
    ) -> Collaborators<FakeProbe, RecordingLauncher, RecordingNotifier, RecordingPause> {
        Collaborators {
            probe: self.probe.clone(),
            launcher: self.launcher.clone(),
            notifier: self.notifier.clone(),
            pause: self.pause.clone(),
        }
    }
}

/// Pid assigned to each daemon when a test marks it running.
pub(crate) const fn running_pid(name: ProcessName) -> i32 {
    match name {
        ProcessName::Psad => 41_001,
        ProcessName::Kmsgsd => 41_002,
        ProcessName::Diskmond => 41_003,
    }
}

/// Pid a revived daemon writes after a restart.
pub(crate) const fn revived_pid(name: ProcessName) -> i32 {
    running_pid(name) + 1_000
}
