//! systemd-journald backend
//!
//! Spawns `journalctl --follow --output=json` and hands each parsed entry to a
//! reader-thread callback. [`JournalPump`] drives [`SystemEvents`](super::SystemEvents)
//! from the full journal; [`JournalPowerWatcher`] answers the power-management
//! query from kernel messages.

use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::rules::{classify_kernel, classify_system};
use super::{EventPump, ManagementEvent, ManagementWatcher, NotificationHub, RunningPump, SystemHubs};

pub const POWER_MANAGEMENT_QUERY: &str = "Win32_PowerManagementEvent";

const FOLLOW_ARGS: [&str; 4] = ["--follow", "--output=json", "--lines=0", "--quiet"];

/// The fields of a journal entry this backend reads
#[derive(Debug, Clone, Deserialize)]
pub struct JournalEntry {
    #[serde(rename = "MESSAGE", default)]
    pub message: String,
    #[serde(rename = "SYSLOG_IDENTIFIER", default)]
    pub identifier: Option<String>,
}

impl JournalEntry {
    /// Parse one `--output=json` line. Entries with binary messages are skipped.
    pub fn parse(line: &str) -> Option<Self> {
        match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping journal line: {}", e);
                None
            }
        }
    }
}

/// Locate journalctl on PATH
pub fn journalctl() -> Result<PathBuf> {
    which::which("journalctl").context("journald is not available (journalctl not found on PATH)")
}

/// Command for a tail child, placed in its own process group so a terminal
/// interrupt aimed at the monitor does not reach it
fn tail_command(program: &Path) -> Command {
    let mut command = Command::new(program);
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

/// A running `journalctl --follow` child and its reader thread
pub struct JournalTail {
    child: Child,
    reader: Option<JoinHandle<()>>,
}

impl JournalTail {
    pub fn spawn<F, E>(extra_args: &[&str], on_entry: F, on_exit: E) -> Result<Self>
    where
        F: FnMut(JournalEntry) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let program = journalctl()?;
        let mut command = tail_command(&program);
        command.args(FOLLOW_ARGS).args(extra_args);
        Self::spawn_command(command, on_entry, on_exit)
    }

    fn spawn_command<F, E>(mut command: Command, mut on_entry: F, on_exit: E) -> Result<Self>
    where
        F: FnMut(JournalEntry) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let program = PathBuf::from(command.get_program());
        let mut child = command
            .spawn()
            .context(format!("Failed to spawn {}", program.display()))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(eyre!("Failed to capture journalctl stdout"));
        };

        let reader = thread::Builder::new().name("journal-tail".to_string()).spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => {
                        if let Some(entry) = JournalEntry::parse(&line) {
                            on_entry(entry);
                        }
                    }
                    Err(e) => {
                        log::warn!("Error reading journal: {}", e);
                        break;
                    }
                }
            }
            on_exit();
        });

        match reader {
            Ok(reader) => {
                log::debug!("Tailing journal: {} {:?}", program.display(), command.get_args().collect::<Vec<_>>());
                Ok(Self {
                    child,
                    reader: Some(reader),
                })
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e).context("Failed to spawn journal reader thread")
            }
        }
    }

    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };

        if self.child.try_wait().context("Failed to poll journalctl")?.is_none() {
            self.child.kill().context("Failed to kill journalctl")?;
        }
        self.child.wait().context("Failed to reap journalctl")?;
        reader.join().map_err(|_| eyre!("Journal reader thread panicked"))?;
        Ok(())
    }
}

impl Drop for JournalTail {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("Journal tail did not shut down cleanly: {}", e);
        }
    }
}

/// Feeds power and session notifications from the whole journal
#[derive(Debug, Default)]
pub struct JournalPump;

impl JournalPump {
    pub fn new() -> Self {
        Self
    }
}

struct RunningJournalPump(JournalTail);

impl RunningPump for RunningJournalPump {
    fn stop(self: Box<Self>) -> Result<()> {
        self.0.stop()
    }
}

impl EventPump for JournalPump {
    fn start(&self, hubs: Arc<SystemHubs>) -> Result<Box<dyn RunningPump>> {
        let deliver_to = Arc::clone(&hubs);
        let tail = JournalTail::spawn(
            &[],
            move |entry| {
                if let Some(notification) = classify_system(&entry) {
                    log::debug!("Journal entry {:?} -> {:?}", entry.message, notification);
                    deliver_to.deliver(notification);
                }
            },
            move || {
                log::info!("System event pump thread exited");
                hubs.pump_exited();
            },
        )?;
        Ok(Box::new(RunningJournalPump(tail)))
    }
}

/// Management watcher for power-management events, backed by kernel messages
pub struct JournalPowerWatcher {
    arrived: Arc<NotificationHub<ManagementEvent>>,
    tail: Mutex<Option<JournalTail>>,
}

impl JournalPowerWatcher {
    pub fn new() -> Self {
        Self {
            arrived: Arc::new(NotificationHub::new("EventArrived")),
            tail: Mutex::new(None),
        }
    }
}

impl Default for JournalPowerWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagementWatcher for JournalPowerWatcher {
    fn query(&self) -> &str {
        POWER_MANAGEMENT_QUERY
    }

    fn event_arrived(&self) -> &NotificationHub<ManagementEvent> {
        &self.arrived
    }

    fn start(&self) -> Result<()> {
        let mut tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        if tail.is_some() {
            return Ok(());
        }

        let arrived = Arc::clone(&self.arrived);
        *tail = Some(JournalTail::spawn(
            &["--dmesg"],
            move |entry| {
                if let Some(code) = classify_kernel(&entry.message) {
                    arrived.fire(
                        ManagementEvent::new()
                            .with("__CLASS", POWER_MANAGEMENT_QUERY)
                            .with("EventType", code),
                    );
                }
            },
            || log::info!("Power management watcher thread exited"),
        )?);
        log::info!("Watching {}", POWER_MANAGEMENT_QUERY);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner).take();
        match tail {
            Some(tail) => tail.stop().context(format!("Failed to stop {} watcher", POWER_MANAGEMENT_QUERY)),
            None => Ok(()),
        }
    }
}
