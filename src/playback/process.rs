//! External player and duration prober processes.
//!
//! Pause and resume are SIGSTOP / SIGCONT on the player process; the player
//! only has to play a URL and exit at end of stream.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use reqwest::Url;

use crate::config::PlayerSettings;

use super::types::{ExitOutcome, PlaybackError};

/// Control surface of a running player.
pub trait PlayerProcess {
    fn suspend(&mut self) -> Result<(), PlaybackError>;
    fn resume(&mut self) -> Result<(), PlaybackError>;
    /// Kill the process and reap it. Must be a no-op once it has exited.
    fn terminate(&mut self) -> Result<(), PlaybackError>;
    /// Non-blocking exit check.
    fn try_wait(&mut self) -> Result<Option<ExitOutcome>, PlaybackError>;
}

/// Starts players and duration probes for a stream URL.
pub trait PlayerBackend {
    fn spawn(&mut self, url: &Url) -> Result<Box<dyn PlayerProcess>, PlaybackError>;
    fn probe_duration(&mut self, url: &Url) -> DurationProbe;
}

/// A duration lookup that may still be running.
///
/// Dropping an unfinished probe kills its prober process.
pub struct DurationProbe {
    rx: Receiver<f64>,
    child: Option<ProbeChild>,
}

/// The prober process behind a `DurationProbe`. `reaped` is set under the
/// lock right after `wait`, so an unreaped pid is never recycled.
struct ProbeChild {
    pid: Pid,
    reaped: Arc<Mutex<bool>>,
}

impl DurationProbe {
    /// Run `command` and parse its stdout as seconds on a helper thread.
    pub fn run(mut command: Command) -> Self {
        let (tx, rx) = mpsc::channel();

        let mut child = match command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(error = %e, "duration probe could not start");
                let _ = tx.send(0.0);
                return Self { rx, child: None };
            }
        };

        let pid = Pid::from_raw(child.id() as i32);
        let reaped = Arc::new(Mutex::new(false));
        let thread_reaped = Arc::clone(&reaped);
        let stdout = child.stdout.take();

        thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut out) = stdout {
                let _ = out.read_to_string(&mut text);
            }
            let status = {
                let mut reaped = thread_reaped.lock().unwrap_or_else(PoisonError::into_inner);
                let status = child.wait();
                *reaped = true;
                status
            };

            let secs = match status {
                Ok(status) if status.success() => parse_duration(&text),
                Ok(status) => {
                    tracing::debug!(%status, "duration probe failed");
                    0.0
                }
                Err(e) => {
                    tracing::debug!(error = %e, "duration probe was lost");
                    0.0
                }
            };
            let _ = tx.send(secs);
        });

        Self {
            rx,
            child: Some(ProbeChild { pid, reaped }),
        }
    }

    /// A probe resolved by whoever holds the sender.
    #[cfg(test)]
    pub(crate) fn channel() -> (mpsc::Sender<f64>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx, child: None })
    }

    /// `None` while running. A probe thread that died resolves to 0.
    pub fn try_take(&self) -> Option<f64> {
        match self.rx.try_recv() {
            Ok(secs) => Some(secs),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(0.0),
        }
    }
}

impl Drop for DurationProbe {
    fn drop(&mut self) {
        let Some(child) = &self.child else {
            return;
        };
        let reaped = child.reaped.lock().unwrap_or_else(PoisonError::into_inner);
        if !*reaped {
            tracing::debug!(pid = child.pid.as_raw(), "cancelling duration probe");
            let _ = kill(child.pid, Signal::SIGKILL);
        }
    }
}

/// Parse prober output as seconds. Anything unusable becomes 0.
pub fn parse_duration(text: &str) -> f64 {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .unwrap_or(0.0)
}

/// Spawns the configured player/prober binaries.
pub struct ExternalBackend {
    settings: PlayerSettings,
}

impl ExternalBackend {
    pub fn new(settings: PlayerSettings) -> Self {
        Self { settings }
    }
}

impl PlayerBackend for ExternalBackend {
    fn spawn(&mut self, url: &Url) -> Result<Box<dyn PlayerProcess>, PlaybackError> {
        let child = Command::new(&self.settings.command)
            .args(&self.settings.args)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                command: self.settings.command.clone(),
                source,
            })?;

        tracing::debug!(pid = child.id(), %url, "player started");
        Ok(Box::new(ExternalProcess { child, exited: None }))
    }

    fn probe_duration(&mut self, url: &Url) -> DurationProbe {
        tracing::debug!(%url, "probing duration");
        let mut command = Command::new(&self.settings.probe_command);
        command
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(url.as_str());
        DurationProbe::run(command)
    }
}

/// A player child process controlled with POSIX signals.
pub struct ExternalProcess {
    child: Child,
    exited: Option<ExitOutcome>,
}

impl ExternalProcess {
    fn signal(&self, signal: Signal, name: &'static str) -> Result<(), PlaybackError> {
        let pid = Pid::from_raw(self.child.id() as i32);
        kill(pid, signal).map_err(|source| PlaybackError::Signal {
            signal: name,
            source,
        })
    }
}

impl PlayerProcess for ExternalProcess {
    fn suspend(&mut self) -> Result<(), PlaybackError> {
        self.signal(Signal::SIGSTOP, "SIGSTOP")
    }

    fn resume(&mut self) -> Result<(), PlaybackError> {
        self.signal(Signal::SIGCONT, "SIGCONT")
    }

    fn terminate(&mut self) -> Result<(), PlaybackError> {
        if self.exited.is_some() {
            return Ok(());
        }
        // SIGKILL also takes down a SIGSTOPped player.
        if let Err(e) = self.child.kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(e.into());
            }
        }
        let status = self.child.wait()?;
        self.exited = Some(ExitOutcome::from(status));
        Ok(())
    }

    fn try_wait(&mut self) -> Result<Option<ExitOutcome>, PlaybackError> {
        if let Some(outcome) = self.exited {
            return Ok(Some(outcome));
        }
        let outcome = self.child.try_wait()?.map(ExitOutcome::from);
        self.exited = outcome;
        Ok(outcome)
    }
}

impl Drop for ExternalProcess {
    fn drop(&mut self) {
        let _ = self.terminate();
    }
}
