//! Playback-related small types: events, exit classification and errors.

use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use thiserror::Error;

use crate::catalog::FetchError;

/// User-visible notifications produced by the controller, drained by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A new session started.
    NowPlaying(String),
    /// The player could not be started; no session exists.
    PlayFailed(String),
    /// Pause toggle with nothing playing.
    NoAudio,
    Paused,
    Resumed,
    /// The player exited cleanly at end of stream.
    Finished(String),
    /// The player exited with a non-zero code or was killed by a signal.
    Ended(String),
    /// Explicit stop from the user.
    Stopped(String),
    /// Suspend or resume could not be delivered.
    ControlFailed(String),
}

impl fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackEvent::NowPlaying(name) => write!(f, "Now playing: {name}"),
            PlaybackEvent::PlayFailed(name) => write!(f, "Error playing: {name}"),
            PlaybackEvent::NoAudio => f.write_str("No audio playing"),
            PlaybackEvent::Paused => f.write_str("Paused"),
            PlaybackEvent::Resumed => f.write_str("Playing..."),
            PlaybackEvent::Finished(name) => write!(f, "Finished: {name}"),
            PlaybackEvent::Ended(name) => write!(f, "Playback ended: {name}"),
            PlaybackEvent::Stopped(name) => write!(f, "Stopped: {name}"),
            PlaybackEvent::ControlFailed(reason) => write!(f, "Playback control failed: {reason}"),
        }
    }
}

/// How the player process went away.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit code.
    Code(i32),
    /// Killed by the given signal number.
    Signal(i32),
}

impl ExitOutcome {
    pub fn is_abnormal(self) -> bool {
        !matches!(self, ExitOutcome::Success)
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(0), _) => ExitOutcome::Success,
            (Some(code), _) => ExitOutcome::Code(code),
            (None, Some(sig)) => ExitOutcome::Signal(sig),
            // Stopped/continued statuses never reach here; count the rest as failures.
            (None, None) => ExitOutcome::Code(-1),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to send {signal} to player: {source}")]
    Signal {
        signal: &'static str,
        #[source]
        source: nix::Error,
    },
    #[error("failed to observe player: {0}")]
    Wait(#[from] std::io::Error),
    #[error(transparent)]
    Url(#[from] FetchError),
}
