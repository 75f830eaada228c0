use std::time::Duration;

use reqwest::Url;

use crate::catalog::{base_name, track_url};

use super::clock::Clock;
use super::process::{DurationProbe, PlayerBackend, PlayerProcess};
use super::progress::{ProgressState, ProgressSynchronizer};
use super::types::{ExitOutcome, PlaybackError, PlaybackEvent};

/// The one active playback.
pub struct PlaybackSession {
    pub(crate) process: Box<dyn PlayerProcess>,
    /// Catalog path of the track as listed by the server.
    pub track_path: String,
    /// Name used in notifications.
    pub name: String,
    pub url: Url,
    pub is_playing: bool,
    /// Seconds; 0 until the probe answers (or when it fails).
    pub song_duration: f64,
    /// Whole seconds counted by the progress synchronizer.
    pub elapsed_time: u64,
}

/// Owns at most one `PlaybackSession` and everything attached to it.
pub struct PlaybackController {
    backend: Box<dyn PlayerBackend>,
    clock: Box<dyn Clock>,
    base_url: Url,
    session: Option<PlaybackSession>,
    probe: Option<DurationProbe>,
    progress: ProgressSynchronizer,
    events: Vec<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(backend: Box<dyn PlayerBackend>, clock: Box<dyn Clock>, base_url: Url) -> Self {
        Self {
            backend,
            clock,
            base_url,
            session: None,
            probe: None,
            progress: ProgressSynchronizer::new(),
            events: Vec::new(),
        }
    }

    /// Start `track_path`, replacing whatever was playing.
    pub fn play(&mut self, track_path: &str) {
        self.end_session();

        let name = base_name(track_path).to_string();
        match self.start(track_path, &name) {
            Ok(session) => {
                tracing::info!(url = %session.url, "now playing {name}");
                self.probe = Some(self.backend.probe_duration(&session.url));
                self.session = Some(session);
                self.events.push(PlaybackEvent::NowPlaying(name));
            }
            Err(e) => {
                tracing::warn!(error = %e, track_path, "player failed to start");
                self.events.push(PlaybackEvent::PlayFailed(name));
            }
        }
    }

    fn start(&mut self, track_path: &str, name: &str) -> Result<PlaybackSession, PlaybackError> {
        let url = track_url(&self.base_url, track_path)?;
        let process = self.backend.spawn(&url)?;
        Ok(PlaybackSession {
            process,
            track_path: track_path.to_string(),
            name: name.to_string(),
            url,
            is_playing: true,
            song_duration: 0.0,
            elapsed_time: 0,
        })
    }

    /// Suspend or resume the player process.
    pub fn toggle_pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            self.events.push(PlaybackEvent::NoAudio);
            return;
        };

        let (result, event) = if session.is_playing {
            (session.process.suspend(), PlaybackEvent::Paused)
        } else {
            (session.process.resume(), PlaybackEvent::Resumed)
        };

        match result {
            Ok(()) => {
                session.is_playing = !session.is_playing;
                tracing::debug!(playing = session.is_playing, "pause toggled");
                self.events.push(event);
            }
            Err(e) => {
                tracing::warn!(error = %e, "pause toggle failed");
                self.events.push(PlaybackEvent::ControlFailed(e.to_string()));
            }
        }
    }

    /// User-requested stop. Silent when nothing is playing.
    pub fn stop(&mut self) {
        if let Some(name) = self.end_session() {
            self.events.push(PlaybackEvent::Stopped(name));
        }
    }

    /// Terminate the process, cancel the timer, then drop the session.
    fn end_session(&mut self) -> Option<String> {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.process.terminate() {
                tracing::warn!(error = %e, "failed to terminate player");
            }
        }
        self.progress.reset();
        self.probe = None;

        let session = self.session.take()?;
        tracing::info!(
            elapsed = session.elapsed_time,
            url = %session.url,
            "session ended: {}",
            session.name
        );
        Some(session.name)
    }

    /// Event-loop hook: collect the probe, observe player exit, fire ticks.
    pub fn poll(&mut self) {
        let now = self.clock.now();

        if let Some(secs) = self.probe.as_ref().and_then(DurationProbe::try_take) {
            self.probe = None;
            if let Some(session) = self.session.as_mut() {
                session.song_duration = secs;
                self.progress.start(secs, now);
                tracing::debug!(secs, "duration resolved");
            }
        }

        let exited = match self.session.as_mut().map(|s| s.process.try_wait()) {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "failed to poll player");
                None
            }
            None => None,
        };
        if let Some(outcome) = exited {
            self.handle_exit(outcome);
            return;
        }

        if let Some(session) = self.session.as_mut() {
            self.progress.advance(session, now);
        }
    }

    fn handle_exit(&mut self, outcome: ExitOutcome) {
        let Some(name) = self.end_session() else {
            return;
        };
        if outcome.is_abnormal() {
            tracing::warn!(?outcome, "player exited abnormally");
            self.events.push(PlaybackEvent::Ended(name));
        } else {
            self.events.push(PlaybackEvent::Finished(name));
        }
    }

    /// Notifications since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_playing)
    }

    pub fn elapsed(&self) -> Duration {
        self.session
            .as_ref()
            .map(|s| Duration::from_secs(s.elapsed_time))
            .unwrap_or_default()
    }

    /// Resolved duration, `None` while unknown or zero.
    pub fn duration(&self) -> Option<Duration> {
        self.session
            .as_ref()
            .map(|s| s.song_duration)
            .filter(|d| *d > 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn percent(&self) -> f64 {
        self.progress.percent()
    }

    pub fn progress_state(&self) -> ProgressState {
        self.progress.state()
    }

    #[cfg(test)]
    pub fn has_tick_timer(&self) -> bool {
        self.progress.has_timer()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.end_session();
    }
}
