//! Progress estimate derived from time spent playing.
//!
//! The external player reports nothing back, so position is counted here:
//! one second per tick, only while the session is playing.

use std::time::{Duration, Instant};

use super::clock::TickTimer;
use super::controller::PlaybackSession;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ProgressState {
    /// No duration known (or zero); the bar does not move.
    #[default]
    Idle,
    Ticking,
    /// Elapsed reached the duration; the timer is gone.
    Complete,
}

/// `elapsed / duration` as a percentage, clamped to 100. Zero when the
/// duration is unknown.
pub fn percent_of(elapsed_secs: u64, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    (elapsed_secs as f64 / duration_secs * 100.0).min(100.0)
}

#[derive(Debug, Default)]
pub struct ProgressSynchronizer {
    state: ProgressState,
    timer: Option<TickTimer>,
    percent: f64,
}

impl ProgressSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    #[cfg(test)]
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Begin tracking once the duration is known. Replaces any running timer.
    pub fn start(&mut self, duration_secs: f64, now: Instant) {
        self.reset();
        if duration_secs > 0.0 {
            self.state = ProgressState::Ticking;
            self.timer = Some(TickTimer::start(now, TICK_PERIOD));
        }
    }

    /// Cancel the timer and return to Idle.
    pub fn reset(&mut self) {
        self.timer = None;
        self.state = ProgressState::Idle;
        self.percent = 0.0;
    }

    /// Fire every tick that is due at `now`. Returns how many advanced the
    /// elapsed time.
    pub fn advance(&mut self, session: &mut PlaybackSession, now: Instant) -> u32 {
        let due = match self.timer.as_mut() {
            Some(timer) => timer.due(now),
            None => return 0,
        };

        let mut counted = 0;
        for _ in 0..due {
            if self.tick(session) {
                counted += 1;
            }
            if self.state != ProgressState::Ticking {
                break;
            }
        }
        counted
    }

    /// One timer period. Skipped while paused.
    pub fn tick(&mut self, session: &mut PlaybackSession) -> bool {
        if self.state != ProgressState::Ticking || !session.is_playing {
            return false;
        }

        session.elapsed_time += 1;
        self.percent = percent_of(session.elapsed_time, session.song_duration);
        tracing::trace!(
            elapsed = session.elapsed_time,
            percent = self.percent,
            "progress tick"
        );

        if session.elapsed_time as f64 >= session.song_duration {
            self.state = ProgressState::Complete;
            self.timer = None;
        }
        true
    }
}
