//! Playback of catalog tracks through an external player process.
//!
//! `PlaybackController` owns the single active session, the duration probe
//! and the progress synchronizer. Process control sits behind the
//! `PlayerBackend` / `PlayerProcess` traits and time behind `Clock`, so the
//! controller can be driven with mocks and a manual clock in tests.

mod clock;
mod controller;
mod process;
mod progress;
mod types;

pub use clock::*;
pub use controller::*;
pub use process::*;
pub use progress::*;
pub use types::*;

#[cfg(test)]
mod tests;
