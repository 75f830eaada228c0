//! Browser state shared by the TUI and the runtime.
//!
//! `app::model` holds the library tree with its expansion state and the
//! track table. Selections come back as `SelectionOutcome`s that the runtime
//! hands to the playback controller.

mod model;

pub use model::*;
