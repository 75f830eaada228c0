//! Remote catalog access.
//!
//! The catalog server lists its songs at `<base-url>/songs` and serves each
//! one at `<base-url>/songs/<basename>`. This module owns the wire model for
//! that listing, the URL construction shared by the player and the prober,
//! and the background fetch used by the event loop.

mod fetch;
mod model;

pub use fetch::*;
pub use model::*;
