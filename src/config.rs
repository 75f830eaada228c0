//! Settings for the catalog server, the external player, the UI and logging.
//!
//! `schema` holds the serde types and their defaults; `load` layers the
//! optional TOML file and `CADENZA__*` environment variables on top.

mod load;
mod schema;

pub use load::{SettingsError, default_log_dir};
pub use schema::*;
