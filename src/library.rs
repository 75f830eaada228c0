//! Library tree: artist -> album -> track hierarchy built from the flat
//! catalog listing.
//!
//! The tree lives in `library::tree`; lookups go through `NodeKey` so views
//! and the selection router never hold references into a tree that may be
//! rebuilt by the next fetch.

mod tree;

pub use tree::*;
