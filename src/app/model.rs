//! Application model types: `App`, `Focus` and the table/tree row views.
//!
//! `App` is plain state: it never talks to the network or to processes.
//! Selecting a node returns a `SelectionOutcome` that the runtime turns into
//! playback controller calls.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::catalog::{CatalogEntry, FetchError};
use crate::library::{AlbumNode, LibraryNode, LibraryTree, NodeKey, TrackNode};

/// Which pane receives navigation keys.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Tree,
    Table,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("nothing is selected")]
    NothingSelected,
    #[error("\"{0}\" is no longer in the library")]
    NotFound(String),
}

/// What the runtime should do after a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Start playback of this catalog path.
    Play(String),
    /// The table/tree changed; nothing to play.
    Browsed,
    /// The selection failed and the table shows an error row.
    Failed,
}

/// One visible line of the library tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub key: NodeKey,
    pub expandable: bool,
    pub expanded: bool,
}

/// One line of the track table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub number: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub duration: String,
    /// `None` for placeholder rows that cannot be played.
    pub file_path: Option<String>,
}

impl TableRow {
    fn from_track(album: &AlbumNode, track: &TrackNode) -> Self {
        Self {
            number: track.track.clone().unwrap_or_else(|| "-".to_string()),
            title: track.name.clone(),
            artist: album.artist.clone(),
            album: album.name.clone(),
            year: track.year.clone().unwrap_or_default(),
            duration: track
                .duration
                .as_deref()
                .map(format_duration_text)
                .unwrap_or_default(),
            file_path: Some(track.file_path.clone()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            number: "!".to_string(),
            title: message.into(),
            artist: String::new(),
            album: String::new(),
            year: String::new(),
            duration: String::new(),
            file_path: None,
        }
    }
}

/// Render a duration tag: numeric seconds become `m:ss`, anything else is
/// shown as-is.
pub fn format_duration_text(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => {
            let secs = secs.round() as u64;
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        _ => raw.trim().to_string(),
    }
}

/// The main application model.
pub struct App {
    pub tree: LibraryTree,
    expanded: BTreeSet<NodeKey>,
    rows: Vec<TreeRow>,
    pub selected: usize,

    pub table: Vec<TableRow>,
    pub table_selected: usize,
    pub table_title: String,

    pub focus: Focus,
    pub status: String,
    /// The status line reports a failure.
    pub status_is_error: bool,
    pub loading: bool,
    pub show_directories: bool,
    pub server: Option<String>,
}

impl App {
    /// Create an empty `App`; the library arrives with the first fetch.
    pub fn new(show_directories: bool) -> Self {
        Self {
            tree: LibraryTree::default(),
            expanded: BTreeSet::new(),
            rows: Vec::new(),
            selected: 0,

            table: Vec::new(),
            table_selected: 0,
            table_title: String::new(),

            focus: Focus::Tree,
            status: String::new(),
            status_is_error: false,
            loading: false,
            show_directories,
            server: None,
        }
    }

    /// Record the catalog server shown in the header.
    pub fn set_server(&mut self, server: String) {
        self.server = Some(server);
    }

    /// Replace the status line.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.status_is_error = false;
    }

    /// Replace the status line with a failure message.
    pub fn set_error_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.status_is_error = true;
    }

    /// Apply the result of a catalog fetch.
    ///
    /// On success the tree is rebuilt from scratch; on failure the previous
    /// tree stays and only the status line changes.
    pub fn apply_catalog(&mut self, result: Result<Vec<CatalogEntry>, FetchError>) {
        self.loading = false;
        match result {
            Ok(entries) => {
                let tree = LibraryTree::build(&entries);
                let count = tree.track_count();
                let empty = tree.is_empty();
                self.set_library(tree);
                tracing::info!(tracks = count, entries = entries.len(), "catalog loaded");
                if empty {
                    self.set_status("Catalog is empty");
                } else {
                    self.set_status(format!("Loaded {count} tracks"));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog fetch failed");
                self.set_error_status(format!("Failed to fetch songs: {e}"));
            }
        }
    }

    /// Swap in a freshly built tree, keeping expansion and selection for
    /// nodes that still exist.
    pub fn set_library(&mut self, tree: LibraryTree) {
        let selected_key = self.selected_key().cloned();
        self.tree = tree;
        let tree = &self.tree;
        self.expanded.retain(|k| tree.resolve(k).is_some());
        self.refresh_rows();

        self.selected = selected_key
            .and_then(|k| self.rows.iter().position(|r| r.key == k))
            .unwrap_or(0);
    }

    /// Rows currently visible in the tree pane.
    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn selected_key(&self) -> Option<&NodeKey> {
        self.rows.get(self.selected).map(|r| &r.key)
    }

    fn refresh_rows(&mut self) {
        let mut rows = Vec::new();

        for artist in self.tree.artists() {
            let artist_key = NodeKey::Artist(artist.name.clone());
            let artist_open = self.expanded.contains(&artist_key);
            rows.push(TreeRow {
                key: artist_key,
                expandable: !artist.albums.is_empty(),
                expanded: artist_open,
            });
            if !artist_open {
                continue;
            }

            for album in artist.albums.values() {
                let album_key = NodeKey::Album {
                    artist: artist.name.clone(),
                    album: album.name.clone(),
                };
                let album_open = self.expanded.contains(&album_key);
                rows.push(TreeRow {
                    key: album_key,
                    expandable: !album.tracks.is_empty(),
                    expanded: album_open,
                });
                if !album_open {
                    continue;
                }

                rows.extend(album.tracks.values().map(|track| TreeRow {
                    key: NodeKey::Track {
                        artist: artist.name.clone(),
                        album: album.name.clone(),
                        title: track.name.clone(),
                    },
                    expandable: false,
                    expanded: false,
                }));
            }
        }

        if self.show_directories {
            rows.extend(self.tree.directories().map(|dir| TreeRow {
                key: NodeKey::Directory(dir.name.clone()),
                expandable: !dir.children.is_empty(),
                expanded: false,
            }));
        }

        self.rows = rows;
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    /// Move the tree cursor down, stopping at the last row.
    pub fn next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    /// Move the tree cursor up, stopping at the first row.
    pub fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn first(&mut self) {
        self.selected = 0;
    }

    pub fn last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    pub fn table_next(&mut self) {
        if self.table_selected + 1 < self.table.len() {
            self.table_selected += 1;
        }
    }

    pub fn table_prev(&mut self) {
        self.table_selected = self.table_selected.saturating_sub(1);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Table,
            Focus::Table => Focus::Tree,
        };
    }

    /// Collapse the selected node, or jump to its parent when it is a leaf
    /// or already collapsed.
    pub fn collapse_or_parent(&mut self) {
        let Some(key) = self.selected_key().cloned() else {
            return;
        };

        if self.expanded.remove(&key) {
            self.refresh_rows();
            return;
        }

        let parent = match key {
            NodeKey::Album { artist, .. } => Some(NodeKey::Artist(artist)),
            NodeKey::Track { artist, album, .. } => Some(NodeKey::Album { artist, album }),
            NodeKey::Artist(_) | NodeKey::Directory(_) => None,
        };
        if let Some(pos) = parent.and_then(|p| self.rows.iter().position(|r| r.key == p)) {
            self.selected = pos;
        }
    }

    /// Activate the row under the tree cursor.
    pub fn select_current(&mut self) -> SelectionOutcome {
        match self.selected_key().cloned() {
            Some(key) => self.select(&key),
            None => self.fail_selection(SelectionError::NothingSelected),
        }
    }

    /// Route a tree selection: containers expand/collapse and fill the
    /// table, tracks are handed back for playback.
    pub fn select(&mut self, key: &NodeKey) -> SelectionOutcome {
        match self.try_select(key) {
            Ok(outcome) => outcome,
            Err(e) => self.fail_selection(e),
        }
    }

    fn try_select(&mut self, key: &NodeKey) -> Result<SelectionOutcome, SelectionError> {
        let node = self
            .tree
            .resolve(key)
            .ok_or_else(|| SelectionError::NotFound(key.label().to_string()))?;

        let (table, title) = match node {
            LibraryNode::Artist(artist) => (
                artist
                    .tracks()
                    .map(|(album, track)| TableRow::from_track(album, track))
                    .collect(),
                artist.name.clone(),
            ),
            LibraryNode::Album(album) => {
                let artist = self
                    .tree
                    .parent_of(album)
                    .map(|a| a.name.as_str())
                    .unwrap_or(album.artist.as_str());
                (
                    album
                        .tracks
                        .values()
                        .map(|track| TableRow::from_track(album, track))
                        .collect(),
                    format!("{} / {}", artist, album.name),
                )
            }
            LibraryNode::Track(track) => {
                let path = track.file_path.clone();
                if let Some(pos) = self
                    .table
                    .iter()
                    .position(|r| r.file_path.as_deref() == Some(path.as_str()))
                {
                    self.table_selected = pos;
                }
                return Ok(SelectionOutcome::Play(path));
            }
            LibraryNode::Directory(dir) => (Vec::new(), dir.name.clone()),
        };

        if matches!(key, NodeKey::Artist(_) | NodeKey::Album { .. }) {
            if !self.expanded.remove(key) {
                self.expanded.insert(key.clone());
            }
            self.refresh_rows();
            if let Some(pos) = self.rows.iter().position(|r| &r.key == key) {
                self.selected = pos;
            }
        }

        self.table = table;
        self.table_selected = 0;
        self.table_title = title;
        Ok(SelectionOutcome::Browsed)
    }

    fn fail_selection(&mut self, error: SelectionError) -> SelectionOutcome {
        tracing::warn!(%error, "selection failed");
        self.set_error_status(format!("Selection failed: {error}"));
        self.table = vec![TableRow::error(error.to_string())];
        self.table_selected = 0;
        self.table_title = "error".to_string();
        SelectionOutcome::Failed
    }

    /// Activate the row under the table cursor.
    pub fn select_table_row(&mut self) -> SelectionOutcome {
        match self.table.get(self.table_selected) {
            Some(TableRow {
                file_path: Some(path),
                ..
            }) => SelectionOutcome::Play(path.clone()),
            Some(_) => SelectionOutcome::Browsed,
            None => self.fail_selection(SelectionError::NothingSelected),
        }
    }
}
