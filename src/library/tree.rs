use std::collections::BTreeMap;

use crate::catalog::{CatalogEntry, TrackMetadata, base_name};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// A playable leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackNode {
    /// Display title; also the key among its album siblings.
    pub name: String,
    pub file_path: String,
    pub track: Option<String>,
    pub duration: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumNode {
    pub name: String,
    /// Name of the owning artist. Resolve it through `LibraryTree::parent_of`.
    pub artist: String,
    pub tracks: BTreeMap<String, TrackNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistNode {
    pub name: String,
    pub albums: BTreeMap<String, AlbumNode>,
}

impl ArtistNode {
    /// Every track of this artist, album by album.
    pub fn tracks(&self) -> impl Iterator<Item = (&AlbumNode, &TrackNode)> {
        self.albums
            .values()
            .flat_map(|album| album.tracks.values().map(move |t| (album, t)))
    }
}

/// Directory placeholder from the listing. Never descended into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub name: String,
    pub children: BTreeMap<String, DirectoryNode>,
}

/// Owned address of a node, stable across rebuilds as long as the labels are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Artist(String),
    Album {
        artist: String,
        album: String,
    },
    Track {
        artist: String,
        album: String,
        title: String,
    },
    Directory(String),
}

impl NodeKey {
    /// The label shown for this node in the tree.
    pub fn label(&self) -> &str {
        match self {
            NodeKey::Artist(name) | NodeKey::Directory(name) => name,
            NodeKey::Album { album, .. } => album,
            NodeKey::Track { title, .. } => title,
        }
    }

    /// Nesting level below the root.
    pub fn depth(&self) -> usize {
        match self {
            NodeKey::Artist(_) | NodeKey::Directory(_) => 0,
            NodeKey::Album { .. } => 1,
            NodeKey::Track { .. } => 2,
        }
    }
}

/// Borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryNode<'a> {
    Artist(&'a ArtistNode),
    Album(&'a AlbumNode),
    Track(&'a TrackNode),
    Directory(&'a DirectoryNode),
}

/// Artist, album and title after default substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabels {
    pub artist: String,
    pub album: String,
    pub title: String,
}

/// Apply the missing-field defaults. A missing or empty title becomes the
/// file's base name. Present values are kept verbatim, padding included.
pub fn resolve_labels(file_path: &str, metadata: &TrackMetadata) -> ResolvedLabels {
    fn present(v: &Option<String>) -> Option<&str> {
        v.as_deref().filter(|s| !s.is_empty())
    }

    ResolvedLabels {
        artist: present(&metadata.artist).unwrap_or(UNKNOWN_ARTIST).to_string(),
        album: present(&metadata.album).unwrap_or(UNKNOWN_ALBUM).to_string(),
        title: present(&metadata.title)
            .unwrap_or_else(|| base_name(file_path))
            .to_string(),
    }
}

/// The whole library. Rebuilt from scratch on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryTree {
    artists: BTreeMap<String, ArtistNode>,
    directories: BTreeMap<String, DirectoryNode>,
}

impl LibraryTree {
    /// Group a flat listing into the artist/album/track hierarchy.
    ///
    /// Entries with a file and metadata become tracks, bare directory entries
    /// become top-level directory nodes, anything else is skipped. Later
    /// tracks overwrite earlier ones with the same artist, album and title.
    pub fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a CatalogEntry>,
    {
        let mut tree = Self::default();
        let mut skipped = 0usize;

        for entry in entries {
            let file = entry.file.as_deref().filter(|f| !f.is_empty());

            match (file, entry.metadata.as_ref()) {
                (Some(file), Some(metadata)) => tree.insert_track(file, metadata),
                (None, _) if entry.is_directory() => match entry.name.as_deref() {
                    Some(name) if !name.is_empty() => tree.insert_directory(name),
                    _ => skipped += 1,
                },
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "ignored catalog entries with no usable shape");
        }
        tree
    }

    fn insert_track(&mut self, file: &str, metadata: &TrackMetadata) {
        let labels = resolve_labels(file, metadata);

        let artist = self
            .artists
            .entry(labels.artist.clone())
            .or_insert_with(|| ArtistNode {
                name: labels.artist.clone(),
                albums: BTreeMap::new(),
            });

        let album = artist
            .albums
            .entry(labels.album.clone())
            .or_insert_with(|| AlbumNode {
                name: labels.album.clone(),
                artist: labels.artist.clone(),
                tracks: BTreeMap::new(),
            });

        album.tracks.insert(
            labels.title.clone(),
            TrackNode {
                name: labels.title,
                file_path: file.to_string(),
                track: metadata.track.clone(),
                duration: metadata.duration.clone(),
                year: metadata.year.clone(),
            },
        );
    }

    fn insert_directory(&mut self, name: &str) {
        let name = base_name(name).to_string();
        self.directories.insert(
            name.clone(),
            DirectoryNode {
                name,
                children: BTreeMap::new(),
            },
        );
    }

    pub fn artists(&self) -> impl Iterator<Item = &ArtistNode> {
        self.artists.values()
    }

    pub fn directories(&self) -> impl Iterator<Item = &DirectoryNode> {
        self.directories.values()
    }

    pub fn artist(&self, name: &str) -> Option<&ArtistNode> {
        self.artists.get(name)
    }

    pub fn album(&self, artist: &str, album: &str) -> Option<&AlbumNode> {
        self.artist(artist)?.albums.get(album)
    }

    pub fn track(&self, artist: &str, album: &str, title: &str) -> Option<&TrackNode> {
        self.album(artist, album)?.tracks.get(title)
    }

    pub fn directory(&self, name: &str) -> Option<&DirectoryNode> {
        self.directories.get(name)
    }

    /// Artist owning `album`, looked up by the album's parent key.
    pub fn parent_of(&self, album: &AlbumNode) -> Option<&ArtistNode> {
        self.artist(&album.artist)
    }

    pub fn resolve(&self, key: &NodeKey) -> Option<LibraryNode<'_>> {
        match key {
            NodeKey::Artist(name) => self.artist(name).map(LibraryNode::Artist),
            NodeKey::Album { artist, album } => self.album(artist, album).map(LibraryNode::Album),
            NodeKey::Track {
                artist,
                album,
                title,
            } => self.track(artist, album, title).map(LibraryNode::Track),
            NodeKey::Directory(name) => self.directory(name).map(LibraryNode::Directory),
        }
    }

    pub fn track_count(&self) -> usize {
        self.artists
            .values()
            .flat_map(|a| a.albums.values())
            .map(|al| al.tracks.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.directories.is_empty()
    }
}
