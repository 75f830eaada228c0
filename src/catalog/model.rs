use std::path::Path;

use serde::Deserialize;

/// Tag data attached to a file entry. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub album: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub track: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: Option<String>,
}

/// One element of the `/songs` listing.
///
/// The server sends either a file record (`file` + `metadata`) or a directory
/// placeholder (`type: "directory"` + `name`). Both shapes share this struct;
/// the library builder decides which one it is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub metadata: Option<TrackMetadata>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CatalogEntry {
    #[cfg(test)]
    pub fn track(file: impl Into<String>, metadata: TrackMetadata) -> Self {
        Self {
            file: Some(file.into()),
            metadata: Some(metadata),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            kind: Some("directory".to_string()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind.as_deref() == Some("directory")
    }
}

/// Last path component of `path`, or the whole string when it has none.
pub fn base_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
}

/// Tag values arrive as strings or numbers depending on the tagger; keep both
/// as text. An empty string counts as missing.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let text = match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    };
    Ok(text.filter(|s| !s.is_empty()))
}
