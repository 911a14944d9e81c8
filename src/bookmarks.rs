use crate::api::LatLon;
use crate::import::ImportError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Track color used when the file does not specify one.
pub const DEFAULT_TRACK_COLOR: u32 = 0x006E_C7FF;
pub const DEFAULT_TRACK_WIDTH: f64 = 5.0;

const MAX_NAME_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredefinedColor {
    #[default]
    None,
    Red,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkColor {
    pub predefined: PredefinedColor,
    /// 0 when unset.
    pub rgba: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub custom_name: String,
    pub description: String,
    pub point: LatLon,
    pub altitude: Option<i32>,
    pub color: BookmarkColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat_lon: LatLon,
    pub altitude: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub description: String,
    pub color: u32,
    pub width: f64,
    pub lines: Vec<Vec<TrackPoint>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmarkCollection {
    pub name: String,
    pub description: String,
    pub bookmarks: Vec<Bookmark>,
    pub tracks: Vec<Track>,
}

impl BookmarkCollection {
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty() && self.tracks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
    pub bookmarks: usize,
    pub tracks: usize,
}

/// Directory of imported collections, one JSON file each.
///
/// Files are written to a temp file in the same directory and renamed into
/// place, so a reader sees either the whole collection or nothing.
#[derive(Debug, Clone)]
pub struct BookmarkStore {
    dir: PathBuf,
}

impl BookmarkStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `collection` and return its id. `hint` (usually the source file
    /// stem) names the file; the collection name is used when it is empty.
    pub fn save(&self, collection: &BookmarkCollection, hint: &str) -> Result<String, ImportError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(collection)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;

        let base = slugify(if hint.trim().is_empty() {
            &collection.name
        } else {
            hint
        });

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let id = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };
            match tmp.persist_noclobber(self.path_for(&id)) {
                Ok(_) => {
                    tracing::debug!(id = %id, dir = %self.dir.display(), "collection stored");
                    return Ok(id);
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.file,
                Err(e) => return Err(ImportError::Persist(e.error)),
            }
        }
        Err(ImportError::Persist(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("too many collections named \"{base}\""),
        )))
    }

    pub fn load(&self, id: &str) -> Result<BookmarkCollection, ImportError> {
        let content = std::fs::read(self.path_for(id))?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Summaries of every stored collection, sorted by id. Unreadable entries
    /// are skipped with a warning.
    pub fn list(&self) -> Result<Vec<CollectionSummary>, ImportError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(id) {
                Ok(c) => out.push(CollectionSummary {
                    id: id.to_string(),
                    name: c.name,
                    bookmarks: c.bookmarks.len(),
                    tracks: c.tracks.len(),
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable collection")
                }
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

/// File-name-safe id: lowercase alphanumerics separated by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.chars().count() >= 64 {
            break;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "collection".into()
    } else {
        slug
    }
}
