//! Background import of shared bookmark files.
//!
//! A job resolves the shared resource, copies it into a staging file, decodes
//! it (GPX, KML or KMZ) and stores the result in the [`BookmarkStore`]. Every
//! job ends with exactly one [`ImportReport`].

mod error;
mod format;
mod gpx;
mod kml;
mod queue;
mod source;

pub use error::ImportError;
pub use format::{detect_format, FileFormat};
pub use gpx::parse_gpx;
pub use kml::{parse_kml, parse_kmz};
pub use queue::{ImportProgress, ImportQueue, ImportState};
pub use source::{display_name, local_path, ContentResolver, FsContentResolver};

use crate::bookmarks::{BookmarkCollection, BookmarkStore};
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One shared resource waiting to be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    pub resource: String,
    pub staging_dir: PathBuf,
}

/// Accepts import jobs without blocking the caller.
pub trait ImportScheduler: Send + Sync {
    fn schedule(&self, job: ImportJob);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported {
        collection_id: String,
        bookmarks: usize,
        tracks: usize,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub resource: String,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ImportOutcome::Imported { .. })
    }
}

/// Receives the final report of every job.
pub trait ImportReporter: Send + Sync {
    fn report(&self, report: ImportReport);
}

/// Logs reports through tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ImportReporter for LogReporter {
    fn report(&self, report: ImportReport) {
        match &report.outcome {
            ImportOutcome::Imported {
                collection_id,
                bookmarks,
                tracks,
            } => tracing::info!(
                resource = %report.resource,
                collection = %collection_id,
                bookmarks,
                tracks,
                "bookmark import finished"
            ),
            ImportOutcome::Failed { error } => {
                tracing::warn!(resource = %report.resource, error = %error, "bookmark import failed")
            }
        }
    }
}

/// Forwards reports over a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ImportReport>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ImportReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ImportReporter for ChannelReporter {
    fn report(&self, report: ImportReport) {
        if self.tx.send(report).is_err() {
            tracing::debug!("import report receiver dropped");
        }
    }
}

/// Runs the import pipeline for one job at a time. Shared across workers.
pub struct Importer {
    resolver: Arc<dyn ContentResolver>,
    store: BookmarkStore,
    max_file_size: u64,
}

impl Importer {
    pub fn new(store: BookmarkStore, max_file_size: u64) -> Self {
        Self {
            resolver: Arc::new(FsContentResolver),
            store,
            max_file_size,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn store(&self) -> &BookmarkStore {
        &self.store
    }

    /// Run `job` and turn the result into a report.
    pub fn run(&self, job: &ImportJob) -> ImportReport {
        let outcome = match self.import(job) {
            Ok((collection_id, collection)) => ImportOutcome::Imported {
                collection_id,
                bookmarks: collection.bookmarks.len(),
                tracks: collection.tracks.len(),
            },
            Err(e) => ImportOutcome::Failed {
                error: e.to_string(),
            },
        };
        ImportReport {
            resource: job.resource.clone(),
            outcome,
        }
    }

    /// Resolve, stage, decode and store. Returns the new collection id.
    pub fn import(&self, job: &ImportJob) -> Result<(String, BookmarkCollection), ImportError> {
        let resource = job.resource.as_str();
        if let Some(size) = self.resolver.size_hint(resource) {
            self.check_size(size)?;
        }

        std::fs::create_dir_all(&job.staging_dir)?;
        let mut staged = tempfile::NamedTempFile::new_in(&job.staging_dir)?;
        let reader = self.resolver.open(resource)?;
        // Read one byte past the limit so oversized streams without a size hint are caught.
        let mut limited = reader.take(self.max_file_size.saturating_add(1));
        let copied = std::io::copy(&mut limited, &mut staged)?;
        self.check_size(copied)?;
        staged.flush()?;
        tracing::debug!(resource, bytes = copied, staged = %staged.path().display(), "resource staged");

        let mut content = Vec::with_capacity(copied as usize);
        let file = staged.as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut content)?;

        let name = display_name(resource);
        let mut collection = decode(&name, &content, self.max_file_size)?;
        if collection.is_empty() {
            return Err(ImportError::Empty(name));
        }

        let hint = name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&name)
            .to_string();
        if collection.name.is_empty() {
            collection.name = hint.clone();
        }
        let id = self.store.save(&collection, &hint)?;
        Ok((id, collection))
    }

    fn check_size(&self, size: u64) -> Result<(), ImportError> {
        if size > self.max_file_size {
            return Err(ImportError::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }
}

/// Decode `content` according to the format detected from `name` and the bytes.
/// `max_size` bounds the inflated size of archive entries.
pub fn decode(
    name: &str,
    content: &[u8],
    max_size: u64,
) -> Result<BookmarkCollection, ImportError> {
    match detect_format(name, content) {
        FileFormat::Gpx => parse_gpx(content),
        FileFormat::Kml => parse_kml(content),
        FileFormat::Kmz => parse_kmz(content, max_size),
        FileFormat::Kmb => Err(ImportError::UnsupportedFormat(format!(
            "{name}: binary bookmark files are not supported"
        ))),
        FileFormat::Unknown => Err(ImportError::UnsupportedFormat(name.to_string())),
    }
}
