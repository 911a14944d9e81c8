use super::{ExternalRequest, IntentProcessor};
use crate::host::MapHost;
use crate::import::{ImportJob, ImportScheduler};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Hands shared bookmark files (KML/KMZ/GPX) to the import queue.
///
/// Never consumes the request: the import runs in the background and the rest
/// of the chain still gets a look at the same input.
pub struct BookmarkFileProcessor {
    scheduler: Arc<dyn ImportScheduler>,
    staging_dir: PathBuf,
}

impl BookmarkFileProcessor {
    pub fn new(scheduler: Arc<dyn ImportScheduler>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            scheduler,
            staging_dir: staging_dir.into(),
        }
    }
}

const BOOKMARK_EXTENSIONS: &[&str] = &["kml", "kmz", "gpx", "kmb"];

const BOOKMARK_MIME_TYPES: &[&str] = &[
    "application/vnd.google-earth.kml+xml",
    "application/vnd.google-earth.kmz",
    "application/gpx+xml",
    "application/gpx",
];

/// File references are `file://` and `content://` URIs, absolute paths, and
/// relative paths that name a bookmark file by extension or by `mime_type`.
pub fn is_file_reference(resource: &str, mime_type: Option<&str>) -> bool {
    let resource = resource.trim();
    match url::Url::parse(resource) {
        Ok(url) => matches!(url.scheme(), "file" | "content"),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = Path::new(resource);
            path.is_absolute()
                || has_bookmark_extension(path)
                || mime_type.is_some_and(is_bookmark_mime_type)
        }
        Err(_) => false,
    }
}

fn has_bookmark_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BOOKMARK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Mime types of shared bookmark files. Parameters such as `charset` are ignored.
pub fn is_bookmark_mime_type(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    BOOKMARK_MIME_TYPES
        .iter()
        .any(|known| essence.eq_ignore_ascii_case(known))
}

impl IntentProcessor for BookmarkFileProcessor {
    fn name(&self) -> &'static str {
        "bookmark-file"
    }

    fn process(&self, request: &ExternalRequest, _host: &mut dyn MapHost) -> bool {
        let Some(resource) = request.shared_resource() else {
            return false;
        };
        if !is_file_reference(resource, request.mime_type.as_deref()) {
            tracing::debug!(resource, "not a bookmark file reference");
            return false;
        }
        tracing::info!(resource, staging = %self.staging_dir.display(), "scheduling bookmark import");
        self.scheduler.schedule(ImportJob {
            resource: resource.to_string(),
            staging_dir: self.staging_dir.clone(),
        });
        false
    }
}
