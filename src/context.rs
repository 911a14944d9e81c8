use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiUrlParser, ParsedRequest};
use crate::bookmarks::BookmarkStore;
use crate::config::AppConfig;
use crate::host::MapHost;
use crate::import::{ImportQueue, ImportReporter, ImportScheduler, Importer, LogReporter};
use crate::intent::{BookmarkFileProcessor, ExternalRequest, ProcessorChain, UrlProcessor};

/// Everything needed to answer external requests: the processor chain and the
/// import queue behind it. Built once from config; the host is supplied per call.
pub struct AppContext {
    pub(crate) parser: ApiUrlParser,
    pub(crate) queue: Arc<ImportQueue>,
    chain: ProcessorChain,
    staging_dir: PathBuf,
}

impl AppContext {
    /// Context whose import reports go to the log.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, String> {
        Self::with_reporter(cfg, Arc::new(LogReporter))
    }

    pub fn with_reporter(cfg: &AppConfig, reporter: Arc<dyn ImportReporter>) -> Result<Self, String> {
        let store = BookmarkStore::new(cfg.bookmarks.path());
        let importer = Importer::new(store, cfg.import.max_file_size_bytes);
        let queue = Arc::new(ImportQueue::new(importer, reporter, cfg.import.workers)?);
        let staging_dir = cfg.import.staging_path();

        let parser = ApiUrlParser::new(&cfg.api.schemes);
        let scheduler: Arc<dyn ImportScheduler> = queue.clone();
        let chain = ProcessorChain::new()
            .with(BookmarkFileProcessor::new(scheduler, staging_dir.clone()))
            .with(UrlProcessor::new(parser.clone(), cfg.api.search_zoom));

        tracing::debug!(
            schemes = ?parser.schemes(),
            staging = %staging_dir.display(),
            store = %cfg.bookmarks.path().display(),
            "context ready"
        );
        Ok(Self {
            parser,
            queue,
            chain,
            staging_dir,
        })
    }

    /// Run `request` through the chain. Returns whether a processor consumed it.
    pub fn handle(&self, request: &ExternalRequest, host: &mut dyn MapHost) -> bool {
        self.chain.process(request, host)
    }

    pub fn parse(&self, uri: &str) -> ParsedRequest {
        self.parser.parse(uri)
    }

    pub fn queue(&self) -> &ImportQueue {
        &self.queue
    }

    pub fn store(&self) -> &BookmarkStore {
        self.queue.importer().store()
    }

    pub fn staging_dir(&self) -> &std::path::Path {
        &self.staging_dir
    }

    /// Wait for scheduled imports, then stop the workers.
    pub fn shutdown(&self, timeout: Duration) {
        if !self.queue.wait_idle(timeout) {
            tracing::warn!(?timeout, "imports still running at shutdown");
        }
        self.queue.shutdown(timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, RecordingHost};
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> AppContext {
        let mut cfg = AppConfig::default();
        cfg.bookmarks.dir = dir.path().join("bookmarks").to_string_lossy().to_string();
        cfg.import.staging_dir = dir.path().join("staging").to_string_lossy().to_string();
        AppContext::from_config(&cfg).unwrap()
    }

    #[test]
    fn deep_link_is_consumed() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let mut host = RecordingHost::new();
        assert!(ctx.handle(&ExternalRequest::view("om://map?ll=1,2"), &mut host));
        assert!(matches!(host.calls()[0], HostCall::ShowMapPoint { .. }));
    }

    #[test]
    fn shared_file_is_imported_but_not_consumed() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let path = dir.path().join("trip.gpx");
        std::fs::write(&path, r#"<gpx><wpt lat="1" lon="2"><name>A</name></wpt></gpx>"#).unwrap();

        let mut host = RecordingHost::new();
        let consumed = ctx.handle(
            &ExternalRequest::send(path.to_string_lossy().to_string()),
            &mut host,
        );
        assert!(!consumed);
        assert!(host.calls().is_empty());

        assert!(ctx.queue().wait_idle(Duration::from_secs(10)));
        let stored = ctx.store().list().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "trip");
    }

    #[test]
    fn configured_schemes_apply() {
        let dir = TempDir::new().unwrap();
        let mut cfg = AppConfig::default();
        cfg.api.schemes = vec!["geo-app".into()];
        cfg.bookmarks.dir = dir.path().to_string_lossy().to_string();
        let ctx = AppContext::from_config(&cfg).unwrap();
        assert_eq!(ctx.parse("om://map?ll=1,2"), ParsedRequest::Incorrect);
        assert!(ctx.parse("geo-app://map?ll=1,2").map_request().is_some());
    }
}
