//! Inbound request handling: an ordered chain of processors where the first
//! one to consume a request wins.

pub mod deep_link;
pub mod file;
mod request;

pub use deep_link::UrlProcessor;
pub use file::BookmarkFileProcessor;
pub use request::{is_started_for_api_result, ExternalRequest, IntentAction};

use crate::host::MapHost;

pub trait IntentProcessor: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Returns `true` when the request was consumed and no other processor
    /// should look at it.
    fn process(&self, request: &ExternalRequest, host: &mut dyn MapHost) -> bool;
}

#[derive(Default)]
pub struct ProcessorChain {
    processors: Vec<Box<dyn IntentProcessor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, processor: impl IntentProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn process(&self, request: &ExternalRequest, host: &mut dyn MapHost) -> bool {
        for processor in &self.processors {
            if processor.process(request, host) {
                tracing::debug!(processor = processor.name(), "request consumed");
                return true;
            }
        }
        tracing::debug!(action = ?request.action, "no processor consumed request");
        false
    }
}
