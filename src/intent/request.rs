use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    /// Open a URI: deep link or file.
    View,
    /// A resource shared from another application.
    Send,
    Other(String),
}

/// One inbound request from outside the application. Dispatched once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRequest {
    pub action: IntentAction,
    /// URI of a view-style request.
    pub data: Option<String>,
    /// Shared resource of a send-style request.
    pub stream: Option<String>,
    pub mime_type: Option<String>,
    /// The caller waits for a result to be forwarded back.
    pub forward_result: bool,
}

impl ExternalRequest {
    pub fn view(uri: impl Into<String>) -> Self {
        Self {
            action: IntentAction::View,
            data: Some(uri.into()),
            stream: None,
            mime_type: None,
            forward_result: false,
        }
    }

    pub fn send(stream: impl Into<String>) -> Self {
        Self {
            action: IntentAction::Send,
            data: None,
            stream: Some(stream.into()),
            mime_type: None,
            forward_result: false,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_forward_result(mut self, forward: bool) -> Self {
        self.forward_result = forward;
        self
    }

    /// The resource a file-sharing request refers to, by action.
    pub fn shared_resource(&self) -> Option<&str> {
        let resource = match self.action {
            IntentAction::View => self.data.as_deref(),
            IntentAction::Send => self.stream.as_deref(),
            IntentAction::Other(_) => None,
        };
        resource.filter(|s| !s.trim().is_empty())
    }
}

pub fn is_started_for_api_result(request: &ExternalRequest) -> bool {
    request.forward_result
}
