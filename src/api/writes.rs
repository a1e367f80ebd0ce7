//! Create / update / delete / toggle requests and their notices

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::notify::Notifier;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected the request: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    #[error("Failed to decode server response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    Create,
    Update,
    Toggle,
    Delete,
}

/// Write side of the remote API
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Send a write and return the envelope `data` (null when absent)
    async fn send(&self, method: WriteMethod, endpoint: &str, body: Option<Value>) -> Result<Value, WriteError>;
}

#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub method: WriteMethod,
    pub endpoint: String,
    pub body: Option<Value>,
}

impl WriteRequest {
    pub fn new(method: WriteMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Titles shown after a write
#[derive(Debug, Clone)]
pub struct WriteNotices {
    pub success: String,
    pub failure: String,
}

impl WriteNotices {
    pub fn new(success: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            success: success.into(),
            failure: failure.into(),
        }
    }
}

/// Send a write, raising exactly one notice either way. Nothing local changes
/// here: callers update their view only after `Ok`.
pub async fn perform_write(
    writer: &dyn RecordWriter,
    notifier: &dyn Notifier,
    request: WriteRequest,
    notices: &WriteNotices,
) -> Result<Value, WriteError> {
    match writer.send(request.method, &request.endpoint, request.body).await {
        Ok(data) => {
            info!("{:?} {} succeeded", request.method, request.endpoint);
            notifier.success(&notices.success);
            Ok(data)
        }
        Err(e) => {
            warn!("{:?} {} failed: {}", request.method, request.endpoint, e);
            let message = match &e {
                WriteError::Rejected { message: Some(m) } => format!("{}: {}", notices.failure, m),
                _ => notices.failure.clone(),
            };
            notifier.error(&message);
            Err(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StubWriter;
    use super::*;
    use crate::notify::{NoticeKind, NoticeLog};
    use serde_json::json;

    #[tokio::test]
    async fn test_successful_write_notices_once() {
        let writer = StubWriter::accepting(json!({"id": "42"}));
        let notices = NoticeLog::new();
        let request = WriteRequest::new(WriteMethod::Create, "facilities").with_body(json!({"name": "A"}));

        let data = perform_write(&writer, &notices, request, &WriteNotices::new("saved", "failed"))
            .await
            .unwrap();

        assert_eq!(data["id"], "42");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.last().unwrap().kind, NoticeKind::Success);
        assert_eq!(writer.sent()[0].1, "facilities");
    }

    #[tokio::test]
    async fn test_rejected_write_includes_server_message() {
        let writer = StubWriter::rejecting("code exists");
        let notices = NoticeLog::new();
        let request = WriteRequest::new(WriteMethod::Delete, "transactions/7");

        let result = perform_write(&writer, &notices, request, &WriteNotices::new("deleted", "delete failed")).await;

        assert!(result.is_err());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.last().unwrap().message, "delete failed: code exists");
    }
}
