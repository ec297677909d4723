//! Request body for the chat-completion endpoint.

use serde::Serialize;

use super::message::ChatMessage;

/// A request sent to the assistant service.
///
/// `document_context` carries the text of a document the user has open (a
/// draft contract, a filing) so the assistant can answer against it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "documentContext", skip_serializing_if = "Option::is_none")]
    pub document_context: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            document_context: None,
        }
    }

    pub fn with_document_context(mut self, context: impl Into<String>) -> Self {
        self.document_context = Some(context.into());
        self
    }
}
