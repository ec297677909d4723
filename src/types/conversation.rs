//! Conversation state owned by the caller.

use super::message::ChatMessage;
use super::request::ChatRequest;

/// An ordered message history plus optional document context.
///
/// The caller appends the user's message, streams the reply while rendering
/// the growing text, then appends the finalized assistant message:
///
/// ```no_run
/// use casemate::types::Conversation;
///
/// let mut conversation = Conversation::with_system("You are a legal assistant.");
/// conversation.push_user("Summarize the indemnity clause.");
/// let request = conversation.to_request();
/// // ... stream the reply, accumulate `text` ...
/// # let text = String::new();
/// conversation.push_assistant(text);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    document_context: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system prompt.
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(prompt)],
            document_context: None,
        }
    }

    /// Attach (or replace) the document the assistant should answer against.
    pub fn set_document_context(&mut self, context: impl Into<String>) {
        self.document_context = Some(context.into());
    }

    pub fn clear_document_context(&mut self) {
        self.document_context = None;
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Build the request body for the next completion.
    pub fn to_request(&self) -> ChatRequest {
        ChatRequest {
            messages: self.messages.clone(),
            document_context: self.document_context.clone(),
        }
    }
}
