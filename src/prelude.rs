//! Convenience re-exports for common use.

pub use crate::client::{collect_reply, AssistantClient};
pub use crate::config::CasemateConfig;
pub use crate::error::{CasemateError, Result};
pub use crate::sse::StreamEvent;
pub use crate::types::{ChatMessage, ChatRequest, Conversation, Role};
