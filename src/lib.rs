//! Casemate — streaming chat client for a legal-assistant service.
//!
//! Sends conversation history (plus optional document context) to a hosted
//! chat-completion endpoint and consumes the streamed Server-Sent-Events
//! reply incrementally, yielding text deltas as they arrive.
//!
//! # Quick Start
//!
//! ```no_run
//! use casemate::prelude::*;
//!
//! # async fn example() -> casemate::error::Result<()> {
//! let client = AssistantClient::new(CasemateConfig::from_env())?;
//!
//! let mut conversation = Conversation::with_system("You are a legal assistant.");
//! conversation.push_user("Summarize the indemnity clause.");
//!
//! let stream = client.stream_reply(&conversation.to_request()).await?;
//! let reply = collect_reply(stream).await?;
//! conversation.push_assistant(reply);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod sse;
pub mod types;
