//! Core types for casemate.

pub mod conversation;
pub mod message;
pub mod request;

pub use conversation::*;
pub use message::*;
pub use request::*;
