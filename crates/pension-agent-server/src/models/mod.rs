pub mod chat;
pub mod passage;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, SessionId};
pub use passage::Passage;
