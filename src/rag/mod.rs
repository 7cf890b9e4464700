//! Question answering over the course index.
//!
//! A [`QueryOrchestrator`] runs one query against a [`Generator`], offering it
//! the tools from [`crate::tools`]. A [`SessionStore`] keeps the short history
//! that is folded into the next query's prompt.

mod generator;
mod orchestrator;
mod session;

pub use generator::{
    ChatTurn, Generation, GenerationRequest, Generator, OpenAIGenerator, ToolInvocation,
};
pub use orchestrator::{QueryAnswer, QueryOrchestrator};
pub use session::{Role, SessionStore};
