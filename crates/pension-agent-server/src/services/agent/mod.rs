//! Conversational agent
//!
//! A fixed four-node pipeline per turn: evaluate the message, retrieve
//! passages for pension topics, respond with the matching template and
//! remember the exchange in session memory.

mod graph;
mod state;

pub use graph::AgentGraph;
pub use state::AgentState;
