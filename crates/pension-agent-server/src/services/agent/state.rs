use crate::models::ChatMessage;
use crate::services::clock::TimeInfo;
use crate::services::query_analyzer::NextStep;

/// State threaded through the agent graph for one turn
#[derive(Debug, Clone)]
pub struct AgentState {
    pub messages: Vec<ChatMessage>,
    pub context: Option<String>,
    pub chat_history: Option<String>,
    pub next_step: Option<NextStep>,
    pub time_info: Option<TimeInfo>,
    pub sources: Option<String>,
    pub agent_name: String,
}

impl AgentState {
    pub fn new(user_message: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(user_message)],
            context: None,
            chat_history: None,
            next_step: None,
            time_info: None,
            sources: None,
            agent_name: agent_name.into(),
        }
    }

    /// Content of the most recent message
    pub fn last_content(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// Latest assistant reply, if the responder ran
    pub fn reply(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| !m.is_user())
            .map(|m| m.content.as_str())
    }

    /// Context and sources are both present and non-empty
    pub fn has_grounding(&self) -> bool {
        let non_empty = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        non_empty(&self.context) && non_empty(&self.sources)
    }
}
