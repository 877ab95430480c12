use std::sync::Arc;
use tracing::{debug, info};

use super::state::AgentState;
use crate::models::ChatMessage;
use crate::services::clock::Clock;
use crate::services::memory::SessionMemory;
use crate::services::prompts::{self, PromptVars};
use crate::services::providers::LlmProvider;
use crate::services::query_analyzer::{NextStep, QueryAnalyzer};
use crate::services::rag_service::RagService;
use crate::utils::error::ApiError;

/// One conversation turn: evaluate -> (retrieve) -> respond -> remember.
/// Built per request, runs once, no cycles.
pub struct AgentGraph {
    rag_service: Arc<RagService>,
    llm: Arc<dyn LlmProvider>,
    clock: Arc<dyn Clock>,
    memory: SessionMemory,
}

impl AgentGraph {
    pub fn new(
        rag_service: Arc<RagService>,
        llm: Arc<dyn LlmProvider>,
        clock: Arc<dyn Clock>,
        memory: SessionMemory,
    ) -> Self {
        Self {
            rag_service,
            llm,
            clock,
            memory,
        }
    }

    pub async fn run(&self, mut state: AgentState) -> Result<AgentState, ApiError> {
        info!(
            "Running agent graph for session {} (memory: {})",
            self.memory.session_id(),
            self.memory.backend()
        );

        self.evaluate(&mut state);

        if state.next_step == Some(NextStep::Retrieve) {
            self.retrieve(&mut state).await?;
        }

        self.load_history(&mut state).await?;
        self.respond(&mut state).await?;
        self.remember(&mut state).await?;

        Ok(state)
    }

    fn evaluate(&self, state: &mut AgentState) {
        let step = QueryAnalyzer::classify(state.last_content());
        debug!("Evaluate: next step {:?}", step);
        state.next_step = Some(step);
    }

    async fn retrieve(&self, state: &mut AgentState) -> Result<(), ApiError> {
        let retrieved = self.rag_service.retrieve(state.last_content()).await?;
        info!("Retrieve: found {} relevant passages", retrieved.passages.len());

        state.context = Some(retrieved.context);
        state.sources = Some(retrieved.sources);
        Ok(())
    }

    async fn load_history(&self, state: &mut AgentState) -> Result<(), ApiError> {
        let history = self.memory.history().await?;
        debug!("Loaded {} history messages", history.len());
        state.chat_history = Some(prompts::render_history(&history));
        Ok(())
    }

    async fn respond(&self, state: &mut AgentState) -> Result<(), ApiError> {
        let time_info = self.clock.now();
        let question = state.last_content().to_string();
        let chat_history = state
            .chat_history
            .clone()
            .unwrap_or_else(|| prompts::EMPTY_HISTORY.to_string());

        let vars = PromptVars {
            agent_name: &state.agent_name,
            time: &time_info,
            chat_history: &chat_history,
            question: &question,
        };

        let reply = if state.has_grounding() {
            let context = state.context.as_deref().unwrap_or_default();
            let sources = state.sources.as_deref().unwrap_or_default();
            debug!("Respond: using context template");

            let prompt = prompts::render_context_prompt(&vars, context, sources);
            let reply = self.generate(prompt).await?;
            prompts::ensure_sources(&reply, sources)
        } else {
            debug!("Respond: using simple template");
            let prompt = prompts::render_simple_prompt(&vars);
            self.generate(prompt).await?
        };

        info!("Respond: reply generated ({} chars)", reply.len());
        state.time_info = Some(time_info);
        state.messages.push(ChatMessage::assistant(reply));
        Ok(())
    }

    async fn generate(&self, prompt: String) -> Result<String, ApiError> {
        self.llm
            .generate(&[ChatMessage::user(prompt)])
            .await
            .map_err(|e| ApiError::LlmError(format!("{:#}", e)))
    }

    async fn remember(&self, state: &mut AgentState) -> Result<(), ApiError> {
        let [.., input, output] = state.messages.as_slice() else {
            return Ok(());
        };

        self.memory
            .save_exchange(&input.content, &output.content)
            .await?;

        let history = self.memory.history().await?;
        state.chat_history = Some(prompts::render_history(&history));
        info!("Remember: history now holds {} messages", history.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::models::Passage;
    use crate::services::clock::FixedClock;
    use crate::services::memory::{HistoryStore, LocalHistoryStore, MemoryBackend};
    use crate::services::providers::{MockEmbeddingProvider, MockLlmProvider, MockVectorStore};
    use std::time::Duration;

    fn local_memory(session: &str) -> (SessionMemory, LocalHistoryStore) {
        let store = LocalHistoryStore::new(Duration::from_secs(3600));
        (SessionMemory::new(session, Arc::new(store.clone())), store)
    }

    fn unused_rag() -> Arc<RagService> {
        Arc::new(RagService::new(
            Arc::new(MockEmbeddingProvider::new()),
            Arc::new(MockVectorStore::new()),
            RagConfig { retrieval_top_k: 4 },
        ))
    }

    fn rag_with(passages: Vec<Passage>) -> Arc<RagService> {
        let mut embedding = MockEmbeddingProvider::new();
        embedding.expect_embed().times(1).returning(|_| Ok(vec![0.1, 0.2]));

        let mut store = MockVectorStore::new();
        store
            .expect_query()
            .times(1)
            .returning(move |_, _| Ok(passages.clone()));

        Arc::new(RagService::new(
            Arc::new(embedding),
            Arc::new(store),
            RagConfig { retrieval_top_k: 4 },
        ))
    }

    fn passage() -> Passage {
        Passage {
            id: "p1".into(),
            score: 0.9,
            title: Some("Pensión Garantizada Universal".into()),
            published: Some("2025-02-01".into()),
            source_domain: Some("chileatiende.gob.cl".into()),
            url: Some("https://www.chileatiende.gob.cl/pgu".into()),
            content: "La PGU es un beneficio del Estado.".into(),
        }
    }

    #[tokio::test]
    async fn test_small_talk_skips_retrieval() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .withf(|messages| {
                messages.len() == 1
                    && messages[0].content.contains("Tu genero esta determinado por tu nombre Alexandra.")
                    && messages[0].content.contains("No hay historial previo.")
            })
            .times(1)
            .returning(|_| Ok("¡Hola! ¿En qué te puedo ayudar?".into()));

        let (memory, store) = local_memory("s1");
        let graph = AgentGraph::new(
            unused_rag(),
            Arc::new(llm),
            Arc::new(FixedClock::santiago()),
            memory,
        );

        let state = graph.run(AgentState::new("hola", "Alexandra")).await.unwrap();

        assert_eq!(state.next_step, Some(NextStep::Respond));
        assert!(state.context.is_none());
        assert_eq!(state.reply(), Some("¡Hola! ¿En qué te puedo ayudar?"));
        assert_eq!(store.messages("s1").await.unwrap().len(), 2);
        assert_eq!(
            state.chat_history.as_deref(),
            Some("Usuario: hola\nAsistente: ¡Hola! ¿En qué te puedo ayudar?")
        );
    }

    #[tokio::test]
    async fn test_pension_question_uses_context_and_appends_sources() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .withf(|messages| {
                let prompt = &messages[0].content;
                prompt.starts_with("Eres Alexandra,")
                    && prompt.contains("[link_1]\nTítulo: Pensión Garantizada Universal")
                    && prompt.contains("- Fecha: 2026-10-16")
            })
            .times(1)
            .returning(|_| Ok("La **PGU** es un beneficio.".into()));

        let (memory, _store) = local_memory("s1");
        let graph = AgentGraph::new(
            rag_with(vec![passage()]),
            Arc::new(llm),
            Arc::new(FixedClock::santiago()),
            memory,
        );

        let state = graph
            .run(AgentState::new("¿Qué es la pensión garantizada?", "Alexandra"))
            .await
            .unwrap();

        assert_eq!(state.next_step, Some(NextStep::Retrieve));
        assert_eq!(
            state.reply(),
            Some(
                "La **PGU** es un beneficio.\n\nFuentes:\n\
                 <a href=\"https://www.chileatiende.gob.cl/pgu\" target=\"_blank\">link_1</a>"
            )
        );
        assert_eq!(state.time_info.unwrap().timezone, "America/Santiago");
    }

    #[tokio::test]
    async fn test_existing_sources_block_is_kept() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .returning(|_| Ok("Respuesta.\n\nFuentes:\nlink_1".into()));

        let (memory, _store) = local_memory("s1");
        let graph = AgentGraph::new(
            rag_with(vec![passage()]),
            Arc::new(llm),
            Arc::new(FixedClock::santiago()),
            memory,
        );

        let state = graph.run(AgentState::new("mi afp", "Alexandra")).await.unwrap();
        assert_eq!(state.reply(), Some("Respuesta.\n\nFuentes:\nlink_1"));
    }

    #[tokio::test]
    async fn test_no_passages_falls_back_to_simple_template() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .withf(|messages| messages[0].content.starts_with("Eres un asistente experto"))
            .times(1)
            .returning(|_| Ok("No tengo información sobre eso.".into()));

        let (memory, _store) = local_memory("s1");
        let graph = AgentGraph::new(
            rag_with(Vec::new()),
            Arc::new(llm),
            Arc::new(FixedClock::santiago()),
            memory,
        );

        let state = graph.run(AgentState::new("bono invierno", "Alexandra")).await.unwrap();
        assert_eq!(state.next_step, Some(NextStep::Retrieve));
        assert_eq!(state.reply(), Some("No tengo información sobre eso."));
    }

    #[tokio::test]
    async fn test_history_feeds_the_next_turn() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .withf(|messages| messages[0].content.contains("Usuario: hola\nAsistente: ¡Hola!"))
            .times(1)
            .returning(|_| Ok("Me llamo Alexandra.".into()));

        let (memory, store) = local_memory("s1");
        store.append("s1", "hola", "¡Hola!").await.unwrap();

        let graph = AgentGraph::new(
            unused_rag(),
            Arc::new(llm),
            Arc::new(FixedClock::santiago()),
            memory,
        );
        graph.run(AgentState::new("¿cómo te llamas?", "Alexandra")).await.unwrap();

        let history = store.messages("s1").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], ChatMessage::user("¿cómo te llamas?"));
        assert_eq!(history[3], ChatMessage::assistant("Me llamo Alexandra."));
    }

    #[tokio::test]
    async fn test_llm_failure_writes_nothing() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .returning(|_| Err(anyhow::anyhow!("503 upstream")));

        let (memory, store) = local_memory("s1");
        assert_eq!(memory.backend(), MemoryBackend::Local);

        let graph = AgentGraph::new(
            unused_rag(),
            Arc::new(llm),
            Arc::new(FixedClock::santiago()),
            memory,
        );

        let result = graph.run(AgentState::new("hola", "Alexandra")).await;
        assert!(matches!(result, Err(ApiError::LlmError(_))));
        assert!(store.messages("s1").await.unwrap().is_empty());
    }
}
