use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use pension_agent_server::config::Settings;
use pension_agent_server::services::{
    prompts, AgentGraph, AgentState, EmbeddingService, LlmService, MemoryProvider, PineconeStore,
    RagService, ZonedClock,
};

const EXIT_COMMANDS: [&str; 3] = ["salir", "exit", "quit"];
const HISTORY_COMMAND: &str = "memoria";

#[derive(Parser, Debug)]
#[command(
    name = "pension-agent-cli",
    version,
    about = "Interactive console for the pension assistant"
)]
struct Args {
    /// Session to continue; a new one is generated when omitted
    #[arg(long)]
    session_id: Option<String>,

    /// Name the assistant introduces itself with
    #[arg(long, default_value = "Alexandra")]
    agent_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load()?;

    let rag_service = Arc::new(RagService::new(
        Arc::new(EmbeddingService::new(settings.embedding.clone())?),
        Arc::new(PineconeStore::new(settings.vector_store.clone())?),
        settings.rag.clone(),
    ));
    let llm = Arc::new(LlmService::new(settings.llm.clone())?);
    let clock = Arc::new(ZonedClock::new(&settings.agent.timezone)?);
    let provider = MemoryProvider::new(&settings.memory)?;

    let session_id = args
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let memory = provider.open(&session_id).await?;

    println!("Sesión: {} (memoria: {})", session_id, memory.backend());
    println!(
        "Escribe tu pregunta, '{}' para ver el historial o '{}' para terminar.",
        HISTORY_COMMAND, EXIT_COMMANDS[0]
    );

    let graph = AgentGraph::new(rag_service, llm, clock, memory.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nTú: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&input.to_lowercase().as_str()) {
            println!("¡Hasta luego!");
            break;
        }
        if input.eq_ignore_ascii_case(HISTORY_COMMAND) {
            match memory.history().await {
                Ok(history) => println!("{}", prompts::render_history(&history)),
                Err(e) => eprintln!("\nError: {}", e),
            }
            continue;
        }

        match graph.run(AgentState::new(input, args.agent_name.clone())).await {
            Ok(state) => println!("\n{}: {}", args.agent_name, state.reply().unwrap_or_default()),
            Err(e) => eprintln!("\nError: {}", e),
        }
    }

    Ok(())
}
