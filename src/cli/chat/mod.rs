//! Chat command - interactive question loop over one session

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info};

use super::index::open_index;
use super::Cli;
use crate::config::{CheckpointBackend, CheckpointConfig};
use crate::domain::crag::prompts::NOT_FOUND_ANSWER;
use crate::domain::workflow::{Checkpointer, SessionId};
use crate::infrastructure::checkpoint::{FileCheckpointer, InMemoryCheckpointer};
use crate::infrastructure::judgment::LlmJudge;
use crate::infrastructure::llm::LlmProviderFactory;
use crate::infrastructure::workflow::{CorrectiveRagWorkflow, WorkflowSettings};

const PROMPT: &str = "Pergunta: ";
const EXIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];
const SESSIONS_COMMAND: &str = "/sessoes";
const RESET_COMMAND: &str = "/limpar";

fn is_exit(line: &str) -> bool {
    EXIT_WORDS.iter().any(|word| line.eq_ignore_ascii_case(word))
}

pub fn build_checkpointer(config: &CheckpointConfig) -> Option<Arc<dyn Checkpointer>> {
    match config.backend {
        CheckpointBackend::None => None,
        CheckpointBackend::Memory => Some(Arc::new(InMemoryCheckpointer::new())),
        CheckpointBackend::File => Some(Arc::new(FileCheckpointer::new(config.directory.clone()))),
    }
}

fn resolve_session(requested: Option<&str>) -> anyhow::Result<SessionId> {
    match requested {
        Some(id) => SessionId::new(id).map_err(|e| anyhow::anyhow!("Invalid --session: {}", e)),
        None => Ok(SessionId::generate()),
    }
}

/// Run the chat command
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let (config, _guard) = super::bootstrap(cli)?;
    config.require_api_key()?;

    let session = resolve_session(cli.session.as_deref())?;
    let index = open_index(&config, false).await?;

    let provider = LlmProviderFactory::create(&config.llm)?;
    let judge = Arc::new(
        LlmJudge::new(provider, &config.llm.model).with_temperature(config.llm.temperature),
    );

    let mut workflow =
        CorrectiveRagWorkflow::new(judge, index, WorkflowSettings::from_config(&config))?;
    if let Some(checkpointer) = build_checkpointer(&config.checkpoint) {
        workflow = workflow.with_checkpointer(checkpointer);
    }

    info!(session = %session, backend = ?config.checkpoint.backend, "Chat session started");
    println!("Machado Oráculo: pergunte sobre Dom Casmurro ('sair' para encerrar).");
    println!("Sessão: {} ('/sessoes' lista, '/limpar' apaga a conversa)", session);

    repl(
        &workflow,
        &session,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Read questions until EOF or an exit word; a failed turn is logged and skipped.
/// `/sessoes` lists the saved sessions and `/limpar` forgets the current one.
pub async fn repl<R, W>(
    workflow: &CorrectiveRagWorkflow,
    session: &SessionId,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0usize;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }
        if question.eq_ignore_ascii_case(SESSIONS_COMMAND) {
            match workflow.sessions().await {
                Ok(sessions) => {
                    let mut listing = String::from("\n");
                    for id in &sessions {
                        let marker = if id == session { "*" } else { " " };
                        listing.push_str(&format!("{} {}\n", marker, id));
                    }
                    listing.push('\n');
                    output.write_all(listing.as_bytes()).await?;
                }
                Err(e) => error!(error = %e, "Cannot list sessions"),
            }
            continue;
        }
        if question.eq_ignore_ascii_case(RESET_COMMAND) {
            match workflow.reset(session).await {
                Ok(removed) => {
                    info!(session = %session, removed, "Session reset");
                    output.write_all(b"\nConversa apagada.\n\n").await?;
                }
                Err(e) => error!(error = %e, session = %session, "Cannot reset session"),
            }
            continue;
        }

        match workflow.invoke(session, question).await {
            Ok(result) => {
                let text = result.generation().unwrap_or(NOT_FOUND_ANSWER);
                output.write_all(format!("\n{}\n\n", text).as_bytes()).await?;
                answered += 1;
            }
            Err(e) => error!(error = %e, session = %session, "Turn failed"),
        }
    }

    output.flush().await?;
    info!(session = %session, answered, "Chat session ended");
    Ok(())
}
