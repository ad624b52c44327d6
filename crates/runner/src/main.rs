//! Collections Flow Runner
//!
//! Reads customer messages from stdin, one per line, and prints the agent's
//! replies. `/nueva` starts a new conversation, `/resumen` prints the monitor
//! summary. The summary is also printed at end of input.

use tokio::io::{AsyncBufReadExt, BufReader};

use collections_flow_agent::Conversation;
use collections_flow_config::{load_settings, Settings};
use collections_flow_runner::{extract_document, init_tracing, route_message, AppState, DOCUMENT_KEY};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("COLLECTIONS_FLOW_ENV").ok();
    let config = load_settings(env.as_deref()).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    init_tracing(&config);

    tracing::info!(
        "Starting Collections Flow Runner v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::from_settings(config)?;
    let mut conversation = state.start_conversation();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        match message {
            "/nueva" => {
                conversation = state.start_conversation();
                println!("-- nueva conversación {}", conversation.id());
                continue;
            }
            "/resumen" => {
                print_summary(&state)?;
                continue;
            }
            _ => {}
        }

        handle_line(&state, &mut conversation, message).await;
    }

    print_summary(&state)?;
    Ok(())
}

async fn handle_line(state: &AppState, conversation: &mut Conversation, message: &str) {
    if let Some(document) = extract_document(message) {
        conversation.context_mut().insert(DOCUMENT_KEY, document);
    }

    let decision = route_message(message);
    match state
        .dispatcher
        .dispatch(conversation, message, &decision)
        .await
    {
        Ok(outcome) => {
            let reply = outcome
                .action
                .as_ref()
                .and_then(|a| a.delta.get("respuesta"))
                .and_then(|v| v.as_str());
            match reply {
                Some(text) => println!("[{}] {}", outcome.to, text),
                None => println!("[{}]", outcome.to),
            }
        }
        Err(e) if e.is_no_match() => {
            println!("[{}] (sin transición para este mensaje)", conversation.current_state());
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to handle message");
            println!("[{}] error: {}", conversation.current_state(), e);
        }
    }
}

fn print_summary(state: &AppState) -> Result<(), serde_json::Error> {
    let summary = state.monitor.get_summary();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
