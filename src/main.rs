//! tool-agent - interactive command-line front end.
//!
//! Reads lines from stdin and runs each one through the agent.
//! `quit`/`exit` leave, `reset` clears the conversation, `history` prints it.

use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tool_agent::agent::{summarize, Agent, AgentEvent, RunOutcome};
use tool_agent::config::Config;
use tool_agent::tools::ToolRegistry;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging on stderr so it stays out of the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration; a key on the command line wins over the environment
    let config = match std::env::args().nth(1) {
        Some(key) => Config::from_env_with_key(key),
        None => Config::from_env(),
    }
    .context("set ANTHROPIC_API_KEY or pass the API key as the first argument")?;
    info!("Loaded configuration: model={}", config.model);

    let mut agent = Agent::new(config)
        .with_tools(ToolRegistry::with_builtin_tools())
        .with_event_handler(Box::new(print_event));

    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("Agent ready. Type 'quit' to exit, 'reset' to clear, 'history' to review.");
    println!("{}", rule);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nyou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "quit" | "exit" => {
                println!("Bye!");
                break;
            }
            "reset" => {
                agent.reset();
                println!("Conversation cleared.");
            }
            "history" => {
                println!("History ({} messages):", agent.history().len());
                for message in agent.history() {
                    println!("  {}", summarize(message));
                }
            }
            input => match agent.run(input).await {
                Ok(RunOutcome::Finished { iterations, .. }) => {
                    info!(iterations, "Run complete");
                }
                Ok(RunOutcome::IterationLimitReached { .. }) => {
                    println!("(no final answer; ask again to let the agent continue)");
                }
                Err(e) => eprintln!("Model request failed: {}", e),
            },
        }
    }

    Ok(())
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::Text(text) => println!("\nagent: {}", text),
        AgentEvent::ToolCall { name, input, .. } => {
            println!("\n[tool] {} {}", name, input);
        }
        AgentEvent::ToolResult { content, .. } => {
            println!("[result] {}", content);
        }
        AgentEvent::IterationLimitReached { limit } => {
            println!("\n[limit] stopped after {} model calls", limit);
        }
    }
}
