//! Core agent loop implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{
    AnthropicClient, ContentBlock, Message, ModelClient, ToolDefinition, TransportError,
};
use crate::tools::{Tool, ToolRegistry};

use super::conversation::Conversation;

/// Something the caller may want to show while a run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A text block from the model.
    Text(String),
    /// A tool is about to be invoked.
    ToolCall {
        id: String,
        name: String,
        input: Value,
    },
    /// A tool finished; `content` is what the model will see.
    ToolResult {
        id: String,
        name: String,
        content: String,
    },
    /// The run stopped because the iteration bound was hit.
    IterationLimitReached { limit: usize },
}

pub type EventHandler = Box<dyn Fn(&AgentEvent) + Send + Sync>;

/// How a run ended, when the backend never failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model answered without requesting a tool.
    /// `text` joins the final turn's text blocks with newlines.
    Finished { text: String, iterations: usize },
    /// Every permitted round-trip ended in a tool call.
    IterationLimitReached { iterations: usize },
}

/// The tool use acted on in a turn, plus what the model said up to it.
struct Turn {
    blocks: Vec<ContentBlock>,
    text: Vec<String>,
    tool_use: Option<(String, String, Value)>,
}

/// An agent session: model backend, tools, and the conversation so far.
pub struct Agent {
    model: String,
    max_iterations: usize,
    workspace: PathBuf,
    llm: Arc<dyn ModelClient>,
    tools: ToolRegistry,
    history: Conversation,
    on_event: Option<EventHandler>,
}

impl Agent {
    /// Create an agent talking to the Anthropic API, with no tools registered.
    pub fn new(config: Config) -> Self {
        let llm = Arc::new(AnthropicClient::from_config(&config));
        Self::with_client(config, llm)
    }

    /// Create an agent over any model backend.
    pub fn with_client(config: Config, llm: Arc<dyn ModelClient>) -> Self {
        info!(
            model = %config.model,
            max_iterations = config.max_iterations,
            "Agent initialized"
        );

        Self {
            model: config.model,
            max_iterations: config.max_iterations.max(1),
            workspace: config.workspace_path,
            llm,
            tools: ToolRegistry::new(),
            history: Conversation::new(),
            on_event: None,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_event_handler(mut self, handler: EventHandler) -> Self {
        self.on_event = Some(handler);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    /// Conversation so far, oldest first.
    pub fn history(&self) -> &[Message] {
        self.history.snapshot()
    }

    /// Forget the conversation. Tools, model and credential are kept.
    pub fn reset(&mut self) {
        self.history.clear();
        info!("Conversation history cleared");
    }

    /// Run one user utterance to completion.
    ///
    /// Tool failures never end the run; they are fed back to the model as
    /// text. A backend failure ends the run immediately, leaving history as
    /// it was before that call.
    pub async fn run(&mut self, user_text: &str) -> Result<RunOutcome, TransportError> {
        info!(history_len = self.history.len(), "Starting run");
        self.history.append(Message::user(user_text));

        let definitions: Option<Vec<ToolDefinition>> =
            self.tools.has_tools().then(|| self.tools.definitions());

        let mut iteration = 1;
        loop {
            debug!("Agent iteration {}", iteration);

            let response = match self
                .llm
                .send(self.history.snapshot(), definitions.as_deref())
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(iteration, "Model backend call failed: {}", e);
                    return Err(e);
                }
            };

            let turn = self.interpret(response.content);

            let Some((id, name, input)) = turn.tool_use else {
                self.history.append(Message::assistant(turn.blocks));
                info!(iterations = iteration, "Run finished");
                return Ok(RunOutcome::Finished {
                    text: turn.text.join("\n"),
                    iterations: iteration,
                });
            };

            // The assistant turn must be in history before the tool runs.
            self.history.append(Message::assistant(turn.blocks));

            info!(tool = %name, id = %id, "Dispatching tool call");
            self.emit(AgentEvent::ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            });

            let result = self.tools.execute(&name, input, &self.workspace).await;
            debug!(tool = %name, "Tool result: {}", truncate_for_log(&result, 500));

            self.emit(AgentEvent::ToolResult {
                id: id.clone(),
                name,
                content: result.clone(),
            });
            self.history.append(Message::tool_result(id, result));

            if iteration < self.max_iterations {
                iteration += 1;
                continue;
            }

            warn!(limit = self.max_iterations, "Max iterations reached");
            self.emit(AgentEvent::IterationLimitReached {
                limit: self.max_iterations,
            });
            return Ok(RunOutcome::IterationLimitReached {
                iterations: iteration,
            });
        }
    }

    /// Walk the response in order, surfacing text, up to and including the
    /// first tool use. Anything after it is dropped so every tool use kept in
    /// history gets a matching result.
    fn interpret(&self, blocks: Vec<ContentBlock>) -> Turn {
        let mut kept = Vec::with_capacity(blocks.len());
        let mut text = Vec::new();
        let mut tool_use = None;
        let total = blocks.len();

        for block in blocks {
            match &block {
                ContentBlock::Text { text: t } => {
                    self.emit(AgentEvent::Text(t.clone()));
                    text.push(t.clone());
                }
                ContentBlock::ToolUse { id, name, input } => {
                    tool_use = Some((id.clone(), name.clone(), input.clone()));
                }
                ContentBlock::ToolResult { .. } => {
                    warn!("Model response contained a tool_result block");
                }
            }
            kept.push(block);
            if tool_use.is_some() {
                break;
            }
        }

        if kept.len() < total {
            warn!(
                dropped = total - kept.len(),
                "Dropping content after the first tool use in the same response"
            );
        }

        Turn {
            blocks: kept,
            text,
            tool_use,
        }
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(handler) = &self.on_event {
            handler(&event);
        }
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... [truncated]", &s[..cut]),
        None => s.to_string(),
    }
}
