//! # tool_agent
//!
//! A tool-augmented conversational agent over the Anthropic messages API.
//!
//! This library provides:
//! - A tool registry that turns every tool outcome into plain text
//! - An append-only conversation log
//! - A bounded agent loop that interleaves model text with tool calls
//! - A handful of builtin tools (clock, files, shell, arithmetic, HTTP)
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a user message
//! 2. Send the whole conversation and the tool schemas to the model
//! 3. Parse the response, execute the first requested tool call
//! 4. Feed the result back to the model, repeat until it answers in plain text
//!
//! ## Example
//!
//! ```rust,ignore
//! use tool_agent::{agent::Agent, config::Config, tools::ToolRegistry};
//!
//! let config = Config::from_env()?;
//! let mut agent = Agent::new(config).with_tools(ToolRegistry::with_builtin_tools());
//! let outcome = agent.run("What time is it?").await?;
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
