//! Agentloop - a terminal coding agent driven by a chat-completions model.
//!
//! The model plans and the agent acts: each user turn runs a bounded loop of
//! model calls and local tool invocations confined to the workspace.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐        ┌─────────────┐
//! │     CLI     │───────▶│     UI      │
//! └──────┬──────┘        └──────▲──────┘
//!        │                      │ events
//!        │               ┌──────┴──────┐     ┌─────────────┐
//!        └──────────────▶│    Agent    │────▶│  Provider   │
//!                        └──────┬──────┘     └─────────────┘
//!                               │
//!                 ┌─────────────┼─────────────┐
//!          ┌──────┴──────┐ ┌────┴────┐ ┌──────┴──────┐
//!          │   Sandbox   │ │  Tools  │ │  TaskBoard  │
//!          └─────────────┘ └─────────┘ └─────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod ui;

pub use crate::config::Config;
pub use crate::core::agent::{Agent, AgentError, AgentEvent, Conversation, Session};
