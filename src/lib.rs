//! Ratings Agent
//!
//! An app-rating assistant served over the A2A JSON-RPC protocol, plus a
//! scheduled fetch → format → store pipeline for Play Store ratings.
//!
//! # Overview
//!
//! - [`a2a`]: validates JSON-RPC `message/send` bodies, invokes the addressed
//!   agent and assembles the completed task or the error response
//! - [`agent`]: the agent registry and the LLM agent with its tool loop
//! - [`pipeline`]: step engine and the three rating steps
//! - [`lookup`]: the rating record and the Play Store lookup client
//! - [`server`]: warp routes for `/a2a/agent/{agentId}`, `/health` and `/metrics`
//!
//! # Quick Start
//!
//! ```rust
//! use ratings_agent::agent::AgentRegistry;
//! use ratings_agent::a2a::A2aAdapter;
//! use ratings_agent::config::Environment;
//! use ratings_agent::testing::MockInvoker;
//! use std::sync::Arc;
//!
//! let registry = AgentRegistry::new()
//!     .with_agent("playStoreAgent", Arc::new(MockInvoker::replying("4.6 stars")));
//! let adapter = A2aAdapter::new(registry, Environment::Production);
//!
//! let body = br#"{"jsonrpc":"2.0","id":1,"method":"message/send",
//!     "params":{"message":{"role":"user","parts":[{"kind":"text","text":"Rate Spotify"}]}}}"#;
//! let response = tokio::runtime::Runtime::new()
//!     .unwrap()
//!     .block_on(adapter.handle(body, "playStoreAgent"));
//!
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body["result"]["status"]["state"], "completed");
//! ```

pub mod a2a;
pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod lookup;
pub mod observability;
pub mod pipeline;
pub mod protocol;
pub mod scoring;
pub mod server;
pub mod testing;
pub mod tools;

pub use a2a::{A2aAdapter, A2aResponse, AdapterError};
pub use agent::{AgentInvoker, AgentRegistry, LlmAgent};
pub use config::{AgentConfig, Environment};
pub use error::{AgentError, AgentResult};
pub use pipeline::{PipelineInput, PipelineRun, RatingPipeline};
