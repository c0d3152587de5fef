//! A2A protocol adapter
//!
//! Turns raw JSON-RPC request bodies addressed to `/a2a/agent/{agentId}` into
//! agent invocations and assembles the task or error response. The HTTP layer
//! only forwards bytes in and writes the [`A2aResponse`] out.

pub mod adapter;
pub mod error;

pub use adapter::{A2aAdapter, A2aResponse, READY_MESSAGE};
pub use error::AdapterError;
