//! A2A task protocol implementation
//!
//! Message, task and artifact types plus the JSON-RPC 2.0 envelope they travel in.

pub mod jsonrpc;
pub mod messages;

pub use jsonrpc::*;
pub use messages::*;
