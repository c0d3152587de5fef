//! LLM provider abstraction layer
//!
//! This module provides a provider-agnostic interface for LLM interactions.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
