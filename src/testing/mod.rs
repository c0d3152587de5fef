//! Testing utilities and mock implementations
//!
//! Mocks for every collaborator seam, usable from unit and integration tests.

pub mod mocks;

pub use mocks::*;
