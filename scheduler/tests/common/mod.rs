//! Common test utilities and infrastructure
//!
//! Shared fixtures and builders used by the scheduler integration tests.

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{SupervisorBuilder, TestHelpers, TestSupervisor};
