//! Agent runtime adapters implementing `domain::ports::AgentRuntime`.

pub mod mock;

pub use mock::{MockAgentRuntime, MockResponse};
