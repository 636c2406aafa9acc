//! External tool execution.

pub mod tool_runner;

pub use tool_runner::{RunnerConfig, ToolError, ToolOutput, ToolRunner, ToolRunnerBuilder};
