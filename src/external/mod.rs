pub mod runner;
pub mod template;
pub mod tools;

pub use runner::{run_tool, run_tool_logged};
pub use tools::ToolCommand;
