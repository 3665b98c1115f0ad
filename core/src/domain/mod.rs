//! Core domain types shared by the agents, tools and executor crates.

pub mod message;
pub mod movement;
pub mod plan;
pub mod symphony;
pub mod task;
pub mod verification;

pub use message::{Message, MessageHistory, Role, ToolCall, ToolName, ToolResult, ToolSpec};
pub use movement::{detect_cycle, topological_order, Movement, MovementStatus};
pub use plan::{AllowedFileSet, PlanDocument, PlanError};
pub use symphony::{Symphony, SymphonyOutcome};
pub use task::{ExecutionMode, Intent, Task};
pub use verification::{ErrorKind, VerificationKind, VerificationResult};
