//! Tool Runtime (C1) and Verifier (C4): the sandboxed operations agents may
//! perform against the workspace, and the build/test/lint checks run after
//! each movement.

pub mod runtime;
pub mod verifier;

pub use runtime::{extract_tool_call, ToolRuntime};
pub use verifier::{detect_language, verify, verify_many, Language};
