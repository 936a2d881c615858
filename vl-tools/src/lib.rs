//! Local functions the model may ask the facade to run.
//!
//! Each function declares its parameters up front; arguments coming back from
//! a provider are bound against that declaration before the call.

mod error;
mod func;
mod registry;
mod traits;

pub use error::{Result, ToolError};
pub use func::FnFunction;
pub use registry::FunctionRegistry;
pub use traits::{
    FunctionSpec, LocalFunction, ParamKind, ParamSpec, optional_string, require_string,
    to_llm_tool_def,
};
