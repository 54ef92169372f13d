// core/src/flow/mod.rs

//! A small asynchronous step-pipeline engine.
//!
//! Order flows (checkout, status changes) are expressed as a `Pipeline<TData, Err>`
//! of named steps. Each step can carry `before`, `on` and `after` handlers that
//! operate on a shared `ContextData<TData>` and return a `PipelineControl`
//! signal telling the engine whether to continue.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::Pipeline;
pub use hooks::Handler;
pub use step::{SkipCondition, StepDef};
