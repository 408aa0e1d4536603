//! Embeddable workflow engine: directed task/flow graphs executed as
//! resumable process instances, with parallel fan-out, AND-join
//! synchronization, conditional branching and durable checkpoints.

pub mod actions;
pub mod definition;
pub mod error;
pub mod nodes;
pub mod runtime;

pub use definition::{ProcessDefinition, Variables};
pub use error::{EngineError, Result};
pub use runtime::engine::ProcessEngine;
pub use runtime::instance::{ProcessInstance, Status};
