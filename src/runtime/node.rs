use crate::definition::{Task, TaskId, Variables};
use crate::runtime::context::ActionRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-instance runtime state for one task: how many of its declared
/// incoming flows have fired so far. Lives in the instance's node pool from
/// the first firing until the task completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionNode {
    pub task: TaskId,
    pub incoming_flow_completed: u32,
}

impl ExecutionNode {
    pub fn new(task: TaskId) -> Self {
        Self {
            task,
            incoming_flow_completed: 0,
        }
    }
}

/// What a behavior did with its node.
///
/// `Completed` lets the walk continue through the task's outgoing flows.
/// `Deferred` suspends the branch: the node stays pooled and nothing further
/// happens until the host calls `ProcessEngine::complete_task` for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Deferred,
}

/// What a behavior may touch while executing: the instance's variables and
/// the engine's service-action table.
pub struct ExecutionScope<'a> {
    pub instance_id: Uuid,
    pub variables: &'a mut Variables,
    pub actions: &'a ActionRegistry,
}

/// Runtime behavior of a task type. Implementations for extension types are
/// registered on the engine under the type's tag; errors fail the instance.
#[async_trait]
pub trait NodeBehavior: Send + Sync {
    async fn run(&self, task: &Task, scope: &mut ExecutionScope<'_>) -> anyhow::Result<Outcome>;
}
