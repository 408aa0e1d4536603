use crate::definition::Task;
use crate::runtime::node::{ExecutionScope, NodeBehavior, Outcome};
use async_trait::async_trait;

// Start, end and decision tasks do no work of their own: branching and
// join synchronization live in the instance walk, which runs when a node
// completes. Their behaviors just hand the node straight back.

#[derive(Debug)]
pub struct StartBehavior;

#[async_trait]
impl NodeBehavior for StartBehavior {
    async fn run(&self, _task: &Task, _scope: &mut ExecutionScope<'_>) -> anyhow::Result<Outcome> {
        Ok(Outcome::Completed)
    }
}

#[derive(Debug)]
pub struct EndBehavior;

#[async_trait]
impl NodeBehavior for EndBehavior {
    async fn run(&self, _task: &Task, _scope: &mut ExecutionScope<'_>) -> anyhow::Result<Outcome> {
        Ok(Outcome::Completed)
    }
}

#[derive(Debug)]
pub struct DecisionBehavior;

#[async_trait]
impl NodeBehavior for DecisionBehavior {
    async fn run(&self, _task: &Task, _scope: &mut ExecutionScope<'_>) -> anyhow::Result<Outcome> {
        Ok(Outcome::Completed)
    }
}

/// Fallback for task types with no registered behavior.
#[derive(Debug)]
pub struct PassBehavior;

#[async_trait]
impl NodeBehavior for PassBehavior {
    async fn run(&self, _task: &Task, _scope: &mut ExecutionScope<'_>) -> anyhow::Result<Outcome> {
        Ok(Outcome::Completed)
    }
}
