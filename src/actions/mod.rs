use crate::runtime::node::{ExecutionScope, Outcome};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

pub mod builtin;
pub mod http;

/// The unit of work behind a service task, registered on the engine by
/// name. Only the name is persisted with a definition; the table of
/// implementations is supplied by the host at startup.
///
/// Returning `Outcome::Deferred` leaves the node in the pool: the action is
/// expected to arrange for `ProcessEngine::complete_task` to be called
/// later (from a spawned task, a webhook handler, an operator). Completing
/// the same node more than once is a usage error.
#[async_trait]
pub trait ServiceAction: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn call(
        &self,
        params: Value,
        scope: &mut ExecutionScope<'_>,
    ) -> anyhow::Result<Outcome>;
}
