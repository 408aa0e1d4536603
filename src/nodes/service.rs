use crate::definition::{Task, TaskKind, Variables};
use crate::runtime::node::{ExecutionScope, NodeBehavior, Outcome};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;

/// Runs a service task by resolving its action name against the engine's
/// action table. The action decides whether the node completes now or
/// defers until `complete_task`.
#[derive(Debug)]
pub struct ServiceBehavior;

#[async_trait]
impl NodeBehavior for ServiceBehavior {
    async fn run(&self, task: &Task, scope: &mut ExecutionScope<'_>) -> anyhow::Result<Outcome> {
        let TaskKind::ServiceTask { action, params } = &task.kind else {
            return Err(anyhow!(
                "service behavior attached to non-service task `{}`",
                task.label()
            ));
        };

        let handler = scope
            .actions
            .get(action)
            .ok_or_else(|| anyhow!("service action not registered: {}", action))?;

        let resolved = resolve_params(params, scope.variables);
        handler.call(resolved, scope).await
    }
}

/// Replace top-level `${var}` string values with the named variable.
fn resolve_params(params: &Value, variables: &Variables) -> Value {
    let mut resolved = params.clone();
    if let Some(obj) = resolved.as_object_mut() {
        for (_, value) in obj.iter_mut() {
            if let Some(s) = value.as_str() {
                if s.starts_with("${") && s.ends_with('}') {
                    let var_name = &s[2..s.len() - 1];
                    if let Some(bound) = variables.get(var_name) {
                        *value = bound.clone();
                    }
                }
            }
        }
    }
    resolved
}
