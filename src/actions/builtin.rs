use crate::actions::ServiceAction;
use crate::definition::condition::{eval_context, eval_value_to_json};
use crate::runtime::node::{ExecutionScope, Outcome};
use async_trait::async_trait;
use evalexpr::eval_with_context;
use serde_json::Value;
use tracing::info;

#[derive(Debug)]
pub struct LogAction;

#[async_trait]
impl ServiceAction for LogAction {
    fn name(&self) -> &str {
        "log"
    }

    async fn call(
        &self,
        params: Value,
        scope: &mut ExecutionScope<'_>,
    ) -> anyhow::Result<Outcome> {
        if let Some(msg) = params.get("msg").and_then(|v| v.as_str()) {
            info!(instance_id = %scope.instance_id, "[LOG] {}", msg);
        } else {
            info!(instance_id = %scope.instance_id, "[LOG] {:?}", params);
        }
        Ok(Outcome::Completed)
    }
}

/// Writes instance variables: a list of `{key, value}` assignments, an
/// `expression` of the form `var = expr` evaluated over the current
/// bindings, or both.
#[derive(Debug)]
pub struct AssignAction;

#[async_trait]
impl ServiceAction for AssignAction {
    fn name(&self) -> &str {
        "assign"
    }

    async fn call(
        &self,
        params: Value,
        scope: &mut ExecutionScope<'_>,
    ) -> anyhow::Result<Outcome> {
        if let Some(list) = params.get("assignments").and_then(|v| v.as_array()) {
            for item in list {
                if let (Some(key), Some(value)) =
                    (item.get("key").and_then(|s| s.as_str()), item.get("value"))
                {
                    scope.variables.insert(key.to_string(), value.clone());
                }
            }
        }

        if let Some(expr) = params.get("expression").and_then(|v| v.as_str()) {
            let Some((target, rhs)) = expr.split_once('=') else {
                anyhow::bail!("assign expression must look like `var = expr`: {}", expr);
            };
            let target = target.trim();
            let rhs = rhs.trim();

            let ctx = eval_context(scope.variables);
            match eval_with_context(rhs, &ctx) {
                Ok(result) => {
                    if let Some(json_val) = eval_value_to_json(result) {
                        scope.variables.insert(target.to_string(), json_val);
                    }
                }
                Err(e) => anyhow::bail!("expression `{}` failed: {}", rhs, e),
            }
        }

        Ok(Outcome::Completed)
    }
}

/// Work completed outside the engine. The node defers; the host resumes it
/// through `ProcessEngine::complete_task` once the external result arrived.
#[derive(Debug)]
pub struct ExternalAction;

#[async_trait]
impl ServiceAction for ExternalAction {
    fn name(&self) -> &str {
        "external"
    }

    async fn call(
        &self,
        _params: Value,
        scope: &mut ExecutionScope<'_>,
    ) -> anyhow::Result<Outcome> {
        info!(instance_id = %scope.instance_id, "waiting for external completion");
        Ok(Outcome::Deferred)
    }
}
