use crate::actions::ServiceAction;
use crate::runtime::node::{ExecutionScope, Outcome};
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

/// Calls an external HTTP service. The request body defaults to the
/// instance variables; the `{status, data}` response lands in the variable
/// named by `output`, if given.
#[derive(Debug)]
pub struct HttpAction {
    client: Client,
}

impl HttpAction {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceAction for HttpAction {
    fn name(&self) -> &str {
        "http"
    }

    async fn call(
        &self,
        params: Value,
        scope: &mut ExecutionScope<'_>,
    ) -> anyhow::Result<Outcome> {
        let url = params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("missing required parameter: url"))?;

        let method_str = params.get("method").and_then(|v| v.as_str()).unwrap_or("POST");
        let method = method_str
            .parse::<reqwest::Method>()
            .map_err(|_| anyhow!("invalid HTTP method: {}", method_str))?;

        let mut builder = self.client.request(method, url);

        if let Some(body) = params.get("body") {
            builder = builder.json(body);
        } else {
            builder = builder.json(&scope.variables);
        }

        if let Some(headers) = params.get("headers").and_then(|v| v.as_object()) {
            for (k, v) in headers {
                if let Some(v_str) = v.as_str() {
                    builder = builder.header(k, v_str);
                }
            }
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let data = response.json::<Value>().await.unwrap_or(Value::Null);

        if let Some(output) = params.get("output").and_then(|v| v.as_str()) {
            scope
                .variables
                .insert(output.to_string(), json!({ "status": status, "data": data }));
        }

        Ok(Outcome::Completed)
    }
}
