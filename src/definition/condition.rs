use crate::definition::Variables;
use crate::error::{EngineError, Result};
use anyhow::anyhow;
use evalexpr::{
    ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, Node as EvalNode,
    build_operator_tree,
};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

/// A branch condition over instance variables.
///
/// The expression is plain data: its source string is what gets persisted,
/// and a pre-compiled operator tree is what gets evaluated. Host-language
/// code never round-trips through storage.
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    compiled: EvalNode,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self> {
        let compiled = build_operator_tree(source).map_err(|e| {
            EngineError::validation(format!("condition `{}` does not parse: {}", source, e))
        })?;
        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the instance variables. Non-boolean results and
    /// references to unknown variables are reported, not coerced.
    pub fn evaluate(&self, variables: &Variables) -> anyhow::Result<bool> {
        let ctx = eval_context(variables);
        self.compiled
            .eval_boolean_with_context(&ctx)
            .map_err(|e| anyhow!("condition `{}` failed to evaluate: {}", self.source, e))
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Condition::parse(&source).map_err(D::Error::custom)
    }
}

/// Build an evalexpr context from instance variables. Arrays and objects are
/// skipped; conditions only range over scalars.
pub(crate) fn eval_context(variables: &Variables) -> HashMapContext<DefaultNumericTypes> {
    let mut ctx = HashMapContext::<DefaultNumericTypes>::new();
    for (k, v) in variables {
        let eval_val = match v {
            Value::String(s) => Some(evalexpr::Value::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(evalexpr::Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Some(evalexpr::Value::Float(f))
                } else {
                    None
                }
            }
            Value::Bool(b) => Some(evalexpr::Value::Boolean(*b)),
            _ => None,
        };
        if let Some(ev) = eval_val {
            let _ = ctx.set_value(k.clone(), ev);
        }
    }
    ctx
}

pub(crate) fn eval_value_to_json(value: evalexpr::Value) -> Option<Value> {
    match value {
        evalexpr::Value::String(s) => Some(Value::String(s)),
        evalexpr::Value::Int(i) => Some(json!(i)),
        evalexpr::Value::Float(f) => Some(json!(f)),
        evalexpr::Value::Boolean(b) => Some(Value::Bool(b)),
        _ => None,
    }
}
