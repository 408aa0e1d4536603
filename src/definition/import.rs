use crate::definition::condition::Condition;
use crate::definition::{ProcessDefinition, TaskKind, Variables, default_category};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// The structural import format: tasks keyed by name, flows referencing
/// those names, conditions as expression text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionDocument {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub tasks: BTreeMap<String, TaskEntry>,
    #[serde(default)]
    pub flows: Vec<FlowEntry>,
    #[serde(default)]
    pub variables: Variables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEntry {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

pub fn load_document_from_yaml(path: &Path) -> Result<DefinitionDocument> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        EngineError::validation(format!("failed to read {}: {}", path.display(), e))
    })?;
    serde_yaml::from_str(&text).map_err(|e| {
        EngineError::validation(format!("failed to parse {}: {}", path.display(), e))
    })
}

/// Resolve a document into a runnable definition. `is_known_kind` answers
/// whether a non-built-in type tag is registered on the engine; an unknown
/// tag or an unresolved flow endpoint aborts the import.
pub fn import_definition(
    doc: &DefinitionDocument,
    is_known_kind: impl Fn(&str) -> bool,
) -> Result<ProcessDefinition> {
    let mut def = ProcessDefinition::new(&doc.name);
    def.category = doc.category.clone();
    def.variables = doc.variables.clone();

    let start_names: Vec<&String> = doc
        .tasks
        .iter()
        .filter(|(_, entry)| entry.task_type == "start-task")
        .map(|(name, _)| name)
        .collect();
    if start_names.len() != 1 {
        return Err(EngineError::validation(format!(
            "definition `{}` must declare exactly one start-task, found {}",
            doc.name,
            start_names.len()
        )));
    }

    // The start task is seated first so it lands at id 0; the remaining
    // entries follow in name order.
    let start_name = start_names[0].clone();
    let mut ids = BTreeMap::new();
    let ordered = std::iter::once(&start_name).chain(doc.tasks.keys().filter(|n| **n != start_name));
    for name in ordered {
        let entry = &doc.tasks[name];
        let kind = task_kind(name, entry, &is_known_kind)?;
        let id = def.add_task(Some(name.clone()), kind);
        ids.insert(name.clone(), id);
    }

    for flow in &doc.flows {
        let from = *ids.get(&flow.from).ok_or_else(|| {
            EngineError::validation(format!("task `{}` of flow.from does not exist", flow.from))
        })?;
        let to = *ids.get(&flow.to).ok_or_else(|| {
            EngineError::validation(format!("task `{}` of flow.to does not exist", flow.to))
        })?;
        let condition = flow
            .condition
            .as_deref()
            .map(Condition::parse)
            .transpose()?;
        def.add_flow(from, to, condition)?;
    }

    def.validate()?;
    Ok(def)
}

fn task_kind(
    name: &str,
    entry: &TaskEntry,
    is_known_kind: &impl Fn(&str) -> bool,
) -> Result<TaskKind> {
    match entry.task_type.as_str() {
        "start-task" => Ok(TaskKind::StartTask),
        "end-task" => Ok(TaskKind::EndTask),
        "decision" => Ok(TaskKind::Decision),
        "service-task" => {
            let action = entry.action.clone().ok_or_else(|| {
                EngineError::validation(format!("service-task `{}` is missing an action", name))
            })?;
            Ok(TaskKind::ServiceTask {
                action,
                params: entry.params.clone(),
            })
        }
        other => {
            if is_known_kind(other) {
                Ok(TaskKind::Custom {
                    kind: other.to_string(),
                    params: entry.params.clone(),
                })
            } else {
                Err(EngineError::validation(format!(
                    "task `{}` has unknown type `{}`",
                    name, other
                )))
            }
        }
    }
}
