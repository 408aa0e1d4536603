pub mod builder;
pub mod condition;
pub mod import;

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub use condition::Condition;

pub type TaskId = usize;
pub type FlowId = usize;

/// Mutable key-value bindings shared by all tasks of one instance. The sole
/// channel for inter-task data passing and condition evaluation.
pub type Variables = HashMap<String, Value>;

/// The type tag of a task. Built-in kinds cover the graph primitives;
/// `Custom` carries the name of a task type registered on the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskKind {
    StartTask,
    EndTask,
    ServiceTask {
        action: String,
        #[serde(default)]
        params: Value,
    },
    Decision,
    Custom {
        kind: String,
        #[serde(default)]
        params: Value,
    },
}

impl TaskKind {
    pub fn type_name(&self) -> &str {
        match self {
            TaskKind::StartTask => "start-task",
            TaskKind::EndTask => "end-task",
            TaskKind::ServiceTask { .. } => "service-task",
            TaskKind::Decision => "decision",
            TaskKind::Custom { kind, .. } => kind,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, TaskKind::StartTask)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, TaskKind::EndTask)
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, TaskKind::Decision)
    }
}

/// A node in the static graph. Flow lists hold indices into the owning
/// definition's flow table, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub incoming: Vec<FlowId>,
    #[serde(default)]
    pub outgoing: Vec<FlowId>,
}

impl Task {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}#{}", self.kind.type_name(), self.id),
        }
    }
}

/// A directed edge between two tasks. The condition is consulted only when
/// the edge is one of several outgoing flows of a decision task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flow {
    pub from: TaskId,
    pub to: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// The immutable process graph: built once, shared read-only by every
/// instance created from it. Its serde form is the definition record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessDefinition {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub tasks: BTreeMap<TaskId, Task>,
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    next_task_id: TaskId,
}

pub(crate) fn default_category() -> String {
    "Default".to_string()
}

impl ProcessDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: default_category(),
            tasks: BTreeMap::new(),
            flows: Vec::new(),
            variables: Variables::new(),
            next_task_id: 0,
        }
    }

    /// Add a task, assigning the next free id. The first task added gets
    /// id 0, which by convention is the start task.
    pub fn add_task(&mut self, name: Option<String>, kind: TaskKind) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id += 1;
        self.tasks.insert(
            id,
            Task {
                id,
                name,
                kind,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            },
        );
        id
    }

    /// Connect two tasks. Both endpoints must already belong to this
    /// definition.
    pub fn add_flow(
        &mut self,
        from: TaskId,
        to: TaskId,
        condition: Option<Condition>,
    ) -> Result<FlowId> {
        if !self.tasks.contains_key(&from) {
            return Err(EngineError::validation(format!(
                "flow source task {} does not exist",
                from
            )));
        }
        if !self.tasks.contains_key(&to) {
            return Err(EngineError::validation(format!(
                "flow target task {} does not exist",
                to
            )));
        }

        let flow_id = self.flows.len();
        self.flows.push(Flow {
            from,
            to,
            condition,
        });
        if let Some(source) = self.tasks.get_mut(&from) {
            source.outgoing.push(flow_id);
        }
        if let Some(target) = self.tasks.get_mut(&to) {
            target.incoming.push(flow_id);
        }
        Ok(flow_id)
    }

    pub fn task(&self, id: TaskId) -> Result<&Task> {
        self.tasks
            .get(&id)
            .ok_or_else(|| EngineError::not_found("task", id))
    }

    pub fn flow(&self, id: FlowId) -> Result<&Flow> {
        self.flows
            .get(id)
            .ok_or_else(|| EngineError::not_found("flow", id))
    }

    pub fn task_by_name(&self, name: &str) -> Option<&Task> {
        self.tasks.values().find(|t| t.name.as_deref() == Some(name))
    }

    /// The designated entry point of the graph.
    pub fn start_task(&self) -> Result<&Task> {
        self.tasks
            .values()
            .find(|t| t.kind.is_start())
            .ok_or_else(|| EngineError::validation("definition has no start task".to_string()))
    }

    /// Structural checks applied before a definition is executed or
    /// persisted: one start task, intact flow references, and a condition on
    /// every branch of a multi-way decision.
    pub fn validate(&self) -> Result<()> {
        let start_count = self.tasks.values().filter(|t| t.kind.is_start()).count();
        if start_count != 1 {
            return Err(EngineError::validation(format!(
                "definition `{}` must declare exactly one start task, found {}",
                self.name, start_count
            )));
        }

        for flow in &self.flows {
            if !self.tasks.contains_key(&flow.from) || !self.tasks.contains_key(&flow.to) {
                return Err(EngineError::validation(format!(
                    "definition `{}` has a flow with a dangling endpoint ({} -> {})",
                    self.name, flow.from, flow.to
                )));
            }
        }

        for task in self.tasks.values() {
            for &flow_id in task.incoming.iter().chain(task.outgoing.iter()) {
                if flow_id >= self.flows.len() {
                    return Err(EngineError::validation(format!(
                        "task `{}` references unknown flow {}",
                        task.label(),
                        flow_id
                    )));
                }
            }
            if task.kind.is_decision() && task.outgoing.len() > 1 {
                for &flow_id in &task.outgoing {
                    if self.flows[flow_id].condition.is_none() {
                        return Err(EngineError::validation(format!(
                            "decision task `{}` has an unconditional outgoing flow",
                            task.label()
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
