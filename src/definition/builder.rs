use crate::definition::condition::Condition;
use crate::definition::{ProcessDefinition, TaskId, TaskKind};
use crate::error::{EngineError, Result};
use serde_json::Value;

/// Build context for assembling a [`ProcessDefinition`].
///
/// Task factories return the assigned id; flows are attached afterwards.
/// `build` runs the structural validation, so a builder either yields a
/// runnable definition or a `Validation` error.
///
/// ```
/// use procflow::definition::builder::DefinitionBuilder;
///
/// let mut builder = DefinitionBuilder::new("demo");
/// let start = builder.start_task();
/// let end = builder.end_task();
/// builder.flow(start, end).unwrap();
/// let def = builder.build().unwrap();
/// assert_eq!(def.tasks.len(), 2);
/// ```
pub struct DefinitionBuilder {
    def: ProcessDefinition,
}

impl DefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            def: ProcessDefinition::new(name),
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.def.category = category.to_string();
        self
    }

    /// Default variable bindings, seeded into every instance at start.
    pub fn variable(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.def.variables.insert(key.to_string(), value.into());
        self
    }

    pub fn start_task(&mut self) -> TaskId {
        self.def.add_task(None, TaskKind::StartTask)
    }

    pub fn end_task(&mut self) -> TaskId {
        self.def.add_task(None, TaskKind::EndTask)
    }

    /// A task executed by the service action registered under `action`.
    pub fn service_task(&mut self, action: &str) -> TaskId {
        self.service_task_with(action, Value::Null)
    }

    pub fn service_task_with(&mut self, action: &str, params: Value) -> TaskId {
        self.def.add_task(
            None,
            TaskKind::ServiceTask {
                action: action.to_string(),
                params,
            },
        )
    }

    pub fn decision(&mut self) -> TaskId {
        self.def.add_task(None, TaskKind::Decision)
    }

    /// A task of an extension type registered on the engine.
    pub fn custom_task(&mut self, kind: &str, params: Value) -> TaskId {
        self.def.add_task(
            None,
            TaskKind::Custom {
                kind: kind.to_string(),
                params,
            },
        )
    }

    /// Attach a name to a task for later lookup.
    pub fn task_name(&mut self, id: TaskId, name: &str) -> Result<()> {
        match self.def.tasks.get_mut(&id) {
            Some(task) => {
                task.name = Some(name.to_string());
                Ok(())
            }
            None => Err(EngineError::not_found("task", id)),
        }
    }

    pub fn flow(&mut self, from: TaskId, to: TaskId) -> Result<()> {
        self.def.add_flow(from, to, None)?;
        Ok(())
    }

    pub fn flow_if(&mut self, from: TaskId, to: TaskId, condition: &str) -> Result<()> {
        let condition = Condition::parse(condition)?;
        self.def.add_flow(from, to, Some(condition))?;
        Ok(())
    }

    pub fn build(self) -> Result<ProcessDefinition> {
        self.def.validate()?;
        Ok(self.def)
    }
}
