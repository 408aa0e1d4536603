use crate::actions::ServiceAction;
use crate::definition::TaskKind;
use crate::error::{EngineError, Result};
use crate::nodes::common::{DecisionBehavior, EndBehavior, PassBehavior, StartBehavior};
use crate::nodes::service::ServiceBehavior;
use crate::runtime::node::NodeBehavior;
use crate::runtime::storage::{DefinitionStore, InstanceStore};
use dashmap::DashMap;
use std::sync::Arc;

/// Task-type registry: maps a type tag to the behavior that executes nodes
/// of that type. Built-in tags are seeded at construction; extension tags
/// must be unique. Unregistered tags fall back to a pass-through behavior.
pub struct TaskTypeRegistry {
    behaviors: DashMap<String, Arc<dyn NodeBehavior>>,
    fallback: Arc<dyn NodeBehavior>,
}

impl TaskTypeRegistry {
    pub fn new() -> Self {
        let behaviors: DashMap<String, Arc<dyn NodeBehavior>> = DashMap::new();
        behaviors.insert("start-task".to_string(), Arc::new(StartBehavior));
        behaviors.insert("end-task".to_string(), Arc::new(EndBehavior));
        behaviors.insert("decision".to_string(), Arc::new(DecisionBehavior));
        behaviors.insert("service-task".to_string(), Arc::new(ServiceBehavior));
        Self {
            behaviors,
            fallback: Arc::new(PassBehavior),
        }
    }

    pub fn register(&self, type_name: &str, behavior: Arc<dyn NodeBehavior>) -> Result<()> {
        if self.behaviors.contains_key(type_name) {
            return Err(EngineError::validation(format!(
                "task type `{}` is already registered",
                type_name
            )));
        }
        self.behaviors.insert(type_name.to_string(), behavior);
        Ok(())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.behaviors.contains_key(type_name)
    }

    pub fn behavior_for(&self, kind: &TaskKind) -> Arc<dyn NodeBehavior> {
        self.behaviors
            .get(kind.type_name())
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for TaskTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Service actions keyed by name. A later registration under the same name
/// replaces the earlier one.
#[derive(Default)]
pub struct ActionRegistry {
    actions: DashMap<String, Arc<dyn ServiceAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, action: Arc<dyn ServiceAction>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServiceAction>> {
        self.actions.get(name).map(|entry| entry.value().clone())
    }
}

/// Everything an instance needs from its engine: the type registry, the
/// action table and the checkpoint store. One `Arc` of this is shared by
/// the engine and every instance it creates or restores.
pub struct EngineContext {
    pub registry: TaskTypeRegistry,
    pub actions: ActionRegistry,
    pub instances: Arc<dyn InstanceStore>,
    pub definitions: Arc<dyn DefinitionStore>,
}
