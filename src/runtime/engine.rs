use crate::actions::ServiceAction;
use crate::definition::import::{self, DefinitionDocument};
use crate::definition::{ProcessDefinition, TaskId};
use crate::error::{EngineError, Result};
use crate::runtime::context::{ActionRegistry, EngineContext, TaskTypeRegistry};
use crate::runtime::instance::ProcessInstance;
use crate::runtime::node::NodeBehavior;
use crate::runtime::storage::{
    DefinitionStore, InstanceRecord, InstanceStore, MemoryDefinitionStore, MemoryInstanceStore,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// The process-wide runtime: live instance pool, task-type registry,
/// service-action table and persistence mediation.
///
/// Hosts construct engines explicitly and thread them through; nothing here
/// is global. Instances of different ids may be driven concurrently, while
/// each instance's mutex serializes operations on that instance.
pub struct ProcessEngine {
    ctx: Arc<EngineContext>,
    instances: DashMap<Uuid, Arc<Mutex<ProcessInstance>>>,
}

impl ProcessEngine {
    /// An engine over in-memory stores.
    pub fn new() -> Self {
        Self::with_stores(
            Arc::new(MemoryInstanceStore::new()),
            Arc::new(MemoryDefinitionStore::new()),
        )
    }

    pub fn with_stores(
        instance_store: Arc<dyn InstanceStore>,
        definition_store: Arc<dyn DefinitionStore>,
    ) -> Self {
        Self {
            ctx: Arc::new(EngineContext {
                registry: TaskTypeRegistry::new(),
                actions: ActionRegistry::new(),
                instances: instance_store,
                definitions: definition_store,
            }),
            instances: DashMap::new(),
        }
    }

    /// Register a behavior for an extension task type. Type names must be
    /// unique; the built-in tags are reserved.
    pub fn register_task_type(
        &self,
        type_name: &str,
        behavior: Arc<dyn NodeBehavior>,
    ) -> Result<()> {
        self.ctx.registry.register(type_name, behavior)
    }

    /// Register a service action under its own name, replacing any earlier
    /// registration.
    pub fn register_action(&self, action: Arc<dyn ServiceAction>) {
        self.ctx.actions.register(action);
    }

    /// Create a live instance from a definition and add it to the pool.
    pub fn create_process_instance(
        &self,
        def: ProcessDefinition,
    ) -> Result<Arc<Mutex<ProcessInstance>>> {
        def.validate()?;
        let id = Uuid::new_v4();
        let instance = ProcessInstance::new(id, Arc::new(def), Arc::clone(&self.ctx));
        let handle = Arc::new(Mutex::new(instance));
        self.instances.insert(id, Arc::clone(&handle));
        info!(instance_id = %id, "process instance created");
        Ok(handle)
    }

    /// Fetch a live instance from the pool.
    pub fn process_instance(&self, id: Uuid) -> Result<Arc<Mutex<ProcessInstance>>> {
        self.instances
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::not_found("process instance", id))
    }

    /// Complete a deferred task and resume the instance's walk. This is the
    /// re-entry point for asynchronous task completion; unknown process or
    /// task ids are an error, not a no-op.
    pub async fn complete_task(&self, process_id: Uuid, task_id: TaskId) -> Result<()> {
        let handle = self.process_instance(process_id)?;
        let mut instance = handle.lock().await;
        instance.resume_task(task_id).await
    }

    /// Upsert a serialized instance record through the instance store.
    pub async fn save_process_instance(&self, record: &InstanceRecord) -> Result<()> {
        self.ctx
            .instances
            .upsert(record)
            .await
            .map_err(|source| EngineError::Persistence { source })
    }

    /// Load a checkpointed instance, reconstruct it and put it back into the
    /// live pool. Returns `None` when no record exists under the id.
    pub async fn load_process_instance(
        &self,
        id: Uuid,
    ) -> Result<Option<Arc<Mutex<ProcessInstance>>>> {
        let record = self
            .ctx
            .instances
            .find(id)
            .await
            .map_err(|source| EngineError::Persistence { source })?;
        let Some(record) = record else {
            return Ok(None);
        };

        let instance = ProcessInstance::restore(record, Arc::clone(&self.ctx))?;
        let handle = Arc::new(Mutex::new(instance));
        self.instances.insert(id, Arc::clone(&handle));
        info!(instance_id = %id, "process instance loaded");
        Ok(Some(handle))
    }

    /// Resolve a structural definition document against this engine's
    /// registry.
    pub fn import_definition(&self, doc: &DefinitionDocument) -> Result<ProcessDefinition> {
        import::import_definition(doc, |kind| self.ctx.registry.contains(kind))
    }

    pub async fn save_definition(&self, def: &ProcessDefinition) -> Result<()> {
        def.validate()?;
        self.ctx
            .definitions
            .save(def)
            .await
            .map_err(|source| EngineError::Persistence { source })
    }

    pub async fn load_definition(&self, name: &str) -> Result<Option<ProcessDefinition>> {
        self.ctx
            .definitions
            .find(name)
            .await
            .map_err(|source| EngineError::Persistence { source })
    }

    pub async fn definitions_in_category(&self, category: &str) -> Result<Vec<ProcessDefinition>> {
        self.ctx
            .definitions
            .list_category(category)
            .await
            .map_err(|source| EngineError::Persistence { source })
    }
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::new()
    }
}
