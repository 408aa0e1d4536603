use crate::definition::{ProcessDefinition, TaskId, Variables};
use crate::runtime::instance::Status;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Records ---

/// Durable form of one pooled execution node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub process_instance: Uuid,
    pub task: TaskId,
    pub incoming_flow_completed: u32,
}

/// Durable snapshot of a process instance: enough to resume the walk
/// without re-executing completed work. The definition travels inside the
/// record so a checkpoint is self-contained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRecord {
    pub id: Uuid,
    pub def: ProcessDefinition,
    pub status: Status,
    pub node_pool: Vec<NodeRecord>,
    pub variables: Variables,
}

// --- Interfaces ---

/// Checkpoint storage for instance records. The engine depends only on this
/// contract; the medium behind it is a host decision.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn insert(&self, record: &InstanceRecord) -> anyhow::Result<()>;
    async fn update(&self, record: &InstanceRecord) -> anyhow::Result<()>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<InstanceRecord>>;

    /// Insert on first save, update afterwards.
    async fn upsert(&self, record: &InstanceRecord) -> anyhow::Result<()> {
        if self.find(record.id).await?.is_some() {
            self.update(record).await
        } else {
            self.insert(record).await
        }
    }
}

/// Storage for process definitions, keyed by definition name.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn save(&self, def: &ProcessDefinition) -> anyhow::Result<()>;
    async fn find(&self, name: &str) -> anyhow::Result<Option<ProcessDefinition>>;
    async fn list_category(&self, category: &str) -> anyhow::Result<Vec<ProcessDefinition>>;
}

// --- In-Memory Implementations ---

#[derive(Default)]
pub struct MemoryInstanceStore {
    records: DashMap<Uuid, InstanceRecord>,
}

impl MemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for MemoryInstanceStore {
    async fn insert(&self, record: &InstanceRecord) -> anyhow::Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &InstanceRecord) -> anyhow::Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<InstanceRecord>> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }
}

#[derive(Default)]
pub struct MemoryDefinitionStore {
    definitions: DashMap<String, ProcessDefinition>,
}

impl MemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionStore for MemoryDefinitionStore {
    async fn save(&self, def: &ProcessDefinition) -> anyhow::Result<()> {
        self.definitions.insert(def.name.clone(), def.clone());
        Ok(())
    }

    async fn find(&self, name: &str) -> anyhow::Result<Option<ProcessDefinition>> {
        Ok(self.definitions.get(name).map(|entry| entry.value().clone()))
    }

    async fn list_category(&self, category: &str) -> anyhow::Result<Vec<ProcessDefinition>> {
        let mut found: Vec<ProcessDefinition> = self
            .definitions
            .iter()
            .filter(|entry| entry.value().category == category)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}
