use crate::definition::ProcessDefinition;
use crate::runtime::storage::{DefinitionStore, InstanceStore, InstanceRecord};
use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

/// Instance checkpoints in a Redis hash, one JSON record per instance id.
pub struct RedisInstanceStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisInstanceStore {
    pub fn new(client: redis::Client) -> Self {
        Self::with_prefix(client, "procflow")
    }

    pub fn with_prefix(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn instances_key(&self) -> String {
        format!("{}:instances", self.key_prefix)
    }

    fn definitions_key(&self) -> String {
        format!("{}:definitions", self.key_prefix)
    }
}

#[async_trait]
impl InstanceStore for RedisInstanceStore {
    async fn insert(&self, record: &InstanceRecord) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(record)?;
        let _: () = conn
            .hset(self.instances_key(), record.id.to_string(), serialized)
            .await?;
        Ok(())
    }

    async fn update(&self, record: &InstanceRecord) -> anyhow::Result<()> {
        // HSET overwrites, so insert and update collapse into the same call.
        self.insert(record).await
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<InstanceRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.hget(self.instances_key(), id.to_string()).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DefinitionStore for RedisInstanceStore {
    async fn save(&self, def: &ProcessDefinition) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(def)?;
        let _: () = conn
            .hset(self.definitions_key(), def.name.clone(), serialized)
            .await?;
        Ok(())
    }

    async fn find(&self, name: &str) -> anyhow::Result<Option<ProcessDefinition>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.hget(self.definitions_key(), name).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_category(&self, category: &str) -> anyhow::Result<Vec<ProcessDefinition>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: std::collections::HashMap<String, String> =
            conn.hgetall(self.definitions_key()).await?;
        let mut found = Vec::new();
        for (_, json) in raw {
            let def: ProcessDefinition = serde_json::from_str(&json)?;
            if def.category == category {
                found.push(def);
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}
