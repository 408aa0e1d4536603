use crate::definition::{ProcessDefinition, Task, TaskId, Variables};
use crate::error::{EngineError, Result};
use crate::runtime::context::EngineContext;
use crate::runtime::node::{ExecutionNode, ExecutionScope, Outcome};
use crate::runtime::observer::ProcessObserver;
use crate::runtime::storage::{InstanceRecord, NodeRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Lifecycle of a process instance.
///
/// `New -> Running -> {Waiting <-> Running} -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    New,
    Running,
    Waiting,
    Completed,
    Failed,
}

/// One execution of a [`ProcessDefinition`].
///
/// The instance owns the node pool (the execution frontier), the variable
/// bindings, the observer list and the walk itself. Operations on a single
/// instance are not safe for concurrent mutation; the engine wraps each
/// instance in a mutex so different instances stay independent.
pub struct ProcessInstance {
    id: Uuid,
    def: Arc<ProcessDefinition>,
    status: Status,
    variables: Variables,
    node_pool: HashMap<TaskId, ExecutionNode>,
    observers: Vec<Arc<dyn ProcessObserver>>,
    ctx: Arc<EngineContext>,
}

impl ProcessInstance {
    pub(crate) fn new(id: Uuid, def: Arc<ProcessDefinition>, ctx: Arc<EngineContext>) -> Self {
        Self {
            id,
            def,
            status: Status::New,
            variables: Variables::new(),
            node_pool: HashMap::new(),
            observers: Vec::new(),
            ctx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn definition(&self) -> &Arc<ProcessDefinition> {
        &self.def
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    /// The tasks that are pending or currently executing.
    pub fn node_pool(&self) -> &HashMap<TaskId, ExecutionNode> {
        &self.node_pool
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ProcessObserver>) {
        self.observers.push(observer);
    }

    /// Look up a pooled node by its task name.
    pub fn node(&self, task_name: &str) -> Result<&ExecutionNode> {
        self.node_pool
            .values()
            .find(|node| {
                self.def
                    .tasks
                    .get(&node.task)
                    .is_some_and(|task| task.name.as_deref() == Some(task_name))
            })
            .ok_or_else(|| EngineError::not_found("node", task_name))
    }

    /// Begin the walk. May be invoked exactly once; the definition's default
    /// variables seed the bindings and the caller's values win on conflict.
    pub async fn start(&mut self, variables: Variables) -> Result<()> {
        if self.status != Status::New {
            return Err(EngineError::AlreadyStarted(self.id));
        }

        let mut bound = self.def.variables.clone();
        bound.extend(variables);
        self.variables = bound;
        self.status = Status::Running;

        let start_id = self.def.start_task()?.id;
        info!(instance_id = %self.id, definition = %self.def.name, "process instance started");
        self.node_pool.insert(start_id, ExecutionNode::new(start_id));
        self.advance(vec![start_id]).await
    }

    /// Re-enter the walk at a deferred node. This is how asynchronous task
    /// completion resumes an instance, via `ProcessEngine::complete_task`.
    pub async fn resume_task(&mut self, task_id: TaskId) -> Result<()> {
        if !self.node_pool.contains_key(&task_id) {
            return Err(EngineError::not_found("node", task_id));
        }
        if !matches!(self.status, Status::Running | Status::Waiting) {
            return Err(EngineError::Execution {
                task: self.def.task(task_id)?.label(),
                source: anyhow::anyhow!("instance is {:?}, cannot resume", self.status),
            });
        }

        self.status = Status::Running;
        let ready = self.complete_node(task_id).await?;
        self.advance(ready).await
    }

    /// Host-driven status change. Entering `Waiting` checkpoints the
    /// instance immediately.
    pub async fn change_status(&mut self, status: Status) -> Result<()> {
        self.status = status;
        if status == Status::Waiting {
            self.save_point().await?;
        }
        Ok(())
    }

    /// Drive the walk depth-first from the given ready tasks until every
    /// branch has completed or deferred.
    async fn advance(&mut self, pending: Vec<TaskId>) -> Result<()> {
        let mut stack = pending;
        stack.reverse();

        while let Some(task_id) = stack.pop() {
            let outcome = match self.execute_node(task_id).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.status = Status::Failed;
                    error!(instance_id = %self.id, task_id, error = %err, "task execution failed");
                    return Err(err);
                }
            };

            match outcome {
                Outcome::Deferred => {
                    debug!(instance_id = %self.id, task_id, "task deferred, branch suspended");
                }
                Outcome::Completed => {
                    let ready = match self.complete_node(task_id).await {
                        Ok(ready) => ready,
                        Err(err @ EngineError::Execution { .. }) => {
                            self.status = Status::Failed;
                            error!(instance_id = %self.id, task_id, error = %err, "task completion failed");
                            return Err(err);
                        }
                        Err(err) => return Err(err),
                    };
                    for id in ready.into_iter().rev() {
                        stack.push(id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn execute_node(&mut self, task_id: TaskId) -> Result<Outcome> {
        let def = Arc::clone(&self.def);
        let task = def.task(task_id)?;
        self.notify_before(task);
        debug!(instance_id = %self.id, task = %task.label(), "executing task");

        let behavior = self.ctx.registry.behavior_for(&task.kind);
        let mut scope = ExecutionScope {
            instance_id: self.id,
            variables: &mut self.variables,
            actions: &self.ctx.actions,
        };
        behavior
            .run(task, &mut scope)
            .await
            .map_err(|source| EngineError::Execution {
                task: task.label(),
                source,
            })
    }

    /// The synchronization point of the walk: emit `after`, drop the node
    /// from the pool, then fire outgoing flows. A decision destination fires
    /// on any single arrival; every other destination waits until all of its
    /// declared incoming flows have fired once. Re-entrant edges (loops) are
    /// not supported: the arrival counter is never reset.
    async fn complete_node(&mut self, task_id: TaskId) -> Result<Vec<TaskId>> {
        let def = Arc::clone(&self.def);
        let task = def.task(task_id)?;
        self.notify_after(task);
        self.node_pool.remove(&task_id);
        debug!(instance_id = %self.id, task = %task.label(), "task completed");

        let mut ready = Vec::new();
        for &flow_id in &task.outgoing {
            let flow = def.flow(flow_id)?;

            // A decision with several outgoing flows takes only those whose
            // condition holds; everything else fans out unconditionally.
            if task.kind.is_decision() && task.outgoing.len() > 1 {
                let condition = flow.condition.as_ref().ok_or_else(|| {
                    EngineError::validation(format!(
                        "decision task `{}` has an unconditional outgoing flow",
                        task.label()
                    ))
                })?;
                let taken =
                    condition
                        .evaluate(&self.variables)
                        .map_err(|source| EngineError::Execution {
                            task: task.label(),
                            source,
                        })?;
                if !taken {
                    continue;
                }
            }

            let destination = def.task(flow.to)?;
            let node = self
                .node_pool
                .entry(flow.to)
                .or_insert_with(|| ExecutionNode::new(flow.to));
            node.incoming_flow_completed += 1;
            let arrived = node.incoming_flow_completed as usize;

            let fires = if destination.kind.is_decision() {
                // One of the conditions feeding this decision held, so it
                // runs now; waiting on the rest would deadlock the branch.
                true
            } else {
                arrived == destination.incoming.len()
            };
            if fires {
                ready.push(flow.to);
            }
        }

        if task.kind.is_end() {
            self.status = Status::Completed;
            info!(instance_id = %self.id, definition = %self.def.name, "process instance completed");
            self.notify_ended();
            self.save_point().await?;
        }

        Ok(ready)
    }

    /// Checkpoint: serialize and upsert through the instance store.
    pub async fn save_point(&self) -> Result<InstanceRecord> {
        let record = self.serialize();
        self.ctx
            .instances
            .upsert(&record)
            .await
            .map_err(|source| EngineError::Persistence { source })?;
        debug!(instance_id = %self.id, status = ?self.status, "checkpoint saved");
        Ok(record)
    }

    pub fn serialize(&self) -> InstanceRecord {
        let mut node_pool: Vec<NodeRecord> = self
            .node_pool
            .values()
            .map(|node| NodeRecord {
                process_instance: self.id,
                task: node.task,
                incoming_flow_completed: node.incoming_flow_completed,
            })
            .collect();
        node_pool.sort_by_key(|record| record.task);

        InstanceRecord {
            id: self.id,
            def: (*self.def).clone(),
            status: self.status,
            node_pool,
            variables: self.variables.clone(),
        }
    }

    /// Rebuild an instance from a checkpoint, re-attaching pooled nodes to
    /// the definition's tasks.
    pub(crate) fn restore(record: InstanceRecord, ctx: Arc<EngineContext>) -> Result<Self> {
        record.def.validate()?;
        let def = Arc::new(record.def);

        let mut node_pool = HashMap::new();
        for node in &record.node_pool {
            if !def.tasks.contains_key(&node.task) {
                return Err(EngineError::validation(format!(
                    "node pool references unknown task {}",
                    node.task
                )));
            }
            node_pool.insert(
                node.task,
                ExecutionNode {
                    task: node.task,
                    incoming_flow_completed: node.incoming_flow_completed,
                },
            );
        }

        Ok(Self {
            id: record.id,
            def,
            status: record.status,
            variables: record.variables,
            node_pool,
            observers: Vec::new(),
            ctx,
        })
    }

    fn notify_before(&self, task: &Task) {
        for observer in &self.observers {
            observer.before_task(task);
        }
    }

    fn notify_after(&self, task: &Task) {
        for observer in &self.observers {
            observer.after_task(task);
        }
    }

    fn notify_ended(&self) {
        for observer in &self.observers {
            observer.ended();
        }
    }
}
