use crate::definition::Task;

/// Observer of one instance's lifecycle. Delivery is synchronous, in
/// subscription order, from within the node operation that triggered the
/// event.
pub trait ProcessObserver: Send + Sync {
    /// A task is about to execute.
    fn before_task(&self, _task: &Task) {}

    /// A task finished and left the node pool.
    fn after_task(&self, _task: &Task) {}

    /// The end task completed; the instance is done.
    fn ended(&self) {}
}
