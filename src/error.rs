use thiserror::Error;
use uuid::Uuid;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Error taxonomy of the engine.
///
/// Build and import problems surface as `Validation` before anything runs.
/// `Execution` carries a failure reported by a task behavior or a flow
/// condition; the owning instance is left in `Failed`. `Persistence` wraps a
/// storage collaborator failure unchanged. Lookups against unknown ids fail
/// with `NotFound` instead of proceeding on an absent node.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid definition: {0}")]
    Validation(String),

    #[error("task `{task}` failed")]
    Execution {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage failure")]
    Persistence {
        #[source]
        source: anyhow::Error,
    },

    #[error("{kind} `{key}` not found")]
    NotFound { kind: &'static str, key: String },

    #[error("process instance {0} has already been started")]
    AlreadyStarted(Uuid),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}
