//! Typed errors at each component boundary, generalizing the teacher's
//! scheduler-local `ScheduleError` to the whole daemon set.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store is unavailable: {0}")]
    Unavailable(String),
    #[error("task {0} not found")]
    TaskNotFound(String),
    #[error("node {0} not found")]
    NodeNotFound(String),
    #[error("autoscale request {0} not found")]
    RequestNotFound(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CloudError {
    #[error("transient cloud unavailability: {0}")]
    Unavailable(String),
    #[error("cloud operation failed: {0}")]
    Cloud(String),
    #[error("cloud operation timed out")]
    Timeout,
    #[error("task is already bound to a different node")]
    AlreadyBound,
    #[error("node is cordoned and cannot accept new bindings")]
    NodeCordoned,
}

impl CloudError {
    /// Only `Unavailable` is retried with backoff (§4.A); every other variant
    /// surfaces immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Unavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum PackerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cloud(#[from] CloudError),
}

#[derive(Debug, Error)]
pub enum AutoscalerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error("flavor catalog is empty")]
    EmptyFlavorCatalog,
    #[error("flavor {0:?} has non-positive price or capacity")]
    InvalidFlavor(String),
}

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CleanerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error("migration of task {0:?} failed: {1}")]
    MigrationFailed(String, String),
}
