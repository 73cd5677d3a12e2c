//! Runtime adapters and the submission-layer API.

pub mod api;
pub mod tokio_spawner;

pub use api::{SubmissionGate, Submitted, RESET_AUTHORITY};
pub use tokio_spawner::TokioSpawner;
