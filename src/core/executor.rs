//! Executor contract and the slot binding handed to it.

use async_trait::async_trait;

use crate::core::{AppResult, Credential, JobId, JobKind, SlotId, SubmitterId};

/// What the scheduler tells the executor about the slot a job was bound to.
///
/// The executor must use exactly this credential for its single upstream
/// attempt.
#[derive(Debug, Clone)]
pub struct SlotBinding {
    /// Job being executed.
    pub job_id: JobId,
    /// Submitter the job belongs to.
    pub submitter: SubmitterId,
    /// Submission path of the job.
    pub kind: JobKind,
    /// Credential slot held for the duration of the call.
    pub slot: SlotId,
    /// Credential behind the slot (`None` in credential-less mode).
    pub credential: Option<Credential>,
}

/// Performs the upstream request for one job.
///
/// Called at most once per job. Retries, if any, belong inside the
/// implementation; the scheduler treats an `Err` as final.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use credential_lot::core::{AppResult, JobExecutor, SlotBinding};
///
/// struct ImageExecutor;
///
/// #[async_trait]
/// impl JobExecutor<String, Vec<u8>> for ImageExecutor {
///     async fn execute(&self, prompt: String, binding: SlotBinding) -> AppResult<Vec<u8>> {
///         let token = binding.credential.as_ref().map(|c| c.expose().to_owned());
///         generate(prompt, token).await
///     }
/// }
/// ```
#[async_trait]
pub trait JobExecutor<P, R>: Send + Sync + 'static
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Run the job against the bound credential.
    async fn execute(&self, payload: P, binding: SlotBinding) -> AppResult<R>;
}
