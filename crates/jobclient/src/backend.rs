use async_trait::async_trait;

use crate::credits::{CreditsCheck, SubscriptionStatus};
use crate::error::BackendError;
use crate::request::JobRequest;
use crate::types::{JobHandle, JobStatus, SubmitAccepted};

/// The remote side of a job: one POST to create it, one GET per status read.
///
/// Implementations perform exactly one request per call and never retry;
/// retry policy belongs to the poller.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit(&self, request: &JobRequest) -> Result<SubmitAccepted, BackendError>;
    async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, BackendError>;
    async fn check_credits(
        &self,
        operation_type: &str,
        user_id: Option<&str>,
    ) -> Result<CreditsCheck, BackendError>;
    async fn subscription_status(&self, user_id: Option<&str>) -> Result<SubscriptionStatus, BackendError>;
}
