use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::JobBackend;
use crate::config::ClientConfig;
use crate::credits::SubscriptionStatus;
use crate::error::{BackendError, PollError, RunError, SubmissionError};
use crate::http::HttpJobBackend;
use crate::interpret::{interpret, Outcome};
use crate::poll::{PollConfig, PollOverrides, StatusPoller};
use crate::request::JobRequest;
use crate::types::{JobHandle, JobStatus};

/// Submit, poll and interpret jobs against one backend.
///
/// Holds no per-job state; clones share the backend and may drive
/// independent jobs concurrently.
pub struct JobClient<B: ?Sized = HttpJobBackend> {
    backend: Arc<B>,
    poll: PollOverrides,
    user_id: Option<String>,
}

impl<B: ?Sized> Clone for JobClient<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend), poll: self.poll, user_id: self.user_id.clone() }
    }
}

impl JobClient<HttpJobBackend> {
    pub fn from_config(cfg: &ClientConfig) -> Result<Self, BackendError> {
        let backend = HttpJobBackend::from_config(cfg)?;
        let mut client = Self::new(backend);
        client.poll = cfg.poll;
        client.user_id = cfg.user_id.clone();
        Ok(client)
    }
}

impl<B: JobBackend> JobClient<B> {
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }
}

impl<B: JobBackend + ?Sized> JobClient<B> {
    pub fn from_arc(backend: Arc<B>) -> Self {
        Self { backend, poll: PollOverrides::default(), user_id: None }
    }

    /// Use `poll` for every job, whatever its kind.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll.into();
        self
    }

    pub fn with_poll_overrides(mut self, poll: PollOverrides) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn poll_config_for(&self, handle: &JobHandle) -> PollConfig {
        self.poll.apply(PollConfig::for_kind(handle.kind))
    }

    /// Validate locally, then send exactly one create request. No retry.
    pub async fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmissionError> {
        let kind = request.kind();
        if let Err(e) = request.validate() {
            warn!(kind = %kind, "submit: rejected locally: {e}");
            return Err(e);
        }

        let accepted = self.backend.submit(request).await.map_err(|e| {
            warn!(kind = %kind, "submit: failed: {e}");
            SubmissionError::from(e)
        })?;

        if !accepted.ok {
            return Err(SubmissionError::ServerRejected {
                status: 200,
                body: format!("backend answered ok=false for job {}", accepted.job_id),
            });
        }
        if accepted.job_id.trim().is_empty() {
            return Err(SubmissionError::Decode("submit response carried an empty job_id".to_string()));
        }

        info!(kind = %kind, job_id = %accepted.job_id, "submit: accepted");
        Ok(JobHandle { id: accepted.job_id, kind, status_url: accepted.status_url })
    }

    /// Credits pre-flight. A refusal surfaces as [`SubmissionError::PaymentRequired`]
    /// so callers route it the same way as a 402 from the submit endpoint.
    pub async fn ensure_credits(&self, request: &JobRequest) -> Result<(), SubmissionError> {
        let Some(operation) = request.kind().credits_operation() else {
            return Ok(());
        };
        let check = self.backend.check_credits(operation, self.user_id.as_deref()).await?;
        if !check.can_proceed {
            info!(operation, remaining = check.credits_remaining, "credits: refused");
            return Err(SubmissionError::PaymentRequired { body: check.refusal() });
        }
        Ok(())
    }

    pub async fn subscription_status(&self) -> Result<SubscriptionStatus, BackendError> {
        self.backend.subscription_status(self.user_id.as_deref()).await
    }

    pub fn poller<'a>(&'a self, handle: &'a JobHandle, cancel: CancellationToken) -> StatusPoller<'a, B> {
        StatusPoller::new(&*self.backend, handle, self.poll_config_for(handle), cancel)
    }

    pub async fn poll(&self, handle: &JobHandle, cancel: CancellationToken) -> Result<JobStatus, PollError> {
        self.poller(handle, cancel).finish().await
    }

    /// Submit, poll to the end and interpret.
    pub async fn run(&self, request: &JobRequest, cancel: CancellationToken) -> Result<Outcome, RunError> {
        let handle = self.submit(request).await?;
        let status = self.poll(&handle, cancel).await?;
        Ok(interpret(&status))
    }
}
