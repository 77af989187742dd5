use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::JobBackend;
use crate::config::ClientConfig;
use crate::credits::{CreditsCheck, SubscriptionStatus};
use crate::error::BackendError;
use crate::request::JobRequest;
use crate::types::{JobHandle, JobStatus, SubmitAccepted};

/// [`JobBackend`] over the product's JSON HTTP API.
#[derive(Clone, Debug)]
pub struct HttpJobBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpJobBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn from_config(cfg: &ClientConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .connect_timeout(cfg.connect_timeout)
            .build()
            .map_err(BackendError::from_reqwest)?;
        Ok(Self::with_client(cfg.base_url.clone(), client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
        let status = resp.status();
        let url = resp.url().to_string();
        let body = resp.text().await.map_err(BackendError::from_reqwest)?;
        debug!(status = status.as_u16(), url = %url, body = %body, "backend response");

        if !status.is_success() {
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobBackend for HttpJobBackend {
    async fn submit(&self, request: &JobRequest) -> Result<SubmitAccepted, BackendError> {
        let body = request.body().map_err(|e| BackendError::Decode(e.to_string()))?;
        let resp = self
            .client
            .post(self.url(request.kind().submit_path()))
            .json(&body)
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;
        Self::read_json(resp).await
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, BackendError> {
        let resp = self
            .client
            .get(self.url(handle.kind.status_path()))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("job_id", handle.id.as_str())])
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;
        Self::read_json(resp).await
    }

    async fn check_credits(
        &self,
        operation_type: &str,
        user_id: Option<&str>,
    ) -> Result<CreditsCheck, BackendError> {
        let mut body = serde_json::json!({ "operation_type": operation_type });
        if let Some(uid) = user_id {
            body["user_id"] = serde_json::Value::from(uid);
        }
        let resp = self
            .client
            .post(self.url("/ai/credits/check"))
            .json(&body)
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;
        Self::read_json(resp).await
    }

    async fn subscription_status(&self, user_id: Option<&str>) -> Result<SubscriptionStatus, BackendError> {
        let mut req = self.client.get(self.url("/ai/subscription/status"));
        if let Some(uid) = user_id {
            req = req.query(&[("user_id", uid)]);
        }
        let resp = req.send().await.map_err(BackendError::from_reqwest)?;
        Self::read_json(resp).await
    }
}
