use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::poll::{PollConfig, PollOverrides};

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Applied field by field over the per-kind poll defaults.
    pub poll: PollOverrides,
    pub user_id: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(20),
            poll: PollOverrides::default(),
            user_id: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("JOBCLIENT_BASE_URL")
            .context("Missing required env var: JOBCLIENT_BASE_URL")?;

        // Tiny sanity checks (fail fast, fail loud)
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            bail!("JOBCLIENT_BASE_URL must start with http:// or https://");
        }

        let mut cfg = Self::new(base_url.trim_end_matches('/'));

        if let Some(secs) = parse_u64(&lookup, "JOBCLIENT_REQUEST_TIMEOUT_SECS")? {
            cfg.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_u64(&lookup, "JOBCLIENT_CONNECT_TIMEOUT_SECS")? {
            cfg.connect_timeout = Duration::from_secs(secs);
        }

        let interval = parse_u64(&lookup, "JOBCLIENT_POLL_INTERVAL_MS")?.map(Duration::from_millis);
        let deadline = parse_u64(&lookup, "JOBCLIENT_POLL_DEADLINE_SECS")?.map(Duration::from_secs);
        cfg.poll = PollOverrides::new(interval, deadline).context("Invalid poll settings")?;

        cfg.user_id = lookup("JOBCLIENT_USER_ID").filter(|v| !v.trim().is_empty());

        Ok(cfg)
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match lookup(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{key} must be a non-negative integer, got {v:?}")),
    }
}
