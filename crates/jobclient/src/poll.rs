//! Fixed-interval status polling under a wall-clock deadline.
//!
//! A [`StatusPoller`] is a lazy, finite sequence: every call to
//! [`StatusPoller::next`] performs at most one status request and yields what
//! it saw. The sequence ends after a terminal status, a timeout, or
//! cancellation, and cannot be restarted.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::JobBackend;
use crate::error::{BackendError, PollConfigError, PollError};
use crate::types::{JobHandle, JobKind, JobState, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    deadline: Duration,
}

impl PollConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);
    pub const MEDIA_INTERVAL: Duration = Duration::from_millis(800);

    pub fn new(interval: Duration, deadline: Duration) -> Result<Self, PollConfigError> {
        if interval.is_zero() {
            return Err(PollConfigError::ZeroInterval);
        }
        if deadline.is_zero() {
            return Err(PollConfigError::ZeroDeadline);
        }
        Ok(Self { interval, deadline })
    }

    pub fn for_kind(kind: JobKind) -> Self {
        let interval = match kind {
            JobKind::VideoFilter => Self::MEDIA_INTERVAL,
            _ => Self::DEFAULT_INTERVAL,
        };
        Self { interval, deadline: Self::DEFAULT_DEADLINE }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: Self::DEFAULT_INTERVAL, deadline: Self::DEFAULT_DEADLINE }
    }
}

/// Poll settings set by the caller, layered field by field over [`PollConfig::for_kind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOverrides {
    interval: Option<Duration>,
    deadline: Option<Duration>,
}

impl PollOverrides {
    pub fn new(interval: Option<Duration>, deadline: Option<Duration>) -> Result<Self, PollConfigError> {
        if interval.is_some_and(|d| d.is_zero()) {
            return Err(PollConfigError::ZeroInterval);
        }
        if deadline.is_some_and(|d| d.is_zero()) {
            return Err(PollConfigError::ZeroDeadline);
        }
        Ok(Self { interval, deadline })
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn is_empty(&self) -> bool {
        self.interval.is_none() && self.deadline.is_none()
    }

    pub fn apply(&self, base: PollConfig) -> PollConfig {
        PollConfig {
            interval: self.interval.unwrap_or(base.interval),
            deadline: self.deadline.unwrap_or(base.deadline),
        }
    }
}

impl From<PollConfig> for PollOverrides {
    fn from(cfg: PollConfig) -> Self {
        Self { interval: Some(cfg.interval), deadline: Some(cfg.deadline) }
    }
}

/// Where a poll loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Running,
    Done,
    Error,
    TimedOut,
    Cancelled,
}

impl PollState {
    pub fn is_final(self) -> bool {
        !matches!(self, PollState::Pending | PollState::Running)
    }

    /// Transition on a successfully decoded status. Final states absorb.
    pub fn observe(self, state: JobState) -> PollState {
        if self.is_final() {
            return self;
        }
        match state {
            JobState::Pending | JobState::Running => PollState::Running,
            JobState::Done => PollState::Done,
            JobState::Error => PollState::Error,
        }
    }
}

/// One step of the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Pending or Running; another poll follows after the interval.
    Progress(JobStatus),
    /// Done or Error. Last event.
    Terminal(JobStatus),
    /// Deadline elapsed. Carries the most recent status, if one was ever read.
    TimedOut { last: Option<JobStatus> },
    /// Caller cancelled. No final status.
    Cancelled,
}

pub struct StatusPoller<'a, B: ?Sized> {
    backend: &'a B,
    handle: &'a JobHandle,
    config: PollConfig,
    cancel: CancellationToken,
    state: PollState,
    started: Option<Instant>,
    sleep_first: bool,
    requests: u32,
    last: Option<JobStatus>,
    last_error: Option<String>,
}

impl<'a, B: JobBackend + ?Sized> StatusPoller<'a, B> {
    pub fn new(backend: &'a B, handle: &'a JobHandle, config: PollConfig, cancel: CancellationToken) -> Self {
        Self {
            backend,
            handle,
            config,
            cancel,
            state: PollState::Pending,
            started: None,
            sleep_first: false,
            requests: 0,
            last: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Status requests issued so far, failed ones included.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn last_status(&self) -> Option<&JobStatus> {
        self.last.as_ref()
    }

    /// Advance to the next event. `None` once a final event has been yielded.
    ///
    /// The deadline clock starts on the first call, not at submission.
    pub async fn next(&mut self) -> Option<PollEvent> {
        if self.state.is_final() {
            return None;
        }
        let started = *self.started.get_or_insert_with(Instant::now);

        loop {
            if self.sleep_first {
                if self.cancel.is_cancelled() {
                    return Some(self.cancelled());
                }
                let cancel = self.cancel.clone();
                tokio::select! {
                    _ = cancel.cancelled() => return Some(self.cancelled()),
                    _ = sleep(self.config.interval) => {}
                }
                self.sleep_first = false;
            }

            if started.elapsed() >= self.config.deadline {
                return Some(self.timed_out());
            }
            if self.cancel.is_cancelled() {
                return Some(self.cancelled());
            }

            self.requests += 1;
            let res = self.backend.fetch_status(self.handle).await;

            // The request ran to completion; its result is dropped if we were cancelled meanwhile.
            if self.cancel.is_cancelled() {
                return Some(self.cancelled());
            }

            self.sleep_first = true;
            match res {
                Ok(status) => {
                    self.state = self.state.observe(status.state);
                    debug!(
                        job_id = %self.handle.id,
                        state = ?status.state,
                        stage = status.stage.as_deref().unwrap_or("-"),
                        attempt = self.requests,
                        "poll: status"
                    );
                    self.last = Some(status.clone());
                    if status.is_terminal() {
                        info!(job_id = %self.handle.id, state = ?status.state, "poll: terminal");
                        return Some(PollEvent::Terminal(status));
                    }
                    return Some(PollEvent::Progress(status));
                }
                Err(e) => {
                    // Everything is retried until the deadline, undecodable replies included.
                    if matches!(e, BackendError::Decode(_)) {
                        warn!(job_id = %self.handle.id, attempt = self.requests, "poll: undecodable status reply: {e}");
                    } else {
                        warn!(job_id = %self.handle.id, attempt = self.requests, "poll: status request failed: {e}");
                    }
                    self.last_error = Some(e.to_string());
                }
            }
        }
    }

    /// Drive the sequence to its end.
    ///
    /// On timeout the last observed (non-terminal) status is returned so callers
    /// can show partial progress; only a timeout with nothing observed is an error.
    pub async fn finish(mut self) -> Result<JobStatus, PollError> {
        while let Some(event) = self.next().await {
            match event {
                PollEvent::Progress(_) => continue,
                PollEvent::Terminal(status) => return Ok(status),
                PollEvent::TimedOut { last: Some(status) } => return Ok(status),
                PollEvent::TimedOut { last: None } => {
                    return Err(PollError::TimedOut {
                        after: self.config.deadline,
                        last_error: self.last_error.take(),
                    })
                }
                PollEvent::Cancelled => return Err(PollError::Cancelled),
            }
        }
        // Already drained before this call.
        match self.state {
            PollState::Done | PollState::Error | PollState::TimedOut => {
                self.last.take().ok_or(PollError::TimedOut {
                    after: self.config.deadline,
                    last_error: self.last_error.take(),
                })
            }
            _ => Err(PollError::Cancelled),
        }
    }

    fn timed_out(&mut self) -> PollEvent {
        self.state = PollState::TimedOut;
        warn!(
            job_id = %self.handle.id,
            deadline = ?self.config.deadline,
            observed = self.last.is_some(),
            "poll: deadline elapsed"
        );
        PollEvent::TimedOut { last: self.last.clone() }
    }

    fn cancelled(&mut self) -> PollEvent {
        self.state = PollState::Cancelled;
        info!(job_id = %self.handle.id, "poll: cancelled");
        PollEvent::Cancelled
    }
}
