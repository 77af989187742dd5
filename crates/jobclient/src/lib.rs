//! Client for long-running backend jobs.
//!
//! Submit a unit of work, poll its status at a fixed interval under a
//! deadline, then interpret the final payload into an [`Outcome`].

mod backend;
mod client;
mod config;
mod credits;
mod error;
mod http;
mod interpret;
mod poll;
mod request;
mod types;

pub use backend::JobBackend;
pub use client::JobClient;
pub use config::ClientConfig;
pub use credits::{CreditsCheck, SubscriptionStatus};
pub use error::{BackendError, PollConfigError, PollError, RunError, SubmissionError};
pub use http::HttpJobBackend;
pub use interpret::{
    interpret, stage_label, user_message, Failure, Outcome, BULK_FAILURE_GUIDANCE, GENERIC_FAILURE,
    NO_OUTPUT_GUIDANCE,
};
pub use poll::{PollConfig, PollEvent, PollOverrides, PollState, StatusPoller};
pub use request::{
    AvatarBatch, ImageToImage, JobRequest, TextToImage, VideoFilter, MAX_BATCH_SOURCES, MAX_VARIANTS_PER_IMAGE,
    MIN_BATCH_SOURCES, MIN_VARIANTS_PER_IMAGE,
};
pub use types::{
    BatchItem, BatchSummary, GenerationMeta, JobHandle, JobKind, JobState, JobStatus, ResultPayload, SubmitAccepted,
};
