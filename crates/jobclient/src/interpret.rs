//! Turns a final (or last seen) status into something a UI can show.

use serde::Serialize;

use crate::types::{JobState, JobStatus, ResultPayload};

pub const NO_OUTPUT_GUIDANCE: &str = "Generation completed but no images were created. \
Please try uploading different photos with clear face, good lighting, and single person per photo.";

pub const BULK_FAILURE_GUIDANCE: &str = "Generation failed. Some photos may not be suitable. \
Please try uploading different photos with clear face, good lighting, and single person per photo.";

pub const GENERIC_FAILURE: &str = "Generation failed";

/// Lowercase substrings that mark a backend error as a bulk input failure.
const BULK_FAILURE_PATTERNS: &[&str] = &["all batch items failed", "failed"];

/// User-facing text plus the untouched backend message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub message: String,
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success { result: ResultPayload },
    /// Finished without usable output.
    SoftFailure(Failure),
    /// The backend reported an error.
    HardFailure(Failure),
    /// Not finished yet (the poll deadline passed first). Check again later.
    Incomplete {
        state: JobState,
        stage: Option<String>,
        progress: Option<u8>,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::SoftFailure(f) | Outcome::HardFailure(f) => Some(f),
            _ => None,
        }
    }
}

/// Rewrite a raw backend error for display. Unknown wording passes through verbatim.
pub fn user_message(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if BULK_FAILURE_PATTERNS.iter().any(|p| lower.contains(p)) {
        BULK_FAILURE_GUIDANCE.to_string()
    } else {
        raw.to_string()
    }
}

pub fn interpret(status: &JobStatus) -> Outcome {
    match status.state {
        JobState::Pending | JobState::Running => Outcome::Incomplete {
            state: status.state,
            stage: status.stage.clone(),
            progress: status.progress,
        },
        JobState::Error => Outcome::HardFailure(hard(status.error.as_deref())),
        JobState::Done => match (&status.result, status.error.as_deref()) {
            (Some(result), _) if result.produced_count() > 0 => {
                Outcome::Success { result: result.clone() }
            }
            (Some(result), raw) => Outcome::SoftFailure(Failure {
                message: NO_OUTPUT_GUIDANCE.to_string(),
                raw: raw.map(str::to_string).or_else(|| item_errors(result)),
            }),
            (None, None) => Outcome::SoftFailure(Failure { message: NO_OUTPUT_GUIDANCE.to_string(), raw: None }),
            (None, Some(raw)) => Outcome::HardFailure(hard(Some(raw))),
        },
    }
}

/// Per-item backend errors of a batch, joined for diagnostics.
fn item_errors(result: &ResultPayload) -> Option<String> {
    let errors: Vec<&str> = result.failed_items().into_iter().filter_map(|i| i.error.as_deref()).collect();
    (!errors.is_empty()).then(|| errors.join("; "))
}

fn hard(raw: Option<&str>) -> Failure {
    match raw {
        Some(raw) => Failure { message: user_message(raw), raw: Some(raw.to_string()) },
        None => Failure { message: GENERIC_FAILURE.to_string(), raw: None },
    }
}

/// Display copy for the advisory `stage` string.
pub fn stage_label(stage: &str) -> &'static str {
    match stage.to_ascii_lowercase().as_str() {
        "queued" => "Queued...",
        "running" => "Generating...",
        "uploading" => "Uploading results...",
        "done" => "Complete!",
        "error" => "Error occurred",
        _ => "Processing...",
    }
}
