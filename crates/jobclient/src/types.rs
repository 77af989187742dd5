use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which backend pipeline a job runs on. Decides the submit and status endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    TextToImage,
    ImageToImage,
    AvatarBatch,
    VideoFilter,
}

impl JobKind {
    pub fn submit_path(self) -> &'static str {
        match self {
            JobKind::TextToImage => "/ai/generate/text",
            JobKind::ImageToImage => "/ai/generate/image",
            JobKind::AvatarBatch => "/ai/generate/batch",
            JobKind::VideoFilter => "/media/filter/video",
        }
    }

    pub fn status_path(self) -> &'static str {
        match self {
            JobKind::VideoFilter => "/media/filter/status",
            _ => "/ai/status",
        }
    }

    /// `operation_type` understood by the credits endpoint. Media jobs are not metered.
    pub fn credits_operation(self) -> Option<&'static str> {
        match self {
            JobKind::TextToImage => Some("text_to_image"),
            JobKind::ImageToImage => Some("image_to_image"),
            JobKind::AvatarBatch => Some("avatar_batch"),
            JobKind::VideoFilter => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::TextToImage => "text_to_image",
            JobKind::ImageToImage => "image_to_image",
            JobKind::AvatarBatch => "avatar_batch",
            JobKind::VideoFilter => "video_filter",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted unit of work. Owned by the caller until a terminal state is seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub id: String,
    pub kind: JobKind,
    pub status_url: Option<String>,
}

/// Successful reply of a submit endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAccepted {
    #[serde(default = "default_ok")]
    pub ok: bool,
    pub job_id: String,
    pub status_url: Option<String>,
}

fn default_ok() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum JobState {
    Pending,
    Running,
    Done,
    Error,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Error)
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobState::Pending),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => Ok(JobState::Done),
            "ERROR" => Ok(JobState::Error),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

impl TryFrom<String> for JobState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationMeta {
    pub model: Option<String>,
    pub aspect_ratio: Option<String>,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchItem {
    pub source_image_url: String,
    #[serde(default)]
    pub generated_images: Vec<String>,
    pub meta: Option<GenerationMeta>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub count_sources: u32,
    pub variants_per_image: u32,
    pub total_generated: u32,
}

/// Output of a finished job, in one of the shapes the backend produces.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ResultPayload {
    /// Text-to-image and image-to-image.
    Single {
        images: Vec<String>,
        provider: Option<String>,
        meta: Option<GenerationMeta>,
    },
    /// Avatar batch: one entry per source photo.
    Batch {
        items: Vec<BatchItem>,
        summary: Option<BatchSummary>,
    },
    /// Media toolbox jobs (video filter).
    Media { output_url: String },
}

impl ResultPayload {
    /// Number of usable outputs. The batch summary wins over counting items.
    pub fn produced_count(&self) -> usize {
        match self {
            ResultPayload::Single { images, .. } => images.len(),
            ResultPayload::Batch { summary: Some(s), .. } => s.total_generated as usize,
            ResultPayload::Batch { items, summary: None } => {
                items.iter().map(|i| i.generated_images.len()).sum()
            }
            ResultPayload::Media { .. } => 1,
        }
    }

    pub fn output_urls(&self) -> Vec<&str> {
        match self {
            ResultPayload::Single { images, .. } => images.iter().map(String::as_str).collect(),
            ResultPayload::Batch { items, .. } => items
                .iter()
                .flat_map(|i| i.generated_images.iter().map(String::as_str))
                .collect(),
            ResultPayload::Media { output_url } => vec![output_url.as_str()],
        }
    }

    /// Batch entries the backend reported an error for.
    pub fn failed_items(&self) -> Vec<&BatchItem> {
        match self {
            ResultPayload::Batch { items, .. } => items.iter().filter(|i| i.error.is_some()).collect(),
            _ => Vec::new(),
        }
    }

    fn from_wire(raw: WireResult) -> Option<Self> {
        if raw.items.is_some() || raw.summary.is_some() {
            return Some(ResultPayload::Batch {
                items: raw.items.unwrap_or_default(),
                summary: raw.summary,
            });
        }
        if let Some(images) = raw.images {
            return Some(ResultPayload::Single { images, provider: raw.provider, meta: raw.meta });
        }
        raw.output_url
            .filter(|u| !u.is_empty())
            .map(|output_url| ResultPayload::Media { output_url })
    }
}

/// One observation of a job, decoded from the status endpoint.
///
/// Serializes back into the status endpoint's shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "WireStatus", into = "WireStatus")]
pub struct JobStatus {
    pub job_id: String,
    pub state: JobState,
    /// Advisory only; never drives control flow.
    pub stage: Option<String>,
    pub progress: Option<u8>,
    pub result: Option<ResultPayload>,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireStatus {
    job_id: String,
    status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<WireResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// Every field optional: the backend mixes shapes and media jobs report
// progress inside `result` while still running.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<GenerationMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Vec<BatchItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<BatchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
}

impl From<WireStatus> for JobStatus {
    fn from(w: WireStatus) -> Self {
        let raw = w.result.unwrap_or_default();
        let progress = raw.progress;
        let stage = w.stage.or_else(|| raw.stage.clone());
        let result = if w.status == JobState::Done { ResultPayload::from_wire(raw) } else { None };

        JobStatus {
            job_id: w.job_id,
            state: w.status,
            stage,
            progress,
            result,
            error: w.error.filter(|e| !e.trim().is_empty()),
        }
    }
}

impl From<JobStatus> for WireStatus {
    fn from(s: JobStatus) -> Self {
        let mut raw = WireResult { progress: s.progress, ..Default::default() };
        let has_result = s.result.is_some() || s.progress.is_some();
        match s.result {
            Some(ResultPayload::Single { images, provider, meta }) => {
                raw.images = Some(images);
                raw.provider = provider;
                raw.meta = meta;
            }
            Some(ResultPayload::Batch { items, summary }) => {
                raw.items = Some(items);
                raw.summary = summary;
            }
            Some(ResultPayload::Media { output_url }) => raw.output_url = Some(output_url),
            None => {}
        }

        WireStatus {
            job_id: s.job_id,
            status: s.state,
            stage: s.stage,
            result: has_result.then_some(raw),
            error: s.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(v: serde_json::Value) -> JobStatus {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_state_is_case_insensitive() {
        assert_eq!("done".parse::<JobState>().unwrap(), JobState::Done);
        assert_eq!("Running".parse::<JobState>().unwrap(), JobState::Running);
        assert!("FINISHED".parse::<JobState>().is_err());
    }

    #[test]
    fn test_unknown_state_fails_decoding() {
        let res: Result<JobStatus, _> =
            serde_json::from_value(json!({"ok": true, "job_id": "j1", "status": "PAUSED"}));
        assert!(res.is_err());
    }

    #[test]
    fn test_batch_result_decodes() {
        let st = decode(json!({
            "ok": true,
            "job_id": "j1",
            "status": "DONE",
            "stage": "done",
            "result": {
                "items": [
                    {"source_image_url": "https://a/1.jpg", "generated_images": ["https://o/1.png"]},
                    {"source_image_url": "https://a/2.jpg", "generated_images": [], "error": "no face"}
                ],
                "summary": {"count_sources": 2, "variants_per_image": 1, "total_generated": 1}
            }
        }));
        let result = st.result.unwrap();
        assert_eq!(result.produced_count(), 1);
        assert_eq!(result.failed_items().len(), 1);
        assert_eq!(result.output_urls(), vec!["https://o/1.png"]);
    }

    #[test]
    fn test_single_result_decodes() {
        let st = decode(json!({
            "ok": true,
            "job_id": "j2",
            "status": "done",
            "result": {"images": ["https://o/a.png", "https://o/b.png"], "provider": "fal",
                       "meta": {"model": "flux", "aspect_ratio": "1:1", "seed": 42}}
        }));
        match st.result {
            Some(ResultPayload::Single { images, provider, meta }) => {
                assert_eq!(images.len(), 2);
                assert_eq!(provider.as_deref(), Some("fal"));
                assert_eq!(meta.and_then(|m| m.seed), Some(42));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_media_progress_is_lifted_while_running() {
        let st = decode(json!({
            "ok": true,
            "job_id": "v1",
            "status": "RUNNING",
            "result": {"progress": 40, "stage": "encoding"}
        }));
        assert_eq!(st.progress, Some(40));
        assert_eq!(st.stage.as_deref(), Some("encoding"));
        assert!(st.result.is_none());
    }

    #[test]
    fn test_done_with_empty_result_has_no_payload() {
        let st = decode(json!({"ok": true, "job_id": "j3", "status": "DONE", "result": {}}));
        assert_eq!(st.state, JobState::Done);
        assert!(st.result.is_none());
    }

    #[test]
    fn test_status_serializes_in_wire_shape() {
        let running = decode(json!({
            "job_id": "v1", "status": "RUNNING", "stage": "encoding", "result": {"progress": 40}
        }));
        let v = serde_json::to_value(&running).unwrap();
        assert_eq!(v["status"], "RUNNING");
        assert_eq!(v["result"]["progress"], 40);
        assert_eq!(decode(v), running);

        let done = decode(json!({
            "job_id": "j1",
            "status": "DONE",
            "result": {
                "items": [{"source_image_url": "https://a/1.jpg", "generated_images": [], "error": "no face"}],
                "summary": {"count_sources": 1, "variants_per_image": 1, "total_generated": 0}
            },
            "error": "All batch items failed"
        }));
        assert_eq!(decode(serde_json::to_value(&done).unwrap()), done);

        let media = decode(json!({"job_id": "v2", "status": "DONE", "result": {"output_url": "https://o/v.mp4"}}));
        assert_eq!(decode(serde_json::to_value(&media).unwrap()), media);
    }

    #[test]
    fn test_kind_endpoints() {
        assert_eq!(JobKind::AvatarBatch.submit_path(), "/ai/generate/batch");
        assert_eq!(JobKind::AvatarBatch.status_path(), "/ai/status");
        assert_eq!(JobKind::VideoFilter.status_path(), "/media/filter/status");
        assert_eq!(JobKind::VideoFilter.credits_operation(), None);
    }
}
