use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;
use crate::types::JobKind;

pub const MIN_BATCH_SOURCES: usize = 15;
pub const MAX_BATCH_SOURCES: usize = 50;
pub const MIN_VARIANTS_PER_IMAGE: u32 = 1;
pub const MAX_VARIANTS_PER_IMAGE: u32 = 4;

/// Everything the client knows how to submit. Tagged by `kind` when read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobRequest {
    TextToImage(TextToImage),
    ImageToImage(ImageToImage),
    AvatarBatch(AvatarBatch),
    VideoFilter(VideoFilter),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToImage {
    pub prompt: String,
    #[serde(default = "square")]
    pub aspect_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageToImage {
    pub image_url: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default = "portrait")]
    pub aspect_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarBatch {
    pub image_urls: Vec<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default = "square")]
    pub aspect_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default = "one_variant")]
    pub variants_per_image: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFilter {
    pub url: String,
    pub preset: String,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

fn square() -> String {
    "1:1".to_string()
}

fn portrait() -> String {
    "3:4".to_string()
}

fn one_variant() -> u32 {
    1
}

fn default_intensity() -> f64 {
    0.7
}

impl TextToImage {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), aspect_ratio: square(), steps: None, seed: None }
    }
}

impl ImageToImage {
    pub fn new(image_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            prompt: prompt.into(),
            strength: None,
            aspect_ratio: portrait(),
            steps: None,
            seed: None,
        }
    }
}

impl AvatarBatch {
    pub fn new(image_urls: Vec<String>, prompt: impl Into<String>) -> Self {
        Self {
            image_urls,
            prompt: prompt.into(),
            strength: None,
            aspect_ratio: square(),
            steps: None,
            variants_per_image: one_variant(),
            seed: None,
        }
    }
}

impl VideoFilter {
    pub fn new(url: impl Into<String>, preset: impl Into<String>) -> Self {
        Self { url: url.into(), preset: preset.into(), intensity: default_intensity() }
    }
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::TextToImage(_) => JobKind::TextToImage,
            JobRequest::ImageToImage(_) => JobKind::ImageToImage,
            JobRequest::AvatarBatch(_) => JobKind::AvatarBatch,
            JobRequest::VideoFilter(_) => JobKind::VideoFilter,
        }
    }

    /// Client-side checks. Pure; never touches the network.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        match self {
            JobRequest::TextToImage(r) => non_empty("prompt", &r.prompt),
            JobRequest::ImageToImage(r) => {
                non_empty("image_url", &r.image_url)?;
                non_empty("prompt", &r.prompt)?;
                if let Some(s) = r.strength {
                    unit_range("strength", s)?;
                }
                Ok(())
            }
            JobRequest::AvatarBatch(r) => {
                let n = r.image_urls.len();
                if !(MIN_BATCH_SOURCES..=MAX_BATCH_SOURCES).contains(&n) {
                    return Err(invalid(format!(
                        "image_urls must contain {MIN_BATCH_SOURCES}-{MAX_BATCH_SOURCES} URLs, got {n}"
                    )));
                }
                if !(MIN_VARIANTS_PER_IMAGE..=MAX_VARIANTS_PER_IMAGE).contains(&r.variants_per_image) {
                    return Err(invalid(format!(
                        "variants_per_image must be {MIN_VARIANTS_PER_IMAGE}-{MAX_VARIANTS_PER_IMAGE}, got {}",
                        r.variants_per_image
                    )));
                }
                if let Some(s) = r.strength {
                    unit_range("strength", s)?;
                }
                Ok(())
            }
            JobRequest::VideoFilter(r) => {
                non_empty("url", &r.url)?;
                non_empty("preset", &r.preset)?;
                unit_range("intensity", r.intensity)
            }
        }
    }

    /// JSON body for the submit endpoint, without the `kind` tag.
    pub fn body(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            JobRequest::TextToImage(r) => serde_json::to_value(r),
            JobRequest::ImageToImage(r) => serde_json::to_value(r),
            JobRequest::AvatarBatch(r) => serde_json::to_value(r),
            JobRequest::VideoFilter(r) => serde_json::to_value(r),
        }
    }
}

fn invalid(reason: String) -> SubmissionError {
    SubmissionError::InvalidInput(reason)
}

fn non_empty(field: &str, value: &str) -> Result<(), SubmissionError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

fn unit_range(field: &str, value: f64) -> Result<(), SubmissionError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{field} must be between 0.0 and 1.0, got {value}")));
    }
    Ok(())
}
