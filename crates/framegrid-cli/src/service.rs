//! Client for the highlight extraction service.
//!
//! The service owns everything video: it stores an upload, scores it and cuts
//! highlight clips plus one still frame per clip. Framegrid only needs the
//! frame references it returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use framegrid_core::ImageRef;
use reqwest::blocking::{multipart, Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Uploads and extraction can take a while on long videos.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

pub const DEFAULT_CLIP_COUNT: u32 = 4;
pub const DEFAULT_CLIP_DURATION: f64 = 2.0;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
}

/// Metadata of an uploaded video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
    pub frame_count: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: f64,
    pub duration: f64,
}

/// Clips and frames cut from one video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HighlightResult {
    pub video_id: String,
    #[serde(default)]
    pub highlight_videos: Vec<String>,
    #[serde(default)]
    pub highlight_images: Vec<ImageRef>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Blocking client for the service's two endpoints.
#[derive(Debug, Clone)]
pub struct HighlightService {
    client: Client,
    base: Url,
}

impl HighlightService {
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base
            .join(path)
            .map_err(|_| ServiceError::InvalidEndpoint(path.to_string()))
    }

    /// `POST api/upload-video` with the file as multipart field `file`.
    pub fn upload_video(&self, path: &Path) -> Result<VideoInfo, ServiceError> {
        let form = multipart::Form::new()
            .text("preserve_orientation", "true")
            .file("file", path)
            .map_err(|source| ServiceError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let url = self.endpoint("api/upload-video")?;
        debug!(%url, path = %path.display(), "uploading video");
        let response = self.client.post(url).multipart(form).send()?;
        let info: VideoInfo = parse_response(response)?;

        info!(
            video_id = %info.video_id,
            frames = info.frame_count,
            width = info.frame_width,
            height = info.frame_height,
            duration = info.duration,
            "video uploaded"
        );
        Ok(info)
    }

    /// `POST api/extract-highlights/{video_id}` with form fields `top_n` and
    /// `highlight_duration`.
    pub fn extract_highlights(
        &self,
        video_id: &str,
        clip_count: u32,
        clip_duration: f64,
    ) -> Result<HighlightResult, ServiceError> {
        let url = self.endpoint(&format!("api/extract-highlights/{video_id}"))?;
        let fields = [
            ("top_n", clip_count.to_string()),
            ("highlight_duration", clip_duration.to_string()),
        ];
        debug!(%url, clip_count, clip_duration, "extracting highlights");
        let response = self.client.post(url).form(&fields).send()?;
        let result: HighlightResult = parse_response(response)?;

        info!(
            video_id = %result.video_id,
            clips = result.highlight_videos.len(),
            frames = result.highlight_images.len(),
            "highlights extracted"
        );
        Ok(result)
    }
}

fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json()?);
    }
    let body = response.text().unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// The `error` field of a JSON error body, or the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
