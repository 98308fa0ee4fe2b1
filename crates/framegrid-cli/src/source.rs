//! Image sources for frames published by the highlight service.
//!
//! The service hands out frame references such as
//! `/media/highlight_images/<video>/frame_3.jpg`, relative to its own base
//! URL. Users may also pass absolute URLs or local files.

use std::path::Path;
use std::time::Duration;

use framegrid_core::{FileSource, ImageRef, ImageSource, LoadError};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use tracing::trace;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches frames over HTTP without credentials.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(mut base: Url) -> Result<Self, reqwest::Error> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client, base })
    }

    /// Absolute URL for a reference.
    ///
    /// Service paths are appended to the base, keeping any path prefix it
    /// carries, so `/media/x.jpg` under `https://host/api/` is
    /// `https://host/api/media/x.jpg`.
    pub fn url_for(&self, image: &ImageRef) -> Result<Url, LoadError> {
        let raw = image.as_str();
        let parsed = if is_absolute_url(raw) {
            Url::parse(raw)
        } else {
            self.base.join(raw.trim_start_matches('/'))
        };
        parsed.map_err(|_| LoadError::Unsupported(image.clone()))
    }
}

impl ImageSource for HttpSource {
    fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, LoadError> {
        let url = self.url_for(image)?;
        trace!(%url, "fetching frame");

        let io = |err: reqwest::Error| LoadError::Io {
            image: image.clone(),
            message: err.to_string(),
        };
        let response = self.client.get(url).send().map_err(io)?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes().map_err(io)?.to_vec()),
            StatusCode::NOT_FOUND => Err(LoadError::NotFound(image.clone())),
            status => Err(LoadError::Http {
                image: image.clone(),
                status: status.as_u16(),
            }),
        }
    }
}

fn is_absolute_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

/// Where a reference is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Http,
    File,
}

/// Sends each reference to HTTP or the filesystem.
///
/// - `http://` and `https://` references go over HTTP
/// - references starting with `/` are local files when that file exists,
///   otherwise paths on the service
/// - anything else is a local file
#[derive(Debug, Clone)]
pub struct RoutingSource {
    http: HttpSource,
    files: FileSource,
}

impl RoutingSource {
    pub fn new(http: HttpSource, files: FileSource) -> Self {
        Self { http, files }
    }

    pub fn route(&self, image: &ImageRef) -> Route {
        let raw = image.as_str();
        let service_path = raw.starts_with('/') && !Path::new(raw).exists();
        if is_absolute_url(raw) || service_path {
            Route::Http
        } else {
            Route::File
        }
    }
}

impl ImageSource for RoutingSource {
    fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, LoadError> {
        match self.route(image) {
            Route::Http => self.http.fetch(image),
            Route::File => self.files.fetch(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http() -> HttpSource {
        HttpSource::new(Url::parse("http://localhost:8000/").unwrap()).unwrap()
    }

    #[test]
    fn test_relative_refs_join_base() {
        let url = http()
            .url_for(&ImageRef::from("/media/highlight_images/v1/frame_3.jpg"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/media/highlight_images/v1/frame_3.jpg"
        );
    }

    #[test]
    fn test_relative_refs_keep_base_path() {
        let nested = HttpSource::new(Url::parse("https://example.com/highlights/").unwrap()).unwrap();
        let url = nested
            .url_for(&ImageRef::from("/media/highlight_images/v1/frame_3.jpg"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/highlights/media/highlight_images/v1/frame_3.jpg"
        );

        let unslashed = HttpSource::new(Url::parse("https://example.com/highlights").unwrap()).unwrap();
        let url = unslashed.url_for(&ImageRef::from("media/f.jpg")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/highlights/media/f.jpg");
    }

    #[test]
    fn test_absolute_refs_kept() {
        let url = http()
            .url_for(&ImageRef::from("https://cdn.example.com/f.jpg"))
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/f.jpg");
    }

    #[test]
    fn test_routing() {
        let tmp = tempfile::tempdir().unwrap();
        let local = tmp.path().join("frame.jpg");
        std::fs::write(&local, b"x").unwrap();
        let source = RoutingSource::new(http(), FileSource::new());

        assert_eq!(
            source.route(&ImageRef::from("http://host/frame.jpg")),
            Route::Http
        );
        assert_eq!(
            source.route(&ImageRef::from("/media/highlight_images/nope/frame.jpg")),
            Route::Http
        );
        assert_eq!(
            source.route(&ImageRef::from(local.to_string_lossy().into_owned())),
            Route::File
        );
        assert_eq!(source.route(&ImageRef::from("frames/a.jpg")), Route::File);
    }

    #[test]
    fn test_local_file_fetched_through_router() {
        let tmp = tempfile::tempdir().unwrap();
        let local = tmp.path().join("frame.jpg");
        std::fs::write(&local, b"bytes").unwrap();
        let source = RoutingSource::new(http(), FileSource::new());

        let bytes = source
            .fetch(&ImageRef::from(local.to_string_lossy().into_owned()))
            .unwrap();
        assert_eq!(bytes, b"bytes");
    }
}
