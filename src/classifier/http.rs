use super::{ClassificationResult, ImageClassifier};
use crate::error::ClassifierError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Client for the remote `/predict` endpoint.
///
/// Calls are never retried here: a repeated prediction could end up as a
/// duplicate reply further down the pipeline.
pub struct HttpClassifier {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sutaba/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { endpoint, client }
    }
}

#[async_trait]
impl ImageClassifier for HttpClassifier {
    async fn predict(&self, image: Vec<u8>) -> Result<ClassificationResult, ClassifierError> {
        let size = image.len();
        let mime = image_mime(&image);
        let part = Part::bytes(image).file_name("image").mime_str(mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let result: ClassificationResult = serde_json::from_slice(&body)?;
        debug!(size, mime, pred = %result.pred, confidence = %result.confidence, "Image classified");
        Ok(result)
    }
}

/// Sniff the content type from the image's magic bytes.
fn image_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}
