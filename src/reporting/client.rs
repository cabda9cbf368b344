use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};

use crate::{
    error::{TrackerError, TrackerResult},
    models::{CaptureEvent, TimeReport},
};

const SCREENSHOT_FILE_NAME: &str = "screenshot.png";

/// Transport to the recording service. No session knowledge, no retries.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn upload_screenshot(&self, event: &CaptureEvent) -> TrackerResult<()>;

    async fn send_time_report(&self, report: &TimeReport) -> TrackerResult<()>;
}

/// Text fields of the screenshot form, in the order they are sent.
pub fn screenshot_fields(event: &CaptureEvent) -> [(&'static str, String); 5] {
    [
        ("employeeId", event.employee_id.clone()),
        ("employeeName", event.employee_name.clone()),
        ("projectName", event.project_name.clone()),
        ("timestamp", event.timestamp.clone()),
        ("permission", "true".to_string()),
    ]
}

#[derive(Clone)]
pub struct HttpReporter {
    client: Client,
    base_url: String,
}

impl HttpReporter {
    pub fn new(base_url: &str, timeout: Duration) -> TrackerResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl Reporter for HttpReporter {
    async fn upload_screenshot(&self, event: &CaptureEvent) -> TrackerResult<()> {
        let file = Part::bytes(event.png_bytes.clone())
            .file_name(SCREENSHOT_FILE_NAME)
            .mime_str("image/png")?;
        let form = screenshot_fields(event)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
            .part("file", file);

        let response = self
            .client
            .post(self.url("screenshot"))
            .multipart(form)
            .send()
            .await?;
        ensure_success(response, "screenshot upload").await
    }

    async fn send_time_report(&self, report: &TimeReport) -> TrackerResult<()> {
        let response = self
            .client
            .post(self.url("time"))
            .json(report)
            .send()
            .await?;
        ensure_success(response, "time report").await
    }
}

async fn ensure_success(response: Response, what: &str) -> TrackerResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::TransportError(format!(
        "{what} rejected with {status}: {}",
        body.trim()
    )))
}
