use {
    async_trait::async_trait,
    reqwest::{
        Client, Url,
        multipart::{Form, Part},
    },
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    payload::{FileUpload, WebhookPayload},
};

/// What the destination reports back after a file upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub id: Option<String>,
    /// URLs of the stored attachments, in upload order.
    pub attachment_urls: Vec<String>,
}

/// Delivery of payloads to a webhook URL.
///
/// One attempt per call; implementations never retry.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POST a JSON payload.
    async fn send_json(&self, url: &str, payload: &WebhookPayload) -> Result<()>;

    /// POST a multipart request with `payload_json` and one file part.
    async fn send_file(
        &self,
        url: &str,
        payload: &WebhookPayload,
        file: FileUpload,
    ) -> Result<DeliveredMessage>;
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attachments: Vec<CreatedAttachment>,
}

#[derive(Debug, Deserialize)]
struct CreatedAttachment {
    url: String,
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpWebhook {
    client: Client,
}

impl HttpWebhook {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Ask the destination to answer with the created message.
fn wait_url(url: &str) -> Result<Url> {
    let mut parsed = Url::parse(url).map_err(|_| Error::InvalidUrl {
        url: redact(url),
    })?;
    if !parsed.query_pairs().any(|(k, _)| k == "wait") {
        parsed.query_pairs_mut().append_pair("wait", "true");
    }
    Ok(parsed)
}

/// Webhook URLs embed their token in the path; keep only the origin.
fn redact(url: &str) -> String {
    Url::parse(url)
        .map(|u| format!("{}://{}/…", u.scheme(), u.host_str().unwrap_or_default()))
        .unwrap_or_else(|_| "<unparseable>".into())
}

#[async_trait]
impl WebhookTransport for HttpWebhook {
    async fn send_json(&self, url: &str, payload: &WebhookPayload) -> Result<()> {
        let target = Url::parse(url).map_err(|_| Error::InvalidUrl { url: redact(url) })?;
        let response = self.client.post(target).json(payload).send().await?;
        let response = Self::check(response).await?;
        debug!(status = %response.status(), embeds = payload.embeds().len(), "webhook json delivered");
        Ok(())
    }

    async fn send_file(
        &self,
        url: &str,
        payload: &WebhookPayload,
        file: FileUpload,
    ) -> Result<DeliveredMessage> {
        let filename = file.filename.clone();
        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .text("payload_json", serde_json::to_string(payload)?)
            .part("files[0]", part);

        let response = self
            .client
            .post(wait_url(url)?)
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body = response.text().await?;
        debug!(filename = %filename, "webhook file delivered");

        // An empty or unexpected body still means the upload succeeded.
        let created: Option<CreatedMessage> = serde_json::from_str(&body).ok();
        Ok(created
            .map(|m| DeliveredMessage {
                id: m.id,
                attachment_urls: m.attachments.into_iter().map(|a| a.url).collect(),
            })
            .unwrap_or_default())
    }
}
