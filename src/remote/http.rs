use super::protocol::{BlobRef, ErrorBody, PushAck, SyncPayload, SyncSnapshot};
use super::RemoteStore;
use crate::entity::{Project, ToolBlob};
use crate::error::SyncError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

/// [`RemoteStore`] over HTTP.
///
/// `base_url` is the API prefix, e.g. `http://localhost:8787/api`.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

/// Encode every segment of an object key, keeping `/` as the separator.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn check(resp: Response) -> Result<Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(SyncError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// A delete of something the remote never had is not an error.
async fn delete_idempotent(resp: Response) -> Result<(), SyncError> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(());
    }
    check(resp).await?;
    Ok(())
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, SyncError> {
        let url = self.url(&format!("/projects/{}", urlencoding::encode(id)));
        let resp = self.client.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp).await?.json().await?))
    }

    pub async fn get_tool(&self, id: &str) -> Result<Option<ToolBlob>, SyncError> {
        let url = self.url(&format!("/tools/{}", urlencoding::encode(id)));
        let resp = self.client.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp).await?.json().await?))
    }

    /// Fetch a stored blob, optionally a byte range `start..=end`.
    pub async fn fetch_blob(
        &self,
        key: &str,
        range: Option<(u64, Option<u64>)>,
    ) -> Result<Vec<u8>, SyncError> {
        let url = self.url(&format!("/images/{}", encode_key(key)));
        let mut req = self.client.get(&url);
        if let Some((start, end)) = range {
            let end = end.map(|e| e.to_string()).unwrap_or_default();
            req = req.header(RANGE, format!("bytes={}-{}", start, end));
        }
        let resp = check(req.send().await?).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    pub async fn delete_blob(&self, key: &str) -> Result<(), SyncError> {
        let url = self.url(&format!("/images/{}", encode_key(key)));
        delete_idempotent(self.client.delete(&url).send().await?).await
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn push(&self, payload: &SyncPayload) -> Result<PushAck, SyncError> {
        let url = self.url("/sync");
        debug!("POST {}", url);
        let resp = check(self.client.post(&url).json(payload).send().await?).await?;
        let ack: PushAck = resp.json().await?;
        if !ack.success {
            return Err(SyncError::Remote {
                status: StatusCode::OK.as_u16(),
                message: "remote reported failure".to_string(),
            });
        }
        Ok(ack)
    }

    async fn pull(&self) -> Result<SyncSnapshot, SyncError> {
        let url = self.url("/sync");
        debug!("GET {}", url);
        let resp = check(self.client.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn upload_blob(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<BlobRef, SyncError> {
        let url = self.url(&format!("/images/{}", encode_key(key)));
        debug!("PUT {} ({} bytes)", url, bytes.len());
        let resp = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn delete_project(&self, id: &str) -> Result<(), SyncError> {
        let url = self.url(&format!("/projects/{}", urlencoding::encode(id)));
        delete_idempotent(self.client.delete(&url).send().await?).await
    }

    async fn delete_inspiration(&self, id: &str) -> Result<(), SyncError> {
        let url = self.url(&format!("/inspirations/{}", urlencoding::encode(id)));
        delete_idempotent(self.client.delete(&url).send().await?).await
    }
}
