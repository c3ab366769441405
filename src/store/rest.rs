use std::env;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::sse::{Mirror, RtdbEvent, SseDecoder};
use super::{RemoteStore, StoreError, StoreEvent, StorePath, Subscription};

#[derive(Clone, Debug)]
pub struct RtdbConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
}

impl RtdbConfig {
    /// `None` when `STORE_URL` is not set.
    pub fn new_from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("STORE_URL").filter(|url| !url.trim().is_empty())?;
        let auth_token = lookup("STORE_AUTH_TOKEN").filter(|t| !t.is_empty());
        Some(Self { base_url, auth_token })
    }
}

/// REST client for a hosted realtime database.
pub struct RtdbClient {
    client: Client,
    base: Url,
    config: RtdbConfig,
}

impl RtdbClient {
    pub fn new(config: RtdbConfig) -> Result<Self, StoreError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(config.base_url.clone()));
        }
        let client = Client::builder().build()?;
        Ok(Self { client, base, config })
    }

    /// `{base}/{segments...}.json?auth=token`, every segment percent-encoded.
    fn url(&self, path: &StorePath) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidUrl(self.config.base_url.clone()))?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{}.json", last));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        if let Some(token) = &self.config.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::PermissionDenied(body));
        }
        Err(StoreError::Rejected { status: status.as_u16(), body })
    }
}

#[async_trait]
impl RemoteStore for RtdbClient {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let response = self.client.get(self.url(path)?).send().await?;
        let value: Value = Self::check(response).await?.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let response = self
            .client
            .get(self.url(path)?)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        let response = Self::check(response).await?;
        info!("event stream open for {}", path);

        let (tx, rx) = mpsc::unbounded_channel();
        let stream_path = path.clone();
        let pump = tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut mirror = Mirror::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        error!("event stream for {} failed: {}", stream_path, e);
                        let _ = tx.send(StoreEvent::Failed(e.into()));
                        return;
                    }
                };

                for frame in decoder.push(&chunk) {
                    let event = match RtdbEvent::from_frame(&frame) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("ignoring unreadable {} event on {}: {}", frame.event, stream_path, e);
                            continue;
                        }
                    };
                    if let RtdbEvent::Unknown(name) = &event {
                        debug!("ignoring unknown event {} on {}", name, stream_path);
                    }
                    match mirror.apply(event) {
                        Ok(Some(snapshot)) => {
                            if tx.send(StoreEvent::Snapshot(snapshot)).is_err() {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!("event stream for {} ended: {}", stream_path, e);
                            let _ = tx.send(StoreEvent::Failed(e));
                            return;
                        }
                    }
                }
            }

            warn!("event stream for {} closed by server", stream_path);
            let _ = tx.send(StoreEvent::Failed(StoreError::Disconnected));
        });

        Ok(Subscription::new(path.clone(), rx).with_pump(pump.abort_handle()))
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let response = self.client.put(self.url(path)?).json(&value).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        let response = self.client.delete(self.url(path)?).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
