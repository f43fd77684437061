use crate::auth::AuthToken;
use crate::config::ServerApiConfig;
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Thin reqwest wrapper bound to one server origin and one (optional) credential.
pub struct HttpTransport {
    client: reqwest::Client,
    origin: Url,
    auth_token: Option<AuthToken>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ServerApiConfig, auth_token: Option<AuthToken>) -> Result<Self> {
        let origin = Url::parse(&config.origin).map_err(TransportError::InvalidUrl)?;

        // Only the connect phase is bounded at the client level; whole-request timeouts are
        // applied per call so streamed responses are not cut off.
        let client = reqwest::Client::builder()
            .connect_timeout(config.http_timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(TransportError::Http)?;

        Ok(Self {
            client,
            origin,
            auth_token,
            timeout: config.http_timeout,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.origin.join(path).map_err(TransportError::InvalidUrl)?)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token.as_str());
        }
        req
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::GET, self.url(path)?)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(TransportError::Http)?;

        Self::read_json(Self::check_status(response).await?).await
    }

    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, self.url(path)?)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(TransportError::Http)?;

        Self::read_json(Self::check_status(response).await?).await
    }

    /// POST and discard the response body; only the status matters.
    pub async fn post_empty(&self, path: &str, body: &Value) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, self.url(path)?)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(TransportError::Http)?;

        Self::check_status(response).await?;
        Ok(())
    }

    /// POST and hand back the raw response body as a byte stream.
    pub async fn post_stream(&self, path: &str, body: &Value) -> Result<BoxStream<'static, Bytes>> {
        let response = self
            .request(reqwest::Method::POST, self.url(path)?)
            .json(body)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let response = Self::check_status(response).await?;
        let byte_stream = response
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Box::pin(byte_stream))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let bytes = response.bytes().await.map_err(TransportError::Http)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Turn non-success statuses into [`Error::Api`], keeping the server's error code/message
    /// when the body carries `{ "error": { "code", "message" } }` (or a bare error string).
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<Value>(&body) {
            Ok(json) => match json.get("error") {
                Some(Value::Object(err)) => (
                    err.get("code").and_then(|c| c.as_str()).map(str::to_string),
                    err.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| body.clone()),
                ),
                Some(Value::String(msg)) => (None, msg.clone()),
                _ => (None, body.clone()),
            },
            Err(_) => (None, body.clone()),
        };

        let message = if message.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            message
        };

        Err(Error::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
