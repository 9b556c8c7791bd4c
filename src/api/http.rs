//! HTTP adapter for the backend admin API.

use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::sse::SseStream;

/// Default backend address when nothing overrides it.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend address.
pub const API_URL_ENV: &str = "RAGDECK_API_URL";

/// Errors surfaced by the API adapter.
///
/// A non-2xx response is a value, not a panic: callers route it to the row
/// or panel that issued the request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend could not be reached at all.
    #[error("request to {url} failed: {source}")]
    Network {
        /// Full URL of the failed request.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Response body text (may be empty).
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Full URL of the request.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Short text for inline row/panel status cells.
    ///
    /// Prefers the server-provided body; falls back to a generic phrase.
    #[must_use]
    pub fn panel_text(&self) -> String {
        match self {
            Self::Status { status, body } => {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("request failed ({status})")
                } else {
                    // Keep panel text one line
                    trimmed.lines().next().unwrap_or(trimmed).to_owned()
                }
            }
            Self::Network { .. } => "backend unreachable".to_owned(),
            Self::Decode { .. } => "unexpected response".to_owned(),
        }
    }

    /// Whether this error means the backend is down (sticky banner case).
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Result alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Client for the backend HTTP+SSE surface.
///
/// Holds the resolved base URL and, after a successful unlock, the admin
/// token presented on `/api/admin/*` requests.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    admin_token: Option<String>,
}

/// Resolve the backend base URL.
///
/// Order: `RAGDECK_API_URL` environment variable, the stored preference,
/// then [`DEFAULT_API_URL`]. Trailing slashes are stripped so paths can be
/// appended verbatim.
#[must_use]
pub fn resolve_base_url(preference: Option<&str>) -> String {
    let env_value = std::env::var(API_URL_ENV).ok();
    resolve_base_url_from(env_value.as_deref(), preference)
}

fn resolve_base_url_from(env_value: Option<&str>, preference: Option<&str>) -> String {
    let raw = env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| preference.map(str::trim).filter(|v| !v.is_empty()))
        .unwrap_or(DEFAULT_API_URL);
    raw.trim_end_matches('/').to_owned()
}

impl ApiClient {
    /// Create a client against the given base URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built with the default
    /// configuration.
    #[must_use]
    #[expect(
        clippy::expect_used,
        reason = "default reqwest Client::builder configuration is infallible"
    )]
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            admin_token: None,
        }
    }

    /// The resolved base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether an admin token is held.
    #[must_use]
    pub fn has_admin_token(&self) -> bool {
        self.admin_token.is_some()
    }

    /// Attach an admin token without verifying it.
    pub fn set_admin_token(&mut self, token: impl Into<String>) {
        self.admin_token = Some(token.into());
    }

    /// Drop the held admin token.
    pub fn clear_admin_token(&mut self) {
        self.admin_token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = &self.admin_token {
            if path.starts_with("/api/admin/") {
                builder = builder.bearer_auth(token);
            }
        }
        builder
    }

    /// Issue a request and check the status.
    ///
    /// # Errors
    ///
    /// `ApiError::Network` when the transport fails, `ApiError::Status`
    /// for any non-2xx response (the body is read to completion either way).
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let mut builder = self.builder(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let url = self.url(path);
        let response = builder
            .send()
            .await
            .map_err(|source| ApiError::Network { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(response)
    }

    /// GET a JSON document.
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors; `ApiError::Decode` when the
    /// body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.request::<()>(Method::GET, path, None).await?;
        self.decode(path, response).await
    }

    /// POST a JSON body and decode a JSON response.
    ///
    /// # Errors
    ///
    /// Propagates transport, status, and decode errors.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self.request(Method::POST, path, Some(body)).await?;
        self.decode(path, response).await
    }

    /// POST with no body, ignoring any response payload.
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors.
    pub async fn post_empty(&self, path: &str) -> ApiResult<()> {
        let response = self.request::<()>(Method::POST, path, None).await?;
        // Drain the body so the connection can be reused
        let _ = response.bytes().await;
        Ok(())
    }

    /// PUT a JSON body, ignoring any response payload.
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors.
    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        let response = self.request(Method::PUT, path, Some(body)).await?;
        let _ = response.bytes().await;
        Ok(())
    }

    /// PUT a JSON body and decode a JSON response.
    ///
    /// # Errors
    ///
    /// Propagates transport, status, and decode errors.
    pub async fn put_json_response<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self.request(Method::PUT, path, Some(body)).await?;
        self.decode(path, response).await
    }

    /// DELETE a resource, ignoring any response payload.
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let response = self.request::<()>(Method::DELETE, path, None).await?;
        let _ = response.bytes().await;
        Ok(())
    }

    /// GET a raw response (used for attachment downloads).
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors.
    pub async fn get_response(&self, path: &str) -> ApiResult<Response> {
        self.request::<()>(Method::GET, path, None).await
    }

    /// Open an SSE stream over GET.
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors from the initial request.
    pub async fn sse_get(&self, path: &str) -> ApiResult<SseStream> {
        let builder = self
            .builder(Method::GET, path)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        self.open_sse(path, builder).await
    }

    /// Open an SSE stream over POST with a JSON body.
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors from the initial request.
    pub async fn sse_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<SseStream> {
        let builder = self
            .builder(Method::POST, path)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(body);
        self.open_sse(path, builder).await
    }

    async fn open_sse(
        &self,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> ApiResult<SseStream> {
        let url = self.url(path);
        let response = builder
            .send()
            .await
            .map_err(|source| ApiError::Network { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(SseStream::from_response(url, response))
    }

    async fn decode<T: DeserializeOwned>(&self, path: &str, response: Response) -> ApiResult<T> {
        let url = self.url(path);
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Network { url: url.clone(), source })?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_resolution_prefers_env_then_preference() {
        assert_eq!(resolve_base_url_from(None, None), DEFAULT_API_URL);
        assert_eq!(
            resolve_base_url_from(None, Some("http://10.0.0.2:9000/")),
            "http://10.0.0.2:9000"
        );
        assert_eq!(
            resolve_base_url_from(Some("http://api.internal:8000"), Some("http://10.0.0.2:9000")),
            "http://api.internal:8000"
        );
        assert_eq!(
            resolve_base_url_from(Some("   "), Some("http://10.0.0.2:9000")),
            "http://10.0.0.2:9000"
        );
    }

    #[test]
    fn panel_text_prefers_server_body() {
        let err = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            body: "pattern must not be empty\nextra".to_owned(),
        };
        assert_eq!(err.panel_text(), "pattern must not be empty");

        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert_eq!(err.panel_text(), "request failed (500 Internal Server Error)");
    }
}
