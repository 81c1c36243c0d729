//! # HTTP Retrieval Utilities
//!
//! This module provides the asynchronous API client used against the
//! dashboard REST API. It wraps `reqwest` with `reqwest-middleware` so a retry
//! policy can be layered on, and standardizes response handling.
//!
//! The API token is sent twice: as the `token` query parameter that the
//! existing API contract requires, and as the `X-API-Token` header.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dashboard::query::{ParameterSet, TOKEN_PARAM};
use crate::error::{DashboardError, DashboardResult};
use crate::retrieve::api::DashboardApi;

/// Header carrying the API token alongside the query parameter.
pub const TOKEN_HEADER: &str = "X-API-Token";

/// A standardized container for API responses.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Tunables of the underlying HTTP client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout, connect included.
    pub timeout: Duration,
    /// Transient-failure retries layered by the middleware. Zero disables them.
    pub max_retries: u32,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 0,
            user_agent: concat!("siem-console/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles the base URL, the API
/// token and optional retries.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined. Always ends in `/`.
    base_url: Url,
    /// The token attached to every request as a header.
    auth_token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("auth_token", &self.auth_token.as_ref().map(|_| "*****"))
            .finish()
    }
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Errors
    /// Fails if `base_url` is not an absolute URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, auth_token: Option<String>, options: &ClientOptions) -> DashboardResult<Self> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| DashboardError::InvalidSettings(format!("cannot build HTTP client: {}", e)))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
            auth_token,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` to the base URL and appends `params` as the query string.
    pub fn endpoint_url(&self, path: &str, params: &ParameterSet) -> DashboardResult<Url> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params.iter() {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Performs a request and returns status, headers and raw body.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &ParameterSet,
        body: Option<&Value>,
    ) -> DashboardResult<(reqwest::StatusCode, HeaderMap, Vec<u8>)> {
        let url = self.endpoint_url(path, params)?;
        let mut req = self.inner.request(method, url);

        let token = self.auth_token.as_deref().or_else(|| params.get(TOKEN_PARAM));
        if let Some(token) = token {
            match HeaderValue::from_str(token) {
                Ok(value) => req = req.header(TOKEN_HEADER, value),
                Err(_) => log::warn!("API token is not a valid header value; sending it as a query parameter only"),
            }
        }

        if let Some(b) = body {
            let json_body = serde_json::to_vec(b).map_err(|e| DashboardError::MalformedResponse {
                endpoint: path.to_string(),
                source: e,
            })?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response = req.send().await.map_err(|e| DashboardError::Transport {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|e| DashboardError::Transport {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;

        Ok((status, headers, bytes.to_vec()))
    }

    /// Performs a request and decodes a successful body into `T`.
    ///
    /// Non-2xx statuses are not errors here; they come back with
    /// `success == false` and the error body captured.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &ParameterSet,
        body: Option<&Value>,
    ) -> DashboardResult<ApiResponse<T>> {
        let (status, headers, raw) = self.execute(method, path, params, body).await?;

        if status.is_success() {
            let data = serde_json::from_slice::<T>(&raw).map_err(|e| DashboardError::MalformedResponse {
                endpoint: path.to_string(),
                source: e,
            })?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: Some(String::from_utf8_lossy(&raw).into_owned()),
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }
}

fn status_error(path: &str, status: u16, body: Option<String>) -> DashboardError {
    DashboardError::Status {
        endpoint: path.to_string(),
        status,
        body: body.unwrap_or_default().chars().take(200).collect(),
    }
}

impl DashboardApi for ApiClient {
    async fn get_json(&self, path: &str, params: &ParameterSet) -> DashboardResult<Value> {
        let response = self.request::<Value>(Method::GET, path, params, None).await?;
        match response {
            ApiResponse { success: true, data: Some(data), .. } => Ok(data),
            ApiResponse { status, error_body, .. } => Err(status_error(path, status, error_body)),
        }
    }

    async fn post(&self, path: &str, params: &ParameterSet, body: Option<Value>) -> DashboardResult<()> {
        let (status, _, raw) = self.execute(Method::POST, path, params, body.as_ref()).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(
                path,
                status.as_u16(),
                Some(String::from_utf8_lossy(&raw).into_owned()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves exactly one canned response and returns the raw request it received.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
        let port = listener.local_addr().unwrap().port();
        let base = format!("http://127.0.0.1:{}/", port);

        let handle = thread::spawn(move || {
            let mut received = String::new();
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let n = stream.read(&mut buf).unwrap_or(0);
                received = String::from_utf8_lossy(&buf[..n]).into_owned();

                let response = format!(
                    "{}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            received
        });

        (base, handle)
    }

    fn params() -> ParameterSet {
        ParameterSet::default().with("token", "tok-1").with("since", "1h")
    }

    #[test]
    fn test_endpoint_url_joins_and_encodes() {
        let client = ApiClient::new("http://siem.local:5000", None, &ClientOptions::default()).unwrap();
        let url = client
            .endpoint_url("/api/events", &params().with("source_ip", "10.0.0.1 &x"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://siem.local:5000/api/events?token=tok-1&since=1h&source_ip=10.0.0.1+%26x"
        );
    }

    #[test]
    fn test_base_path_is_preserved() {
        let client = ApiClient::new("https://proxy.example/siem", None, &ClientOptions::default()).unwrap();
        let url = client.endpoint_url("api/stats", &ParameterSet::default()).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/siem/api/stats");
    }

    #[test]
    fn test_relative_base_is_rejected() {
        assert!(ApiClient::new("siem.local", None, &ClientOptions::default()).is_err());
    }

    #[tokio::test]
    async fn test_get_json_success_sends_token_both_ways() {
        let (base, handle) = serve_once("HTTP/1.1 200 OK", r#"{"total_events": 5}"#);
        let client = ApiClient::new(&base, None, &ClientOptions::default()).unwrap();

        let value = client.get_json("api/stats", &params()).await.unwrap();
        let request = handle.join().unwrap();

        assert_eq!(value["total_events"], 5);
        assert!(request.starts_with("GET /api/stats?token=tok-1&since=1h "));
        assert!(request.to_ascii_lowercase().contains("x-api-token: tok-1"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (base, handle) = serve_once("HTTP/1.1 401 UNAUTHORIZED", r#"{"error": "Missing or invalid API token"}"#);
        let client = ApiClient::new(&base, None, &ClientOptions::default()).unwrap();

        let err = client.get_json("api/alerts", &params()).await.unwrap_err();
        handle.join().unwrap();

        match err {
            DashboardError::Status { status, endpoint, body } => {
                assert_eq!(status, 401);
                assert_eq!(endpoint, "api/alerts");
                assert!(body.contains("invalid API token"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed() {
        let (base, handle) = serve_once("HTTP/1.1 200 OK", "<html>oops</html>");
        let client = ApiClient::new(&base, None, &ClientOptions::default()).unwrap();

        let err = client.get_json("api/geo", &params()).await.unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, DashboardError::MalformedResponse { .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_post_ignores_response_body() {
        let (base, handle) = serve_once("HTTP/1.1 200 OK", r#"{"status": "ok"}"#);
        let client = ApiClient::new(&base, None, &ClientOptions::default()).unwrap();

        client
            .post("api/alerts/7/ack", &ParameterSet::default().with("token", "tok-1"), None)
            .await
            .unwrap();
        let request = handle.join().unwrap();
        assert!(request.starts_with("POST /api/alerts/7/ack?token=tok-1 "));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let client = ApiClient::new(&format!("http://127.0.0.1:{}/", port), None, &ClientOptions::default()).unwrap();
        let err = client.get_json("api/stats", &params()).await.unwrap_err();
        assert!(err.is_transport());
    }
}
