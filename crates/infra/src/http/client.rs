use std::time::Duration;

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tether_domain::TetherError;
use tracing::debug;
use url::Url;

use crate::errors::InfraError;

/// HTTP client bound to one base URL, with retry and timeout support.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    base_url: Url,
    bearer_token: Option<String>,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder(base_url: &str) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    /// Root every request path is joined onto
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path relative to the base URL.
    pub fn url(&self, path: &str) -> Result<Url, TetherError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| TetherError::Config(format!("invalid request path {path}: {err}")))
    }

    /// Create a request builder for a path, carrying the bearer token if set.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, TetherError> {
        Ok(self.request_to(method, self.url(path)?))
    }

    /// Create a request builder for an already resolved URL.
    pub fn request_to(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// Server errors and connection failures are retried; any response that
    /// arrives on the last attempt is returned as-is for the caller to map.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, TetherError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                TetherError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request =
                cloned_builder.build().map_err(|err| TetherError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(
                        attempt = attempt + 1,
                        %method,
                        %url,
                        error = %err,
                        "HTTP request failed"
                    );

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::from(err).into());
                }
            }
        }

        Err(TetherError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1u32 << shift)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    base_url: String,
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    bearer_token: Option<String>,
}

impl HttpClientBuilder {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(10),
            max_attempts: 2,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
            bearer_token: None,
        }
    }

    /// Per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// User-Agent header value
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Bearer token sent with every request
    pub fn bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Build the client; fails on an invalid base URL
    pub fn build(self) -> Result<HttpClient, TetherError> {
        let mut base_url = Url::parse(&self.base_url).map_err(|err| {
            TetherError::Config(format!("invalid remote base URL {}: {err}", self.base_url))
        })?;
        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(|err| TetherError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            base_url,
            bearer_token: self.bearer_token,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::{Method, StatusCode};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(uri: &str) -> HttpClient {
        HttpClient::builder(uri)
            .base_backoff(Duration::from_millis(10))
            .max_attempts(3)
            .bearer_token(Some("secret".into()))
            .build()
            .expect("http client")
    }

    #[test]
    fn joins_paths_under_a_base_path() {
        let client = HttpClient::builder("http://localhost:8787/api/v1").build().unwrap();
        assert_eq!(
            client.url("/reminders").unwrap().as_str(),
            "http://localhost:8787/api/v1/reminders"
        );
    }

    #[test]
    fn rejects_an_invalid_base_url() {
        let err = HttpClient::builder("not a url").build().err().unwrap();
        assert!(matches!(err, TetherError::Config(_)));
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let response = client.send(client.request(Method::GET, "/health").unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                if attempts_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let request = client.request(Method::GET, "/reminders").unwrap();
        let response = client.send(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let request = client.request(Method::GET, "/reminders/x").unwrap();
        let response = client.send(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::builder(&format!("http://{addr}"))
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .unwrap();

        let result = client.send(client.request(Method::GET, "/health").unwrap()).await;
        assert!(matches!(result, Err(TetherError::Transport(_))));
    }
}
