//! HTTP client abstraction for testability.

use super::FetchError;
use crate::engine::BoxFuture;

/// Trait for the HTTP operations the dashboard needs.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock HTTP clients in tests. Only two operations exist: fetch a
/// body, and a lightweight existence check used by the temporal prober.
pub trait HttpFetch: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, FetchError>>;

    /// Checks whether a resource exists (HEAD request).
    ///
    /// Transport failures are errors; a clean negative answer (404 and
    /// friends) is `Ok(false)`.
    fn exists(&self, url: &str) -> BoxFuture<'_, Result<bool, FetchError>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    /// Creates a new client with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(30)
    }

    /// Creates a new client with a custom request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestHttp {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url,
                });
            }

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| FetchError::Http(format!("Failed to read response: {}", e)))
        })
    }

    fn exists(&self, url: &str) -> BoxFuture<'_, Result<bool, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .head(&url)
                .send()
                .await
                .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;
            Ok(response.status().is_success())
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// One scripted answer, matched by URL substring.
    #[derive(Debug, Clone)]
    pub struct MockResponse {
        pub body: Result<Vec<u8>, FetchError>,
        pub exists: bool,
        pub delay: Duration,
    }

    impl MockResponse {
        pub fn ok(body: impl Into<Vec<u8>>) -> Self {
            Self {
                body: Ok(body.into()),
                exists: true,
                delay: Duration::ZERO,
            }
        }

        pub fn status(status: u16) -> Self {
            Self {
                body: Err(FetchError::Status {
                    status,
                    url: String::new(),
                }),
                exists: false,
                delay: Duration::ZERO,
            }
        }

        pub fn error(message: &str) -> Self {
            Self {
                body: Err(FetchError::Http(message.to_string())),
                exists: false,
                delay: Duration::ZERO,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    /// Mock HTTP client scripted with substring-matched routes.
    #[derive(Default)]
    pub struct MockHttp {
        routes: Mutex<Vec<(String, MockResponse)>>,
    }

    impl MockHttp {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script a response for any URL containing `fragment`.
        pub fn route(self, fragment: &str, response: MockResponse) -> Self {
            self.routes
                .lock()
                .push((fragment.to_string(), response));
            self
        }

        fn lookup(&self, url: &str) -> Option<MockResponse> {
            self.routes
                .lock()
                .iter()
                .find(|(fragment, _)| url.contains(fragment.as_str()))
                .map(|(_, response)| response.clone())
        }
    }

    impl HttpFetch for MockHttp {
        fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
            let response = self.lookup(url);
            let url = url.to_string();
            Box::pin(async move {
                match response {
                    Some(response) => {
                        if !response.delay.is_zero() {
                            tokio::time::sleep(response.delay).await;
                        }
                        response.body
                    }
                    None => Err(FetchError::Http(format!("no mock route for {}", url))),
                }
            })
        }

        fn exists(&self, url: &str) -> BoxFuture<'_, Result<bool, FetchError>> {
            let response = self.lookup(url);
            Box::pin(async move {
                match response {
                    Some(response) => {
                        if !response.delay.is_zero() {
                            tokio::time::sleep(response.delay).await;
                        }
                        Ok(response.exists)
                    }
                    None => Ok(false),
                }
            })
        }
    }

    #[tokio::test]
    async fn mock_routes_by_substring() {
        let mock = MockHttp::new()
            .route("alpha", MockResponse::ok(b"first".to_vec()))
            .route("beta", MockResponse::status(500));

        let body = mock.get("https://example.com/alpha.json").await.unwrap();
        assert_eq!(body, b"first");

        let err = mock.get("https://example.com/beta.json").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn mock_exists_defaults_to_absent() {
        let mock = MockHttp::new().route("2024-03-01", MockResponse::ok(b"tile".to_vec()));
        assert!(mock.exists("https://tiles/2024-03-01/0/0/0.png").await.unwrap());
        assert!(!mock.exists("https://tiles/2024-03-02/0/0/0.png").await.unwrap());
    }
}
