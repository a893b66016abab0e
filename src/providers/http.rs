use std::time::Duration;

use log::warn;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::HttpConfig;
use crate::error::{Result, TestLensError};

pub(crate) const USER_AGENT: &str = concat!("testlens/", env!("CARGO_PKG_VERSION"));

/// Retry and timeout policy shared by every backend client.
#[derive(Debug, Clone, Copy)]
pub struct HttpPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl From<&HttpConfig> for HttpPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl HttpPolicy {
    pub fn client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(|e| TestLensError::Config(format!("Failed to create HTTP client: {e}")))
    }

    /// A client that hands redirects back to the caller instead of following them.
    pub fn non_redirecting_client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TestLensError::Config(format!("Failed to create HTTP client: {e}")))
    }

    /// Sends a request, retrying on network errors, rate limits and server errors.
    ///
    /// Any other status is returned to the caller untouched.
    pub async fn send<F>(&self, backend: &str, request: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retry_count = 0;
        loop {
            let response = match request().send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= self.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "{backend} network error ({e}), retrying in {}s ({}/{})...",
                        self.retry_delay.as_secs(),
                        retry_count + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(TestLensError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.max_retries,
                    });
                }

                warn!(
                    "{backend} API error (status {status}). Waiting {} seconds before retry {}/{}...",
                    self.retry_delay.as_secs(),
                    retry_count + 1,
                    self.max_retries
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            return Ok(response);
        }
    }

    /// Sends a request and decodes a successful JSON body.
    pub async fn get_json<T, F>(&self, backend: &str, request: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let response = ensure_success(self.send(backend, request).await?).await?;
        Ok(response.json().await?)
    }
}

/// Turns a non-2xx response into `ApiError`, keeping the body for context.
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(TestLensError::ApiError {
        status: status.as_u16(),
        message: error_text,
    })
}

#[cfg(test)]
pub(crate) fn test_policy() -> HttpPolicy {
    HttpPolicy {
        max_retries: 1,
        retry_delay: Duration::ZERO,
        timeout: Duration::from_secs(5),
    }
}
