// # API Client
//
// Thin authenticated JSON transport for the Porkbun API.
//
// - Every call is a POST whose body carries the API key pair alongside the
//   endpoint-specific payload
// - Failed calls (network error, timeout, non-2xx) are retried per the
//   configured RetryPolicy
// - The final attempt's response is returned either way; callers inspect
//   `success` and the body themselves

use ddns_core::{Credentials, Error, Result, RetryPolicy};
use serde::Serialize;
use std::time::Duration;

/// Hard per-call timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("ddnsup/", env!("CARGO_PKG_VERSION"));

/// Request body: credentials merged with the endpoint payload
#[derive(Serialize)]
struct Authenticated<'a, P: Serialize> {
    apikey: &'a str,
    secretapikey: &'a str,
    #[serde(flatten)]
    payload: &'a P,
}

/// Outcome of the final attempt of one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// Response body, or the transport error text when no response arrived
    pub body: String,
    /// True for a 2xx response
    pub success: bool,
    /// HTTP status, absent when no response arrived
    pub status: Option<u16>,
}

/// Retrying JSON POST client
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    credentials: Credentials,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("credentials", &self.credentials)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ApiClient {
    pub fn new(credentials: Credentials, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials,
            retry,
        })
    }

    /// POST `payload` (plus credentials) to `url`
    pub async fn call<P: Serialize + Sync>(&self, url: &str, payload: &P) -> ApiResponse {
        let body = Authenticated {
            apikey: &self.credentials.api_key,
            secretapikey: &self.credentials.secret_api_key,
            payload,
        };

        self.retry
            .run(|_| self.post_once(url, &body), |response| response.success)
            .await
    }

    async fn post_once<B: Serialize>(&self, url: &str, body: &B) -> ApiResponse {
        let response = match self.http.post(url).json(body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("POST {} failed: {}", url, e);
                return ApiResponse {
                    body: e.to_string(),
                    success: false,
                    status: None,
                };
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("Unable to read response body: {}", e));

        if !status.is_success() {
            tracing::warn!("POST {} returned {}", url, status);
        }

        ApiResponse {
            body,
            success: status.is_success(),
            status: Some(status.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credentials_are_merged_into_payload() {
        let payload = json!({ "content": "192.0.2.1", "ttl": "600" });
        let body = Authenticated {
            apikey: "pk1_abc",
            secretapikey: "sk1_def",
            payload: &payload,
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "apikey": "pk1_abc",
                "secretapikey": "sk1_def",
                "content": "192.0.2.1",
                "ttl": "600",
            })
        );
    }

    #[test]
    fn debug_redacts_keys() {
        let client =
            ApiClient::new(Credentials::new("pk1_abc", "sk1_def"), RetryPolicy::none()).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("pk1_abc"));
        assert!(!debug.contains("sk1_def"));
    }
}
