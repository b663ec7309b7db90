// # Porkbun DNS Provider
//
// DnsProvider implementation for the Porkbun JSON API v3.
//
// ## Endpoints
//
// All calls are authenticated POSTs (see [`client`]):
//
// - Retrieve: `/dns/retrieveByNameType/{domain}/{type}/{subdomain}`
// - Create:   `/dns/create/{domain}` with `{name, type, content, ttl}`
// - Edit:     `/dns/editByNameType/{domain}/{type}/{subdomain}` with `{content, ttl}`
//
// The subdomain path segment is omitted for the apex.
//
// ## Success
//
// A call succeeds only when the HTTP status is 2xx AND the JSON body carries
// `"status": "SUCCESS"`. Anything else becomes `Error::Api` with the raw
// response body as detail.
//
// ## Dry-Run Mode
//
// Retrieve calls are performed as usual; create and edit calls are logged
// and skipped, and report success.
//
// ## Security
//
// The API key pair NEVER appears in logs or Debug output.

pub mod client;

pub use client::{ApiClient, ApiResponse};

use async_trait::async_trait;
use ddns_core::traits::{ApiOperation, DnsProvider, RecordKey, RemoteRecord, RemoteRecordState};
use ddns_core::{Credentials, Error, Result, RetryPolicy};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Porkbun API base URL
pub const PORKBUN_API_BASE: &str = "https://api.porkbun.com/api/json/v3";

#[derive(Serialize)]
struct CreatePayload<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    content: &'a str,
    ttl: String,
}

#[derive(Serialize)]
struct EditPayload<'a> {
    content: &'a str,
    ttl: String,
}

/// Only the authentication pair is sent to the retrieve endpoint
#[derive(Serialize)]
struct EmptyPayload {}

/// Common to every response
#[derive(Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: String,
}

/// A retrieve response must carry an explicit record list
#[derive(Deserialize)]
struct RetrieveBody {
    records: Vec<WireRecord>,
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default, deserialize_with = "lenient_ttl")]
    ttl: Option<u32>,
}

/// Porkbun returns ids and TTLs as strings; accept numbers too
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn lenient_ttl<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    })
}

/// Porkbun DNS provider
pub struct PorkbunProvider {
    client: ApiClient,
    base_url: String,
    /// If true, perform retrieve calls but skip create/edit
    dry_run: bool,
}

// Custom Debug implementation that hides the key pair
impl std::fmt::Debug for PorkbunProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PorkbunProvider")
            .field("client", &self.client)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl PorkbunProvider {
    /// Create a provider against the public API with the default retry policy
    pub fn new(credentials: Credentials, dry_run: bool) -> Result<Self> {
        Self::with_base_url(credentials, PORKBUN_API_BASE, RetryPolicy::default(), dry_run)
    }

    /// Create a provider against a custom base URL (mock servers, proxies)
    pub fn with_base_url(
        credentials: Credentials,
        base_url: impl Into<String>,
        retry: RetryPolicy,
        dry_run: bool,
    ) -> Result<Self> {
        if credentials.api_key.is_empty() || credentials.secret_api_key.is_empty() {
            return Err(Error::config("Porkbun API key pair cannot be empty"));
        }

        let base_url: String = base_url.into();
        Ok(Self {
            client: ApiClient::new(credentials, retry)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            dry_run,
        })
    }

    /// `/dns/{action}/{domain}/{type}[/{subdomain}]`
    fn by_name_type_url(&self, action: &str, key: &RecordKey<'_>) -> String {
        let mut url = format!(
            "{}/dns/{}/{}/{}",
            self.base_url, action, key.domain, key.record_type
        );
        if !key.subdomain.is_empty() {
            url.push('/');
            url.push_str(key.subdomain);
        }
        url
    }

    /// Issue a call and require a 2xx, `"status": "SUCCESS"` response
    ///
    /// Returns the raw body for endpoint-specific parsing.
    async fn checked_call<P: Serialize + Sync>(
        &self,
        operation: ApiOperation,
        url: &str,
        payload: &P,
    ) -> Result<String> {
        let response = self.client.call(url, payload).await;

        if !response.success {
            let cause = match response.status {
                Some(status) => format!("HTTP {}", status),
                None => "request failed".to_string(),
            };
            return Err(Error::api(operation, cause, Some(response.body)));
        }

        let envelope: StatusBody = match serde_json::from_str(&response.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Err(Error::api(
                    operation,
                    format!("unexpected response: {}", e),
                    Some(response.body),
                ));
            }
        };

        if !envelope.status.eq_ignore_ascii_case("SUCCESS") {
            let status = if envelope.status.is_empty() {
                "missing"
            } else {
                envelope.status.as_str()
            };
            return Err(Error::api(
                operation,
                format!("provider status {}", status),
                Some(response.body),
            ));
        }

        Ok(response.body)
    }
}

#[async_trait]
impl DnsProvider for PorkbunProvider {
    async fn retrieve_records(&self, key: &RecordKey<'_>) -> Result<RemoteRecordState> {
        let url = self.by_name_type_url("retrieveByNameType", key);
        let body = self
            .checked_call(ApiOperation::Retrieve, &url, &EmptyPayload {})
            .await?;

        let parsed: RetrieveBody = serde_json::from_str(&body).map_err(|e| {
            Error::api(
                ApiOperation::Retrieve,
                format!("unexpected response: {}", e),
                Some(body.clone()),
            )
        })?;

        let records = parsed
            .records
            .into_iter()
            .map(|r| RemoteRecord {
                id: r.id,
                content: r.content,
                ttl: r.ttl,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Porkbun has {} {} record(s) for {}/{}",
            records.len(),
            key.record_type,
            key.subdomain,
            key.domain
        );
        Ok(RemoteRecordState::from_matches(records))
    }

    async fn create_record(&self, key: &RecordKey<'_>, content: &str, ttl: u32) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would create {} {}/{} -> {} (ttl {})",
                key.record_type,
                key.subdomain,
                key.domain,
                content,
                ttl
            );
            return Ok(());
        }

        let url = format!("{}/dns/create/{}", self.base_url, key.domain);
        let payload = CreatePayload {
            name: key.subdomain,
            record_type: key.record_type.as_str(),
            content,
            ttl: ttl.to_string(),
        };
        self.checked_call(ApiOperation::Create, &url, &payload).await?;
        Ok(())
    }

    async fn edit_record(&self, key: &RecordKey<'_>, content: &str, ttl: u32) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would edit {} {}/{} -> {} (ttl {})",
                key.record_type,
                key.subdomain,
                key.domain,
                content,
                ttl
            );
            return Ok(());
        }

        let url = self.by_name_type_url("editByNameType", key);
        let payload = EditPayload {
            content,
            ttl: ttl.to_string(),
        };
        self.checked_call(ApiOperation::Edit, &url, &payload).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "porkbun"
    }
}
