// # DNS Provider Trait
//
// Defines the interface for reading and writing DNS records via a
// provider API.
//
// ## Implementations
//
// - Porkbun: `ddns-provider-porkbun` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::traits::{DnsProvider, RecordKey, RecordType};
//
// let key = RecordKey::new("example.com", "www", RecordType::A);
// let state = provider.retrieve_records(&key).await?;
// if state.match_count() == 0 {
//     provider.create_record(&key, "192.0.2.1", 600).await?;
// }
// ```

use async_trait::async_trait;
use std::fmt;

/// DNS record type managed by this system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider endpoint being exercised, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    Retrieve,
    Create,
    Edit,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiOperation::Retrieve => f.write_str("retrieve"),
            ApiOperation::Create => f.write_str("create"),
            ApiOperation::Edit => f.write_str("edit"),
        }
    }
}

/// The (domain, subdomain, type) tuple every provider call is scoped to
///
/// `subdomain` is already normalized: the apex is the empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey<'a> {
    pub domain: &'a str,
    pub subdomain: &'a str,
    pub record_type: RecordType,
}

impl<'a> RecordKey<'a> {
    pub fn new(domain: &'a str, subdomain: &'a str, record_type: RecordType) -> Self {
        Self {
            domain,
            subdomain,
            record_type,
        }
    }
}

/// One record as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Provider-specific record ID
    pub id: String,
    /// Current record content (an address string)
    pub content: String,
    /// Current TTL, if the provider returned a usable one
    pub ttl: Option<u32>,
}

/// Observed remote state for one (domain, type, subdomain) tuple
///
/// Only ever built from the full list of matches, so the single-match
/// fields are populated iff exactly one record matched. Never cached:
/// every reconciliation attempt fetches a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecordState {
    match_count: usize,
    single: Option<RemoteRecord>,
}

impl RemoteRecordState {
    /// Build the state from every record the provider returned
    pub fn from_matches(mut records: Vec<RemoteRecord>) -> Self {
        let match_count = records.len();
        let single = if match_count == 1 { records.pop() } else { None };
        Self {
            match_count,
            single,
        }
    }

    /// State with no matching records
    pub fn empty() -> Self {
        Self::from_matches(Vec::new())
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    /// The matching record, present only when exactly one matched
    pub fn single(&self) -> Option<&RemoteRecord> {
        self.single.as_ref()
    }

    pub fn id(&self) -> Option<&str> {
        self.single.as_ref().map(|r| r.id.as_str())
    }

    pub fn content(&self) -> Option<&str> {
        self.single.as_ref().map(|r| r.content.as_str())
    }

    pub fn ttl(&self) -> Option<u32> {
        self.single.as_ref().and_then(|r| r.ttl)
    }
}

/// Trait for DNS provider implementations
///
/// Providers know the wire format of one DNS host's API and nothing
/// about reconciliation: they never decide whether a write is needed.
/// That decision belongs to the engine.
///
/// # Errors
///
/// Every method reports a non-success provider status, an unparseable
/// response, or an exhausted transport as [`crate::Error::Api`], carrying
/// the raw response body as `detail` whenever one was received.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Retrieve every record matching `key`
    async fn retrieve_records(&self, key: &RecordKey<'_>)
    -> Result<RemoteRecordState, crate::Error>;

    /// Create a new record for `key`
    async fn create_record(
        &self,
        key: &RecordKey<'_>,
        content: &str,
        ttl: u32,
    ) -> Result<(), crate::Error>;

    /// Overwrite content and TTL of the record(s) matching `key`
    async fn edit_record(
        &self,
        key: &RecordKey<'_>,
        content: &str,
        ttl: u32,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, content: &str) -> RemoteRecord {
        RemoteRecord {
            id: id.to_string(),
            content: content.to_string(),
            ttl: Some(600),
        }
    }

    #[test]
    fn single_match_populates_fields() {
        let state = RemoteRecordState::from_matches(vec![record("1", "192.0.2.1")]);
        assert_eq!(state.match_count(), 1);
        assert_eq!(state.id(), Some("1"));
        assert_eq!(state.content(), Some("192.0.2.1"));
        assert_eq!(state.ttl(), Some(600));
    }

    #[test]
    fn multiple_matches_hide_fields() {
        let state = RemoteRecordState::from_matches(vec![
            record("1", "192.0.2.1"),
            record("2", "192.0.2.9"),
        ]);
        assert_eq!(state.match_count(), 2);
        assert!(state.single().is_none());
        assert_eq!(state.id(), None);
        assert_eq!(state.content(), None);
        assert_eq!(state.ttl(), None);
    }

    #[test]
    fn no_match_is_empty() {
        let state = RemoteRecordState::empty();
        assert_eq!(state.match_count(), 0);
        assert_eq!(state.id(), None);
    }

    #[test]
    fn record_type_wire_names() {
        assert_eq!(RecordType::A.to_string(), "A");
        assert_eq!(RecordType::Aaaa.to_string(), "AAAA");
    }
}
