//! Test doubles and common utilities for engine contract tests
//!
//! The mock provider keeps an in-memory zone, so repeated runs observe
//! their own earlier writes the way they would against the real API.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    ApiOperation, DnsProvider, IpFamily, IpSource, RecordKey, RecordType, RemoteRecord,
    RemoteRecordState,
};
use std::sync::{Arc, Mutex};

/// A provider call, as observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Retrieve {
        domain: String,
        subdomain: String,
        record_type: RecordType,
    },
    Create {
        domain: String,
        subdomain: String,
        record_type: RecordType,
        content: String,
        ttl: u32,
    },
    Edit {
        domain: String,
        subdomain: String,
        record_type: RecordType,
        content: String,
        ttl: u32,
    },
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Retrieve { .. })
    }
}

#[derive(Debug, Clone)]
struct ZoneRecord {
    id: u64,
    domain: String,
    subdomain: String,
    record_type: RecordType,
    content: String,
    ttl: u32,
}

#[derive(Debug, Default)]
struct MockState {
    zone: Vec<ZoneRecord>,
    calls: Vec<Call>,
    next_id: u64,
    fail: Option<ApiOperation>,
}

/// A mock DnsProvider backed by an in-memory zone
///
/// Clones share the same zone and call log.
#[derive(Debug, Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record into the zone
    pub fn with_record(
        self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
        content: &str,
        ttl: u32,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.zone.push(ZoneRecord {
                id,
                domain: domain.to_string(),
                subdomain: subdomain.to_string(),
                record_type,
                content: content.to_string(),
                ttl,
            });
        }
        self
    }

    /// Make every call of `operation` fail with a provider error
    pub fn failing(self, operation: ApiOperation) -> Self {
        self.state.lock().unwrap().fail = Some(operation);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_write()).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Contents of the matching records currently in the zone
    pub fn contents(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
    ) -> Vec<(String, u32)> {
        self.state
            .lock()
            .unwrap()
            .zone
            .iter()
            .filter(|r| {
                r.domain == domain && r.subdomain == subdomain && r.record_type == record_type
            })
            .map(|r| (r.content.clone(), r.ttl))
            .collect()
    }

    fn check_failure(state: &MockState, operation: ApiOperation) -> Result<()> {
        if state.fail == Some(operation) {
            return Err(Error::api(
                operation,
                "provider status ERROR",
                Some("{\"status\":\"ERROR\",\"message\":\"Injected failure\"}".to_string()),
            ));
        }
        Ok(())
    }
}

fn matches(record: &ZoneRecord, key: &RecordKey<'_>) -> bool {
    record.domain == key.domain
        && record.subdomain == key.subdomain
        && record.record_type == key.record_type
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn retrieve_records(&self, key: &RecordKey<'_>) -> Result<RemoteRecordState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Retrieve {
            domain: key.domain.to_string(),
            subdomain: key.subdomain.to_string(),
            record_type: key.record_type,
        });
        Self::check_failure(&state, ApiOperation::Retrieve)?;

        let records = state
            .zone
            .iter()
            .filter(|r| matches(r, key))
            .map(|r| RemoteRecord {
                id: r.id.to_string(),
                content: r.content.clone(),
                ttl: Some(r.ttl),
            })
            .collect();
        Ok(RemoteRecordState::from_matches(records))
    }

    async fn create_record(&self, key: &RecordKey<'_>, content: &str, ttl: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            domain: key.domain.to_string(),
            subdomain: key.subdomain.to_string(),
            record_type: key.record_type,
            content: content.to_string(),
            ttl,
        });
        Self::check_failure(&state, ApiOperation::Create)?;

        state.next_id += 1;
        let id = state.next_id;
        state.zone.push(ZoneRecord {
            id,
            domain: key.domain.to_string(),
            subdomain: key.subdomain.to_string(),
            record_type: key.record_type,
            content: content.to_string(),
            ttl,
        });
        Ok(())
    }

    async fn edit_record(&self, key: &RecordKey<'_>, content: &str, ttl: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Edit {
            domain: key.domain.to_string(),
            subdomain: key.subdomain.to_string(),
            record_type: key.record_type,
            content: content.to_string(),
            ttl,
        });
        Self::check_failure(&state, ApiOperation::Edit)?;

        for record in state.zone.iter_mut().filter(|r| matches(r, key)) {
            record.content = content.to_string();
            record.ttl = ttl;
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An IP source that answers from fixed values
#[derive(Debug, Clone, Default)]
pub struct StaticIpSource {
    pub v4: Option<String>,
    pub v6: Option<String>,
}

impl StaticIpSource {
    pub fn new(v4: Option<&str>, v6: Option<&str>) -> Self {
        Self {
            v4: v4.map(str::to_string),
            v6: v6.map(str::to_string),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn discover(&self, family: IpFamily) -> Option<String> {
        match family {
            IpFamily::V4 => self.v4.clone(),
            IpFamily::V6 => self.v6.clone(),
        }
    }
}
