//! Per-record reconciliation
//!
//! ```text
//! Retrieve ──┬── error ───────────────► ApiError
//!            ├── >1 match ────────────► Ambiguous
//!            ├── 0 matches ── create ─► Created | ApiError
//!            └── 1 match ─── compare ─┬► Unchanged (no write)
//!                                     └► edit ──► Updated | ApiError
//! ```

use chrono::{DateTime, Local};
use std::net::IpAddr;
use tracing::{debug, info, warn};

use crate::config::RecordTarget;
use crate::error::Error;
use crate::traits::{ApiOperation, DnsProvider, IpFamily, RecordType};

/// Fields shared by every outcome: what was being reconciled, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub timestamp: DateTime<Local>,
    pub fqdn: String,
    pub record_type: RecordType,
    /// Desired content (the detected address)
    pub ip: String,
    /// Desired TTL
    pub ttl: u32,
}

/// Result of one reconciliation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// No record existed; one was created
    Created(RecordEntry),

    /// One record existed with different content or TTL; it was edited
    Updated {
        entry: RecordEntry,
        previous_ip: String,
        previous_ttl: Option<u32>,
    },

    /// One record existed and already matched; nothing was written
    Unchanged(RecordEntry),

    /// More than one record matched; nothing was written
    Ambiguous { entry: RecordEntry, match_count: usize },

    /// A provider call failed; nothing further was attempted
    ApiError {
        entry: RecordEntry,
        operation: ApiOperation,
        cause: String,
        detail: Option<String>,
    },
}

impl ReconciliationOutcome {
    pub fn entry(&self) -> &RecordEntry {
        match self {
            Self::Created(entry) | Self::Unchanged(entry) => entry,
            Self::Updated { entry, .. }
            | Self::Ambiguous { entry, .. }
            | Self::ApiError { entry, .. } => entry,
        }
    }

    /// Whether this outcome is reported as an error block
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Ambiguous { .. } | Self::ApiError { .. })
    }

    /// Whether a create or edit call was issued
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Updated { .. })
    }

    fn from_error(entry: RecordEntry, operation: ApiOperation, err: Error) -> Self {
        let (operation, cause, detail) = match err {
            Error::AmbiguousState { count, .. } => {
                return Self::Ambiguous {
                    entry,
                    match_count: count,
                };
            }
            Error::Api {
                operation,
                cause,
                detail,
            } => (operation, cause, detail),
            other => (operation, other.to_string(), None),
        };
        Self::ApiError {
            entry,
            operation,
            cause,
            detail,
        }
    }
}

/// Compare a remote record's content with the desired address
///
/// Addresses are compared by value when both sides parse, so equivalent
/// spellings of the same IPv6 address are not treated as drift.
fn same_address(remote: &str, desired: &str) -> bool {
    match (remote.trim().parse::<IpAddr>(), desired.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => remote.trim() == desired,
    }
}

/// Reconcile one record target for one address family
///
/// Issues one retrieve call, then at most one create or edit call.
/// Always produces exactly one outcome; provider failures are reported in
/// the outcome rather than returned.
pub async fn reconcile(
    provider: &dyn DnsProvider,
    target: &RecordTarget,
    family: IpFamily,
    address: &str,
) -> ReconciliationOutcome {
    let record_type = family.record_type();
    let key = target.key(record_type);
    let ttl = target.ttl();
    let entry = RecordEntry {
        timestamp: Local::now(),
        fqdn: target.fqdn(),
        record_type,
        ip: address.to_string(),
        ttl,
    };

    debug!("Retrieving {} record(s) for {}", record_type, entry.fqdn);
    let state = match provider.retrieve_records(&key).await {
        Ok(state) => state,
        Err(e) => {
            warn!("Retrieve failed for {} ({}): {}", entry.fqdn, record_type, e);
            return ReconciliationOutcome::from_error(entry, ApiOperation::Retrieve, e);
        }
    };

    if state.match_count() > 1 {
        let err = Error::AmbiguousState {
            fqdn: entry.fqdn.clone(),
            record_type,
            count: state.match_count(),
        };
        warn!("{}; refusing to pick one, manual cleanup required", err);
        return ReconciliationOutcome::from_error(entry, ApiOperation::Retrieve, err);
    }

    let Some(current) = state.single() else {
        return match provider.create_record(&key, address, ttl).await {
            Ok(()) => {
                info!("Created {} {} -> {} (ttl {})", entry.fqdn, record_type, address, ttl);
                ReconciliationOutcome::Created(entry)
            }
            Err(e) => {
                warn!("Create failed for {} ({}): {}", entry.fqdn, record_type, e);
                ReconciliationOutcome::from_error(entry, ApiOperation::Create, e)
            }
        };
    };

    if same_address(&current.content, address) && current.ttl == Some(ttl) {
        debug!("{} {} already points at {}", entry.fqdn, record_type, address);
        return ReconciliationOutcome::Unchanged(entry);
    }

    match provider.edit_record(&key, address, ttl).await {
        Ok(()) => {
            info!(
                "Updated {} {}: {} -> {} (ttl {:?} -> {})",
                entry.fqdn, record_type, current.content, address, current.ttl, ttl
            );
            ReconciliationOutcome::Updated {
                previous_ip: current.content.clone(),
                previous_ttl: current.ttl,
                entry,
            }
        }
        Err(e) => {
            warn!("Edit failed for {} ({}): {}", entry.fqdn, record_type, e);
            ReconciliationOutcome::from_error(entry, ApiOperation::Edit, e)
        }
    }
}
