//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the current public address per family
//! - [`DnsProvider`]: Read and write records via the provider API

pub mod dns_provider;
pub mod ip_source;

pub use dns_provider::{
    ApiOperation, DnsProvider, RecordKey, RecordType, RemoteRecord, RemoteRecordState,
};
pub use ip_source::{IpFamily, IpSource, validate_address};
