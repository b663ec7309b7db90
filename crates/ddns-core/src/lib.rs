// # ddns-core
//
// Core library for the ddnsup one-shot DNS reconciler.
//
// ## Architecture Overview
//
// A run is a single top-to-bottom pass, started by cron or a systemd timer:
// - **IpSource**: Trait for discovering the current public address per family
// - **DnsProvider**: Trait for reading and writing records via the provider API
// - **DdnsEngine**: Walks every configured record and family, reconciling each
// - **RunLogger**: Buffers the run's outcomes and rotates the persistent log
//
// ## Design Principles
//
// 1. **Provider is the source of truth**: remote state is fetched fresh on every attempt
// 2. **Never guess**: more than one matching record is reported, never mutated
// 3. **Failure isolation**: record-scoped errors never abort the run
// 4. **Library-First**: the binary only wires configuration to these types

pub mod config;
pub mod engine;
pub mod error;
pub mod retry;
pub mod runlog;
pub mod traits;

// Re-export core types for convenience
pub use config::{Credentials, IpMode, RecordTarget, RunConfig};
pub use engine::{DdnsEngine, DetectedAddresses, ReconciliationOutcome, RunSummary};
pub use error::{Error, Result};
pub use retry::RetryPolicy;
pub use runlog::{ErrorBlock, RunLogger};
pub use traits::{DnsProvider, IpFamily, IpSource, RecordType};
