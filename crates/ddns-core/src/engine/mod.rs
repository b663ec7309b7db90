//! Core DDNS engine
//!
//! The DdnsEngine is responsible for:
//! - Detecting the current public address of each family, once per run
//! - Reconciling every configured record against the provider
//! - Handing each outcome to the run logger
//! - Pacing provider calls between records
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  DetectedAddresses  ┌──────────────┐
//! │  IpSource   │────────────────────►│  DdnsEngine  │
//! └─────────────┘                     └──────────────┘
//!                                             │
//!                        ┌────────────────────┼────────────────────┐
//!                        ▼                                         ▼
//!                ┌──────────────┐                          ┌──────────────┐
//!                │ DnsProvider  │                          │  RunLogger   │
//!                │ (reconcile)  │                          │  (record)    │
//!                └──────────────┘                          └──────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Detect IPv4 and IPv6 (fatal only if both are absent)
//! 2. For each record, for each family its ipmode permits and that was detected
//! 3. Reconcile, then log the outcome
//! 4. Pause for the pacing delay before the next record

mod reconcile;

pub use reconcile::{RecordEntry, ReconciliationOutcome, reconcile};

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RecordTarget;
use crate::error::{Error, Result};
use crate::runlog::RunLogger;
use crate::traits::{DnsProvider, IpFamily, IpSource};

/// The machine's public addresses for this run
///
/// Computed once and passed explicitly into every reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedAddresses {
    v4: Option<String>,
    v6: Option<String>,
}

impl DetectedAddresses {
    pub fn new(v4: Option<String>, v6: Option<String>) -> Self {
        Self { v4, v6 }
    }

    /// Address detected for `family`, if any
    pub fn get(&self, family: IpFamily) -> Option<&str> {
        match family {
            IpFamily::V4 => self.v4.as_deref(),
            IpFamily::V6 => self.v6.as_deref(),
        }
    }

    /// True when neither family was detected
    pub fn is_empty(&self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }
}

/// Outcome counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub ambiguous: usize,
    pub failed: usize,
}

impl RunSummary {
    fn tally(&mut self, outcome: &ReconciliationOutcome) {
        match outcome {
            ReconciliationOutcome::Created(_) => self.created += 1,
            ReconciliationOutcome::Updated { .. } => self.updated += 1,
            ReconciliationOutcome::Unchanged(_) => self.unchanged += 1,
            ReconciliationOutcome::Ambiguous { .. } => self.ambiguous += 1,
            ReconciliationOutcome::ApiError { .. } => self.failed += 1,
        }
    }

    /// Total reconciliation attempts
    pub fn attempts(&self) -> usize {
        self.created + self.updated + self.unchanged + self.ambiguous + self.failed
    }

    /// Attempts that ended in an error block
    pub fn errors(&self) -> usize {
        self.ambiguous + self.failed
    }
}

/// Core DDNS engine
///
/// Strictly sequential: one record, one family, one provider call at a
/// time. There is no cancellation; a run completes top to bottom.
pub struct DdnsEngine {
    /// DNS provider for reading and writing records
    provider: Box<dyn DnsProvider>,

    /// Pause taken between configured records
    pacing: Duration,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `pacing`: Delay between configured records (rate-limit mitigation)
    pub fn new(provider: Box<dyn DnsProvider>, pacing: Duration) -> Self {
        Self { provider, pacing }
    }

    /// Detect both address families
    ///
    /// # Returns
    ///
    /// - `Ok(DetectedAddresses)`: At least one family was detected
    /// - `Err(Error::Connectivity)`: Neither family was detected
    pub async fn detect_addresses(source: &dyn IpSource) -> Result<DetectedAddresses> {
        let v4 = source.discover(IpFamily::V4).await;
        let v6 = source.discover(IpFamily::V6).await;

        match (&v4, &v6) {
            (None, None) => {
                return Err(Error::connectivity(
                    "Unable to detect a public IPv4 or IPv6 address",
                ));
            }
            (Some(_), None) => warn!("No public IPv6 address detected, AAAA records skipped"),
            (None, Some(_)) => warn!("No public IPv4 address detected, A records skipped"),
            (Some(_), Some(_)) => {}
        }

        info!(
            "Detected addresses: IPv4={} IPv6={}",
            v4.as_deref().unwrap_or("-"),
            v6.as_deref().unwrap_or("-")
        );
        Ok(DetectedAddresses::new(v4, v6))
    }

    /// Reconcile every target against the provider
    ///
    /// Record-scoped failures are logged and counted; they never stop the
    /// loop.
    pub async fn run(
        &self,
        targets: &[RecordTarget],
        addresses: &DetectedAddresses,
        logger: &mut RunLogger,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        info!(
            "Reconciling {} record(s) via {}",
            targets.len(),
            self.provider.provider_name()
        );

        for (index, target) in targets.iter().enumerate() {
            for family in IpFamily::ALL {
                if !target.ip_mode().permits(family) {
                    continue;
                }

                let Some(address) = addresses.get(family) else {
                    debug!(
                        "Skipping {} for {}: no {} detected",
                        family.record_type(),
                        target.fqdn(),
                        family
                    );
                    continue;
                };

                let outcome = reconcile(self.provider.as_ref(), target, family, address).await;
                summary.tally(&outcome);
                logger.record(&outcome);
            }

            if index + 1 < targets.len() && !self.pacing.is_zero() {
                debug!("Pacing {:?} before next record", self.pacing);
                tokio::time::sleep(self.pacing).await;
            }
        }

        info!(
            "Run finished: {} created, {} updated, {} unchanged, {} ambiguous, {} failed",
            summary.created, summary.updated, summary.unchanged, summary.ambiguous, summary.failed
        );
        summary
    }
}
