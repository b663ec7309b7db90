//! Contract Test: Whole-Run Behaviour
//!
//! Constraints verified:
//! - Each record is reconciled once per family its ipmode permits
//! - Families with no detected address are skipped, not failed
//! - A record-scoped failure never stops the remaining records
//! - Losing both families is fatal
//! - The persisted log holds the newest run first, within retention

mod common;

use common::*;
use ddns_core::runlog::{START_MARKER_PREFIX, count_runs};
use ddns_core::traits::{ApiOperation, RecordType};
use ddns_core::{DdnsEngine, DetectedAddresses, Error, RecordTarget, RunLogger};
use std::time::Duration;
use tempfile::tempdir;

fn targets(specs: &[&str]) -> Vec<RecordTarget> {
    specs.iter().map(|s| s.parse().expect("valid record spec")).collect()
}

fn dual_stack() -> DetectedAddresses {
    DetectedAddresses::new(Some("192.0.2.2".into()), Some("2001:db8::2".into()))
}

#[tokio::test]
async fn ip_mode_selects_families() {
    let provider = MockDnsProvider::new();
    let engine = DdnsEngine::new(Box::new(provider.clone()), Duration::ZERO);
    let dir = tempdir().unwrap();
    let mut logger = RunLogger::start(dir.path().join("run.log"), 5);

    let summary = engine
        .run(
            &targets(&["@:example.com::", "v4:example.com::v4", "v6:example.com::v6"]),
            &dual_stack(),
            &mut logger,
        )
        .await;

    assert_eq!(summary.created, 4);
    let retrieved: Vec<(String, RecordType)> = provider
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Retrieve {
                subdomain,
                record_type,
                ..
            } => Some((subdomain, record_type)),
            _ => None,
        })
        .collect();
    assert_eq!(
        retrieved,
        vec![
            ("".to_string(), RecordType::A),
            ("".to_string(), RecordType::Aaaa),
            ("v4".to_string(), RecordType::A),
            ("v6".to_string(), RecordType::Aaaa),
        ]
    );
}

#[tokio::test]
async fn missing_family_is_skipped() {
    let provider = MockDnsProvider::new();
    let engine = DdnsEngine::new(Box::new(provider.clone()), Duration::ZERO);
    let dir = tempdir().unwrap();
    let mut logger = RunLogger::start(dir.path().join("run.log"), 5);

    let v4_only = DetectedAddresses::new(Some("192.0.2.2".into()), None);
    let summary = engine
        .run(&targets(&["www:example.com::", "six:example.com::v6"]), &v4_only, &mut logger)
        .await;

    assert_eq!(summary.attempts(), 1);
    assert_eq!(summary.created, 1);
    assert!(provider.contents("example.com", "six", RecordType::Aaaa).is_empty());
}

#[tokio::test]
async fn ambiguous_record_does_not_stop_the_run() {
    let provider = MockDnsProvider::new()
        .with_record("example.com", "dup", RecordType::A, "192.0.2.1", 600)
        .with_record("example.com", "dup", RecordType::A, "192.0.2.1", 600);
    let engine = DdnsEngine::new(Box::new(provider.clone()), Duration::ZERO);
    let dir = tempdir().unwrap();
    let mut logger = RunLogger::start(dir.path().join("run.log"), 5);

    let summary = engine
        .run(
            &targets(&["dup:example.com::v4", "next:example.com::v4"]),
            &dual_stack(),
            &mut logger,
        )
        .await;

    assert_eq!(summary.ambiguous, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(
        provider.contents("example.com", "next", RecordType::A),
        vec![("192.0.2.2".to_string(), 600)]
    );
    assert!(logger.current_run().contains("manual cleanup required"));
    assert!(logger.current_run().contains("Result: CREATED"));
}

#[tokio::test]
async fn api_failures_are_isolated_per_record() {
    let provider = MockDnsProvider::new().failing(ApiOperation::Retrieve);
    let engine = DdnsEngine::new(Box::new(provider.clone()), Duration::ZERO);
    let dir = tempdir().unwrap();
    let mut logger = RunLogger::start(dir.path().join("run.log"), 5);

    let summary = engine
        .run(&targets(&["a:example.com::", "b:example.com::"]), &dual_stack(), &mut logger)
        .await;

    assert_eq!(summary.failed, 4);
    assert_eq!(provider.calls().len(), 4);
    assert!(logger.current_run().contains("Operation: retrieve"));
    assert!(logger.current_run().contains("Injected failure"));
}

#[tokio::test]
async fn repeated_runs_are_idempotent() {
    let provider = MockDnsProvider::new();
    let engine = DdnsEngine::new(Box::new(provider.clone()), Duration::ZERO);
    let dir = tempdir().unwrap();
    let records = targets(&["@:example.com::", "www:example.com:900:"]);

    let mut logger = RunLogger::start(dir.path().join("run.log"), 5);
    let first = engine.run(&records, &dual_stack(), &mut logger).await;
    assert_eq!(first.created, 4);

    provider.clear_calls();
    let mut logger = RunLogger::start(dir.path().join("run.log"), 5);
    let second = engine.run(&records, &dual_stack(), &mut logger).await;
    assert_eq!(second.unchanged, 4);
    assert_eq!(provider.write_count(), 0);
}

#[tokio::test]
async fn pacing_delay_is_taken_between_records() {
    let provider = MockDnsProvider::new();
    let engine = DdnsEngine::new(Box::new(provider), Duration::from_millis(30));
    let dir = tempdir().unwrap();
    let mut logger = RunLogger::start(dir.path().join("run.log"), 5);

    let started = std::time::Instant::now();
    engine
        .run(
            &targets(&["a:example.com::v4", "b:example.com::v4", "c:example.com::v4"]),
            &dual_stack(),
            &mut logger,
        )
        .await;

    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn no_connectivity_is_fatal() {
    let err = DdnsEngine::detect_addresses(&StaticIpSource::new(None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connectivity(_)));
    assert!(err.is_fatal());

    let detected = DdnsEngine::detect_addresses(&StaticIpSource::new(None, Some("2001:db8::1")))
        .await
        .unwrap();
    assert_eq!(detected.get(ddns_core::IpFamily::V6), Some("2001:db8::1"));
    assert_eq!(detected.get(ddns_core::IpFamily::V4), None);
}

#[tokio::test]
async fn log_keeps_newest_runs_within_retention() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.log");
    let provider = MockDnsProvider::new();
    let engine = DdnsEngine::new(Box::new(provider), Duration::ZERO);
    let records = targets(&["www:example.com::v4"]);

    for (run, ip) in ["192.0.2.1", "192.0.2.2", "192.0.2.3", "192.0.2.4"].iter().enumerate() {
        let addresses = DetectedAddresses::new(Some(ip.to_string()), None);
        let mut logger = RunLogger::start(path.clone(), 3);
        engine.run(&records, &addresses, &mut logger).await;
        logger.finalize().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(count_runs(&text), 3.min(run + 1));
        assert!(text.starts_with(START_MARKER_PREFIX));
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let newest = text.find("192.0.2.3 > 192.0.2.4").expect("newest transition logged");
    let older = text.find("192.0.2.2 > 192.0.2.3").expect("previous transition logged");
    assert!(newest < older);
    assert!(!text.contains("Result: CREATED"), "oldest run rotated out");
}
