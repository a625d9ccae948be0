//! Coordinator integration tests
//!
//! These tests drive resolution, probing, classification and enrichment with
//! in-memory resolvers, probers and enrichers so they run without a network.

use async_trait::async_trait;
use colo_latency_probe::{
    dns::{AddressResolver, CatalogResolver},
    enrich::{Enricher, EnrichmentPipeline},
    executor::{sort_results, ProbeSession, ProgressObserver, RunConfiguration},
    models::{Endpoint, Enrichment, ProbeResult, ProbeTarget, ResolvedAddress},
    probe::{ProbeOutcome, Prober},
    AppError, FailureKind, ProbeStatus,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Resolver answering from a fixed table; unknown domains are NXDOMAIN
#[derive(Default)]
struct TableResolver {
    answers: HashMap<String, Vec<IpAddr>>,
    queries: Mutex<Vec<String>>,
}

impl TableResolver {
    fn with(mut self, domain: &str, addresses: &[&str]) -> Self {
        self.answers.insert(
            domain.to_string(),
            addresses.iter().map(|a| a.parse().unwrap()).collect(),
        );
        self
    }
}

#[async_trait]
impl AddressResolver for TableResolver {
    async fn resolve(&self, domain: &str) -> colo_latency_probe::Result<Vec<IpAddr>> {
        self.queries.lock().unwrap().push(domain.to_string());
        match self.answers.get(domain) {
            Some(addresses) if !addresses.is_empty() => Ok(addresses.clone()),
            _ => Err(AppError::dns_resolution(format!("NXDOMAIN: {}", domain))),
        }
    }
}

/// Prober with a scripted outcome per address and in-flight accounting
struct ScriptedProber {
    outcomes: HashMap<IpAddr, ProbeOutcome>,
    delay: Duration,
    stalled: HashSet<IpAddr>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedProber {
    fn new(delay: Duration) -> Self {
        Self {
            outcomes: HashMap::new(),
            delay,
            stalled: HashSet::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn latency(mut self, address: &str, ms: u64) -> Self {
        self.outcomes.insert(
            address.parse().unwrap(),
            ProbeOutcome::Success {
                elapsed: Duration::from_millis(ms),
            },
        );
        self
    }

    /// Never answers for `address`
    fn stalling(mut self, address: &str) -> Self {
        self.stalled.insert(address.parse().unwrap());
        self
    }

    fn failing(mut self, address: &str, kind: FailureKind) -> Self {
        self.outcomes
            .insert(address.parse().unwrap(), ProbeOutcome::failure(kind, "scripted failure"));
        self
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _domain: &str, address: IpAddr) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.stalled.contains(&address) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.outcomes.get(&address).cloned().unwrap_or(ProbeOutcome::Success {
            elapsed: Duration::from_millis(1),
        })
    }
}

struct CountingEnricher {
    calls: AtomicUsize,
}

#[async_trait]
impl Enricher for CountingEnricher {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn enrich(&self, address: IpAddr) -> Option<Enrichment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(Enrichment {
            country: Some(format!("country-of-{}", address)),
            ..Enrichment::default()
        })
    }
}

#[derive(Default)]
struct CountingObserver {
    completions: AtomicUsize,
    last_total: AtomicUsize,
}

impl ProgressObserver for CountingObserver {
    fn on_probe_complete(&self, _result: &ProbeResult, _completed: usize, total: usize) {
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.last_total.store(total, Ordering::SeqCst);
    }
}

fn run_config(workers: usize) -> RunConfiguration {
    RunConfiguration {
        workers,
        probe_timeout: Duration::from_secs(4),
        threshold: Duration::from_millis(12),
        port: 443,
    }
}

fn address_target(name: &str, domain: &str, ip: &str) -> ProbeTarget {
    ResolvedAddress::new(Arc::new(Endpoint::new(name, "Test", domain)), ip.parse().unwrap()).into()
}

#[tokio::test]
async fn test_one_record_per_target() {
    let resolver = TableResolver::default()
        .with("a.example", &["10.0.0.1", "10.0.0.2"])
        .with("b.example", &["10.0.1.1"]);
    let endpoints = vec![
        Endpoint::new("A", "Spot", "a.example"),
        Endpoint::new("B", "Spot", "b.example"),
        Endpoint::new("C", "Futures", "missing.example"),
    ];

    let resolution = CatalogResolver::new(resolver, 8).expand(&endpoints).await;
    assert_eq!(resolution.targets.len(), 4);

    let observer = Arc::new(CountingObserver::default());
    let session = ProbeSession::new(run_config(8), Arc::new(ScriptedProber::new(Duration::ZERO)))
        .with_observer(observer.clone());
    let results = assert_ok!(session.run(resolution.targets).await);

    assert_eq!(results.len(), 4);
    assert_eq!(observer.completions.load(Ordering::SeqCst), 4);
    assert_eq!(observer.last_total.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let prober = ScriptedProber::new(Duration::ZERO)
        .latency("10.0.0.1", 3)
        .failing("10.0.0.2", FailureKind::ConnectionRefused)
        .failing("10.0.0.3", FailureKind::Handshake)
        .latency("10.0.0.4", 40);

    let session = ProbeSession::new(run_config(2), Arc::new(prober));
    let results = assert_ok!(
        session
            .run(vec![
                address_target("A", "a.example", "10.0.0.1"),
                address_target("B", "b.example", "10.0.0.2"),
                address_target("C", "c.example", "10.0.0.3"),
                address_target("D", "d.example", "10.0.0.4"),
            ])
            .await
    );

    let by_name: HashMap<&str, &ProbeResult> = results.iter().map(|r| (r.name(), r)).collect();
    assert_eq!(by_name["A"].status(), ProbeStatus::CoLocated);
    assert_eq!(by_name["B"].status(), ProbeStatus::Unreachable);
    assert_eq!(by_name["B"].failure().unwrap().kind, FailureKind::ConnectionRefused);
    assert_eq!(by_name["C"].failure().unwrap().kind, FailureKind::Handshake);
    assert_eq!(by_name["D"].status(), ProbeStatus::ReachableDistant);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_probes_never_exceed_workers() {
    let prober = Arc::new(ScriptedProber::new(Duration::from_millis(100)));
    let targets: Vec<ProbeTarget> = (1..=20)
        .map(|i| address_target(&format!("E{:02}", i), "e.example", &format!("10.0.0.{}", i)))
        .collect();

    let started = tokio::time::Instant::now();
    let session = ProbeSession::new(run_config(3), prober.clone());
    let results = assert_ok!(session.run(targets).await);

    assert_eq!(results.len(), 20);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 20);
    assert_eq!(prober.max_in_flight.load(Ordering::SeqCst), 3);

    // ceil(20 / 3) waves of 100 ms each
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(700), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(800), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_run_respects_worst_case_bound() {
    let config = RunConfiguration {
        probe_timeout: Duration::from_millis(250),
        ..run_config(4)
    };
    let prober = Arc::new(ScriptedProber::new(Duration::from_secs(30)));
    let targets: Vec<ProbeTarget> = (1..=10)
        .map(|i| address_target("SLOWPOKE", "s.example", &format!("10.0.1.{}", i)))
        .collect();

    let started = tokio::time::Instant::now();
    let results = assert_ok!(ProbeSession::new(config, prober).run(targets).await);

    assert!(results
        .iter()
        .all(|r| r.failure().map(|f| f.kind) == Some(FailureKind::Timeout)));
    assert!(started.elapsed() <= config.worst_case_probe_time(10) + Duration::from_millis(5));
}

#[tokio::test]
async fn test_colocated_and_distant_scenario() {
    let resolver = TableResolver::default()
        .with("a.example", &["10.1.0.1"])
        .with("b.example", &["10.2.0.1"]);
    let prober = ScriptedProber::new(Duration::ZERO)
        .latency("10.1.0.1", 8)
        .latency("10.2.0.1", 20);
    let endpoints = vec![
        Endpoint::new("B", "Spot", "b.example"),
        Endpoint::new("A", "Spot", "a.example"),
    ];

    let resolution = CatalogResolver::new(resolver, 4).expand(&endpoints).await;
    let results = assert_ok!(
        ProbeSession::new(run_config(4), Arc::new(prober))
            .run(resolution.targets)
            .await
    );

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name(), "A");
    assert_eq!(results[0].status(), ProbeStatus::CoLocated);
    assert_eq!(results[0].latency_ms(), Some(8.0));
    assert_eq!(results[1].name(), "B");
    assert_eq!(results[1].status(), ProbeStatus::ReachableDistant);
    assert_eq!(results[1].latency_ms(), Some(20.0));
}

#[tokio::test]
async fn test_unresolved_endpoint_yields_sentinel() {
    let resolver = TableResolver::default().with("ok.example", &["10.3.0.1"]);
    let prober = Arc::new(ScriptedProber::new(Duration::ZERO));
    let endpoints = vec![
        Endpoint::new("GONE", "Spot", "nx.example"),
        Endpoint::new("OK", "Spot", "ok.example"),
    ];

    let resolution = CatalogResolver::new(resolver, 4).expand(&endpoints).await;
    assert_eq!(resolution.stats.sentinels, 1);

    let results = assert_ok!(
        ProbeSession::new(run_config(4), prober.clone())
            .run(resolution.targets)
            .await
    );

    // Sentinels are never probed
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);

    let gone = results.iter().find(|r| r.name() == "GONE").unwrap();
    assert_eq!(gone.status(), ProbeStatus::Unreachable);
    assert!(gone.address().is_none());
    assert!(gone.latency_ms().is_none());
    assert_eq!(gone.failure().unwrap().kind, FailureKind::Resolution);
    assert!(gone.failure().unwrap().detail.contains("NXDOMAIN"));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_address_leaves_other_measurements_untouched() {
    let prober = ScriptedProber::new(Duration::ZERO)
        .latency("10.0.0.1", 8)
        .stalling("10.0.0.2")
        .latency("10.0.0.3", 20)
        .latency("10.0.0.4", 5);

    let session = ProbeSession::new(run_config(2), Arc::new(prober));
    let results = assert_ok!(
        session
            .run(vec![
                address_target("A", "a.example", "10.0.0.1"),
                address_target("B", "b.example", "10.0.0.2"),
                address_target("C", "c.example", "10.0.0.3"),
                address_target("D", "d.example", "10.0.0.4"),
            ])
            .await
    );

    let by_name: HashMap<&str, &ProbeResult> = results.iter().map(|r| (r.name(), r)).collect();
    assert_eq!(by_name["A"].status(), ProbeStatus::CoLocated);
    assert_eq!(by_name["A"].latency_ms(), Some(8.0));
    assert_eq!(by_name["B"].status(), ProbeStatus::Unreachable);
    assert_eq!(by_name["B"].failure().unwrap().kind, FailureKind::Timeout);
    assert!(by_name["B"].latency_ms().is_none());
    assert_eq!(by_name["C"].status(), ProbeStatus::ReachableDistant);
    assert_eq!(by_name["C"].latency_ms(), Some(20.0));
    assert_eq!(by_name["D"].status(), ProbeStatus::CoLocated);
    assert_eq!(by_name["D"].latency_ms(), Some(5.0));
}

#[tokio::test]
async fn test_shared_domain_resolved_once() {
    let resolver = Arc::new(TableResolver::default().with("shared.example", &["10.4.0.2", "10.4.0.1"]));
    let endpoints = vec![
        Endpoint::new("REST", "Spot", "shared.example"),
        Endpoint::new("WS", "Spot", "shared.example"),
    ];

    let resolution = CatalogResolver::new(resolver.clone(), 4).expand(&endpoints).await;

    assert_eq!(resolver.queries.lock().unwrap().len(), 1);
    assert_eq!(resolution.targets.len(), 4);
    let addresses: Vec<String> = resolution
        .targets
        .iter()
        .take(2)
        .map(|t| t.address().unwrap().to_string())
        .collect();
    assert_eq!(addresses, vec!["10.4.0.1", "10.4.0.2"]);
}

#[tokio::test]
async fn test_duplicate_answers_yield_one_record_per_address() {
    let resolver = TableResolver::default().with("dup.example", &["10.5.0.2", "10.5.0.1", "10.5.0.2"]);
    let endpoints = vec![Endpoint::new("REST", "Spot", "dup.example")];

    let resolution = CatalogResolver::new(resolver, 4).expand(&endpoints).await;
    assert_eq!(resolution.targets.len(), 2);

    let results = assert_ok!(
        ProbeSession::new(run_config(4), Arc::new(ScriptedProber::new(Duration::ZERO)))
            .run(resolution.targets)
            .await
    );
    let addresses: Vec<String> = results.iter().map(|r| r.address().unwrap().to_string()).collect();
    assert_eq!(addresses, vec!["10.5.0.1", "10.5.0.2"]);
}

#[tokio::test]
async fn test_enrichment_once_per_address_and_skips_sentinels() {
    let enricher = Arc::new(CountingEnricher {
        calls: AtomicUsize::new(0),
    });
    let mut pipeline = EnrichmentPipeline::new(Duration::from_secs(1));
    pipeline.push(enricher.clone());

    let session = ProbeSession::new(run_config(4), Arc::new(ScriptedProber::new(Duration::ZERO)))
        .with_enrichment(pipeline);
    let results = assert_ok!(
        session
            .run(vec![
                address_target("REST", "shared.example", "10.5.0.1"),
                address_target("WS", "shared.example", "10.5.0.1"),
                ProbeTarget::Unresolved {
                    endpoint: Arc::new(Endpoint::new("GONE", "Spot", "nx.example")),
                    reason: "NXDOMAIN".to_string(),
                },
            ])
            .await
    );

    assert_eq!(enricher.calls.load(Ordering::SeqCst), 1);
    let rest = results.iter().find(|r| r.name() == "REST").unwrap();
    assert_eq!(rest.enrichment().country.as_deref(), Some("country-of-10.5.0.1"));
    let gone = results.iter().find(|r| r.name() == "GONE").unwrap();
    assert!(gone.enrichment().is_empty());
}

#[tokio::test]
async fn test_all_failures_is_not_an_error() {
    let prober = ScriptedProber::new(Duration::ZERO)
        .failing("10.6.0.1", FailureKind::Timeout)
        .failing("10.6.0.2", FailureKind::Connection);
    let results = assert_ok!(
        ProbeSession::new(run_config(2), Arc::new(prober))
            .run(vec![
                address_target("X", "x.example", "10.6.0.1"),
                address_target("Y", "y.example", "10.6.0.2"),
            ])
            .await
    );
    assert!(results.iter().all(|r| r.status() == ProbeStatus::Unreachable));
}

#[tokio::test]
async fn test_empty_catalog_is_config_error() {
    let session = ProbeSession::new(run_config(2), Arc::new(ScriptedProber::new(Duration::ZERO)));
    let err = assert_err!(session.run(Vec::new()).await);
    assert_eq!(err.category(), "CONFIG");
}

fn arbitrary_result() -> impl Strategy<Value = ProbeResult> {
    (0u8..4, 0u8..4, prop::option::of(1u64..50)).prop_map(|(name, host, ms)| {
        let endpoint = Arc::new(Endpoint::new(
            format!("N{}", name),
            "Test",
            format!("d{}.example", host),
        ));
        let target = ResolvedAddress::new(endpoint, IpAddr::from([10, 0, name, host]));
        let outcome = match ms {
            Some(ms) => ProbeOutcome::Success {
                elapsed: Duration::from_millis(ms),
            },
            None => ProbeOutcome::failure(FailureKind::Timeout, "timed out"),
        };
        ProbeResult::measured(&target, &outcome, Duration::from_millis(12))
    })
}

proptest! {
    #[test]
    fn prop_sorting_is_idempotent(mut results in prop::collection::vec(arbitrary_result(), 0..40)) {
        sort_results(&mut results);
        let once = results.clone();
        sort_results(&mut results);
        prop_assert_eq!(once, results);
    }

    #[test]
    fn prop_sorted_order_is_by_name_then_address(mut results in prop::collection::vec(arbitrary_result(), 0..40)) {
        sort_results(&mut results);
        for pair in results.windows(2) {
            prop_assert!(pair[0].sort_key() <= pair[1].sort_key());
        }
    }
}
