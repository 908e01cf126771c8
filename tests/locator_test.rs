//! Remote Locator Tests
//!
//! Covers:
//! - Connect loop: lazy connect, retries, non-retryable failures, exhaustion
//! - Connection invalidation on rejection and request timeout
//! - Deadline-bounded locate with late delivery
//!
//! Runs on paused time; sleeps in the mocks advance the clock instantly.

use xrdsites::base::connstate::ConnectionState;
use xrdsites::base::locateerror::LocateError;
use xrdsites::dns::NumericResolver;
use xrdsites::locate::{
    Connecting, Connector, HostKey, LocateOutcome, Locating, RemoteLocator, RetryConfig, Session,
};

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

#[derive(Default)]
struct Cluster {
    connect_failures: Mutex<VecDeque<LocateError>>,
    connect_delay: Duration,
    responses: HashMap<String, (Duration, Result<String, LocateError>)>,
    connects: AtomicUsize,
    locates: AtomicUsize,
}

impl Cluster {
    fn fail_connects(self, errors: Vec<LocateError>) -> Self {
        *self.connect_failures.lock().unwrap() = errors.into();
        self
    }

    fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    fn respond(mut self, path: &str, delay_ms: u64, result: Result<&str, LocateError>) -> Self {
        self.responses.insert(
            path.to_string(),
            (Duration::from_millis(delay_ms), result.map(String::from)),
        );
        self
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn locates(&self) -> usize {
        self.locates.load(Ordering::SeqCst)
    }
}

struct MockConnector(Arc<Cluster>);

impl Connector for MockConnector {
    fn connect(&self, _host: &HostKey) -> Connecting {
        let cluster = Arc::clone(&self.0);
        Box::pin(async move {
            cluster.connects.fetch_add(1, Ordering::SeqCst);
            if !cluster.connect_delay.is_zero() {
                tokio::time::sleep(cluster.connect_delay).await;
            }
            let failure = cluster.connect_failures.lock().unwrap().pop_front();
            match failure {
                Some(e) => Err(e),
                None => Ok(Box::new(MockSession { cluster }) as Box<dyn Session>),
            }
        })
    }
}

struct MockSession {
    cluster: Arc<Cluster>,
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MockSession")
    }
}

impl Session for MockSession {
    fn locate(&mut self, path: &str) -> Locating<'_> {
        let cluster = Arc::clone(&self.cluster);
        let path = path.to_string();
        Box::pin(async move {
            cluster.locates.fetch_add(1, Ordering::SeqCst);
            let (delay, result) = cluster
                .responses
                .get(&path)
                .cloned()
                .unwrap_or((Duration::ZERO, Ok(String::new())));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

fn retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        reconnect_wait: Duration::from_secs(1),
        op_time_limit: Duration::from_secs(10),
    }
}

fn locator(cluster: &Arc<Cluster>) -> Arc<RemoteLocator> {
    Arc::new(RemoteLocator::new(
        HostKey::new("redirector.example.org", 1094),
        Arc::new(MockConnector(Arc::clone(cluster))),
        Arc::new(NumericResolver::new()),
        retry_config(),
    ))
}

fn transient(host: &str) -> LocateError {
    LocateError::ConnectionFailed {
        host: host.to_string(),
        reason: "connection refused".to_string(),
    }
}

fn hosts(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|h| h.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_connects_lazily_and_reuses_session() {
    let cluster = Arc::new(Cluster::default().respond("/f1", 0, Ok("Sr[::10.0.0.5]:1094")));
    let locator = locator(&cluster);

    assert_eq!(cluster.connects(), 0);
    assert_eq!(locator.state(), ConnectionState::Disconnected);

    assert_eq!(locator.locate("/f1").await.unwrap(), hosts(&["10.0.0.5"]));
    assert_eq!(locator.state(), ConnectionState::Connected);

    locator.locate("/f1").await.unwrap();
    assert_eq!(cluster.connects(), 1);
    assert_eq!(cluster.locates(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let cluster = Arc::new(
        Cluster::default()
            .fail_connects(vec![transient("a"), transient("a")])
            .respond("/f1", 0, Ok("Sr[::10.0.0.5]:1094")),
    );
    let locator = locator(&cluster);

    let start = Instant::now();
    assert_eq!(locator.locate("/f1").await.unwrap(), hosts(&["10.0.0.5"]));

    assert_eq!(cluster.connects(), 3);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(locator.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_auth_failure_is_not_retried() {
    let cluster = Arc::new(Cluster::default().fail_connects(vec![LocateError::NotAuthorized {
        host: "redirector.example.org:1094".to_string(),
        message: "no credentials".to_string(),
    }]));
    let locator = locator(&cluster);

    let err = locator.locate("/f1").await.unwrap_err();
    assert!(matches!(err, LocateError::NotAuthorized { .. }));
    assert_eq!(cluster.connects(), 1);

    let status = locator.status();
    assert_eq!(status.state, ConnectionState::Failed);
    assert!(status.last_error.unwrap().contains("no credentials"));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_server_type_is_not_retried() {
    let cluster = Arc::new(Cluster::default().fail_connects(vec![LocateError::UnknownServerType {
        host: "redirector.example.org:1094".to_string(),
    }]));
    let locator = locator(&cluster);

    let err = locator.locate("/f1").await.unwrap_err();
    assert!(matches!(err, LocateError::UnknownServerType { .. }));
    assert_eq!(cluster.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_then_fresh_start() {
    let cluster = Arc::new(Cluster::default().fail_connects(vec![
        transient("a"),
        transient("a"),
        transient("a"),
        transient("a"),
    ]));
    let locator = locator(&cluster);

    let err = locator.locate("/f1").await.unwrap_err();
    assert!(matches!(err, LocateError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(locator.state(), ConnectionState::Failed);
    assert!(locator
        .status()
        .last_error
        .unwrap()
        .contains("connection refused"));

    // The next call starts a new connect loop.
    assert!(locator.locate("/f1").await.unwrap().is_empty());
    assert_eq!(cluster.connects(), 5);
    assert_eq!(locator.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_connect_attempts_are_time_limited() {
    let cluster = Arc::new(Cluster::default().connect_delay(Duration::from_secs(30)));
    let locator = locator(&cluster);

    let start = Instant::now();
    let err = locator.locate("/f1").await.unwrap_err();

    assert!(matches!(err, LocateError::RetriesExhausted { attempts: 3, .. }));
    // Three 10s attempts and two 1s waits.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(32) && elapsed < Duration::from_secs(33));
}

#[tokio::test(start_paused = true)]
async fn test_rejection_drops_connection() {
    let cluster = Arc::new(
        Cluster::default()
            .respond(
                "/bad",
                0,
                Err(LocateError::Rejected {
                    host: "redirector.example.org:1094".to_string(),
                    path: "/bad".to_string(),
                    message: "no such namespace".to_string(),
                }),
            )
            .respond("/f1", 0, Ok("Sr[::10.0.0.5]:1094")),
    );
    let locator = locator(&cluster);

    let err = locator.locate("/bad").await.unwrap_err();
    assert!(matches!(err, LocateError::Rejected { .. }));
    assert_eq!(locator.state(), ConnectionState::Disconnected);

    assert_eq!(locator.locate("/f1").await.unwrap(), hosts(&["10.0.0.5"]));
    assert_eq!(cluster.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_request_times_out_and_disconnects() {
    let cluster = Arc::new(Cluster::default().respond("/slow", 20_000, Ok("Sr[::10.0.0.5]:1094")));
    let locator = locator(&cluster);

    let err = locator.locate("/slow").await.unwrap_err();
    assert!(matches!(err, LocateError::LocateTimedOut { .. }));
    assert_eq!(locator.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_response_with_bad_tokens_is_partial() {
    let cluster = Arc::new(Cluster::default().respond(
        "/f1",
        0,
        Ok("Sr[:: Sr[::10.0.0.5]:1094 Xr[::10.0.0.6]:1094 mw[::10.0.0.7]:1094"),
    ));
    let locator = locator(&cluster);

    assert_eq!(
        locator.locate("/f1").await.unwrap(),
        hosts(&["10.0.0.5", "10.0.0.7"])
    );
}

#[tokio::test(start_paused = true)]
async fn test_bounded_wait_returns_fast_response() {
    let cluster = Arc::new(Cluster::default().respond("/f1", 10, Ok("Sr[::10.0.0.5]:1094")));
    let locator = locator(&cluster);
    let late_calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&late_calls);
    let outcome = locator
        .locate_within("/f1", Duration::from_millis(50), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    match outcome {
        LocateOutcome::Ready(found) => assert_eq!(found, hosts(&["10.0.0.5"])),
        other => panic!("expected Ready, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_wait_times_out_and_delivers_late() {
    let cluster = Arc::new(
        Cluster::default()
            .respond("/slow", 200, Ok("Sr[::10.0.0.5]:1094"))
            .respond("/f2", 0, Ok("Sr[::10.0.0.6]:1094")),
    );
    let locator = locator(&cluster);
    let late_calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = oneshot::channel();

    let counter = Arc::clone(&late_calls);
    let start = Instant::now();
    let outcome = locator
        .locate_within("/slow", Duration::from_millis(50), move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        })
        .await;

    assert!(matches!(outcome, LocateOutcome::Pending));
    assert!(start.elapsed() < Duration::from_millis(200));

    let late = rx.await.unwrap().unwrap();
    assert_eq!(late, hosts(&["10.0.0.5"]));
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);

    // The locator is still usable after the abandoned wait.
    assert_eq!(locator.locate("/f2").await.unwrap(), hosts(&["10.0.0.6"]));
    assert_eq!(cluster.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_wait_reports_fast_failure() {
    let cluster = Arc::new(Cluster::default().fail_connects(vec![LocateError::NotAuthorized {
        host: "redirector.example.org:1094".to_string(),
        message: "denied".to_string(),
    }]));
    let locator = locator(&cluster);

    let outcome = locator
        .locate_within("/f1", Duration::from_millis(50), |_| {
            panic!("a result delivered to the caller must not be delivered late");
        })
        .await;

    assert!(matches!(
        outcome,
        LocateOutcome::Failed(LocateError::NotAuthorized { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_queued_locates_share_one_failed_connect_loop() {
    let cluster = Arc::new(Cluster::default().connect_delay(Duration::from_secs(3600)));
    let locator = locator(&cluster);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    for i in 0..5 {
        let tx = tx.clone();
        let outcome = locator
            .locate_within(format!("/store/f{}", i), Duration::from_millis(50), move |result| {
                let _ = tx.send(result);
            })
            .await;
        assert!(matches!(outcome, LocateOutcome::Pending));
    }
    drop(tx);

    let start = Instant::now();
    let mut late = Vec::new();
    while let Some(result) = rx.recv().await {
        late.push(result);
    }

    assert_eq!(late.len(), 5);
    assert!(late
        .iter()
        .all(|r| matches!(r, Err(LocateError::RetriesExhausted { attempts: 3, .. }))));
    // One loop of three attempts, not one loop per queued request.
    assert_eq!(cluster.connects(), 3);
    assert!(start.elapsed() < Duration::from_secs(33));

    // A call made after the failure starts over.
    assert!(locator.locate("/store/f0").await.is_err());
    assert_eq!(cluster.connects(), 6);
}
