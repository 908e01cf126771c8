//! Remote locator for one cluster entry point.
//!
//! Owns the session with the entry point, drives the connection state
//! machine, and turns locate responses into canonical hostnames.
//!
//! Two ways to locate a file:
//! - [`RemoteLocator::locate`] waits for the full exchange, bounded only by
//!   the per-operation time limit.
//! - [`RemoteLocator::locate_within`] runs the exchange on a spawned task and
//!   waits at most a short deadline. A response that misses the deadline is
//!   handed to a late-delivery callback instead of the caller.

use crate::base::connstate::ConnectionState;
use crate::base::locateerror::LocateError;
use crate::dns::ReverseResolve;
use crate::locate::descriptor::hosts_from_response;
use crate::locate::hostkey::HostKey;
use crate::locate::retry::{calculate_backoff, should_retry, AttemptOutcome, RetryConfig};
use crate::locate::transport::{Connector, Session};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// Observable state of a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorStatus {
    pub host: HostKey,
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

/// Outcome of a deadline-bounded locate.
#[derive(Debug)]
pub enum LocateOutcome {
    /// The response arrived in time.
    Ready(BTreeSet<String>),
    /// The exchange failed in time.
    Failed(LocateError),
    /// The deadline elapsed first; the result goes to the late callback.
    Pending,
}

impl From<Result<BTreeSet<String>, LocateError>> for LocateOutcome {
    fn from(result: Result<BTreeSet<String>, LocateError>) -> Self {
        match result {
            Ok(hosts) => LocateOutcome::Ready(hosts),
            Err(e) => LocateOutcome::Failed(e),
        }
    }
}

#[derive(Default)]
struct Link {
    session: Option<Box<dyn Session>>,
}

#[derive(Default)]
struct Status {
    state: ConnectionState,
    last_error: Option<String>,
    /// Bumped each time a connect loop gives up.
    failed_connects: u64,
    connect_error: Option<LocateError>,
}

/// Client for one cluster entry point.
pub struct RemoteLocator {
    host: HostKey,
    connector: Arc<dyn Connector>,
    resolver: Arc<dyn ReverseResolve>,
    retry: RetryConfig,
    link: tokio::sync::Mutex<Link>,
    status: Mutex<Status>,
}

impl RemoteLocator {
    /// Create a locator. No connection is made until the first locate.
    pub fn new(
        host: HostKey,
        connector: Arc<dyn Connector>,
        resolver: Arc<dyn ReverseResolve>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            host,
            connector,
            resolver,
            retry,
            link: tokio::sync::Mutex::new(Link::default()),
            status: Mutex::new(Status::default()),
        }
    }

    pub fn host(&self) -> &HostKey {
        &self.host
    }

    fn lock_status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        self.lock_status().state = state;
    }

    fn record_error(&self, state: ConnectionState, error: String) {
        let mut status = self.lock_status();
        status.state = state;
        status.last_error = Some(error);
    }

    fn record_connect_failure(&self, error: &LocateError, detail: String) {
        let mut status = self.lock_status();
        status.state = ConnectionState::Failed;
        status.last_error = Some(detail);
        status.failed_connects += 1;
        status.connect_error = Some(error.clone());
    }

    /// The error of a connect loop that gave up after generation `seen`.
    fn failed_since(&self, seen: u64) -> Option<LocateError> {
        let status = self.lock_status();
        if status.failed_connects > seen && status.state == ConnectionState::Failed {
            status.connect_error.clone()
        } else {
            None
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.lock_status().state
    }

    pub fn status(&self) -> LocatorStatus {
        let status = self.lock_status();
        LocatorStatus {
            host: self.host.clone(),
            state: status.state,
            last_error: status.last_error.clone(),
        }
    }

    /// Run the connect loop until a session is established or it gives up.
    async fn connect(&self, link: &mut Link) -> Result<(), LocateError> {
        self.set_state(ConnectionState::Connecting);

        let mut attempt = 0;
        let mut last_error = None;
        while should_retry(attempt, &self.retry) {
            let wait = calculate_backoff(attempt, &self.retry);
            if !wait.is_zero() {
                tracing::debug!(
                    host = %self.host,
                    wait_ms = wait.as_millis() as u64,
                    "connection attempt failed, sleeping"
                );
                tokio::time::sleep(wait).await;
            }

            tracing::debug!(host = %self.host, attempt = attempt + 1, "trying to connect");
            let result =
                match tokio::time::timeout(self.retry.op_time_limit, self.connector.connect(&self.host))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(LocateError::ConnectionTimedOut {
                        host: self.host.to_string(),
                    }),
                };

            match AttemptOutcome::from_result(result) {
                AttemptOutcome::Success(session) => {
                    link.session = Some(session);
                    self.set_state(ConnectionState::Connected);
                    tracing::info!(host = %self.host, attempts = attempt + 1, "access to server granted");
                    return Ok(());
                }
                AttemptOutcome::Abort(e) => {
                    tracing::warn!(host = %self.host, error = %e, "access to server failed, not retrying");
                    self.record_connect_failure(&e, e.to_string());
                    return Err(e);
                }
                AttemptOutcome::Retry(e) => {
                    tracing::warn!(
                        host = %self.host,
                        attempt = attempt + 1,
                        error = %e,
                        "access to server failed"
                    );
                    last_error = Some(e);
                }
            }
            attempt += 1;
        }

        let err = LocateError::RetriesExhausted {
            host: self.host.to_string(),
            attempts: attempt,
        };
        let detail = match &last_error {
            Some(last) => format!("{} (last error: {})", err, last),
            None => err.to_string(),
        };
        tracing::warn!(host = %self.host, error = %detail, "giving up on server");
        self.record_connect_failure(&err, detail);
        Err(err)
    }

    /// Locate `path`, connecting first if needed.
    ///
    /// Returns the canonical hostnames of every accepted node. Malformed or
    /// unresolvable descriptors are skipped; an empty response yields an
    /// empty set.
    ///
    /// A call that queued behind a connect loop which then gave up fails
    /// with that loop's error instead of starting another one.
    pub async fn locate(&self, path: &str) -> Result<BTreeSet<String>, LocateError> {
        let seen = self.lock_status().failed_connects;
        let mut link = self.link.lock().await;
        if link.session.is_none() {
            if let Some(e) = self.failed_since(seen) {
                tracing::debug!(host = %self.host, path = %path, error = %e, "server failed while queued");
                return Err(e);
            }
            self.connect(&mut link).await?;
        }

        let Some(session) = link.session.as_mut() else {
            return Err(LocateError::ConnectionClosed {
                host: self.host.to_string(),
            });
        };

        tracing::debug!(host = %self.host, path = %path, "issuing locate");
        let response = match tokio::time::timeout(self.retry.op_time_limit, session.locate(path)).await {
            Ok(response) => response,
            Err(_) => Err(LocateError::LocateTimedOut {
                host: self.host.to_string(),
                path: path.to_string(),
            }),
        };

        let text = match response {
            Ok(text) => text,
            Err(e) => {
                if e.invalidates_connection() {
                    link.session = None;
                    self.record_error(ConnectionState::Disconnected, e.to_string());
                } else {
                    self.record_error(ConnectionState::Connected, e.to_string());
                }
                tracing::debug!(host = %self.host, path = %path, error = %e, "locate failed");
                return Err(e);
            }
        };
        drop(link);

        let hosts = hosts_from_response(&text, self.resolver.as_ref()).await;
        tracing::debug!(host = %self.host, path = %path, count = hosts.len(), "locate complete");
        Ok(hosts)
    }

    /// Locate `path`, waiting at most `deadline` for the answer.
    ///
    /// Exactly one party observes the result: the caller when the outcome is
    /// `Ready` or `Failed`, `on_late` when the outcome is `Pending`.
    pub async fn locate_within<F>(
        self: &Arc<Self>,
        path: impl Into<String>,
        deadline: Duration,
        on_late: F,
    ) -> LocateOutcome
    where
        F: FnOnce(Result<BTreeSet<String>, LocateError>) + Send + 'static,
    {
        let path = path.into();
        let (tx, mut rx) = oneshot::channel();

        let locator = Arc::clone(self);
        tokio::spawn(async move {
            let result = locator.locate(&path).await;
            if let Err(result) = tx.send(result) {
                tracing::debug!(host = %locator.host, path = %path, "delivering late locate response");
                on_late(result);
            }
        });

        match tokio::time::timeout(deadline, &mut rx).await {
            Ok(Ok(result)) => result.into(),
            Ok(Err(_)) => LocateOutcome::Failed(LocateError::TaskAborted),
            Err(_) => {
                // Closing makes any later send fail, so the producer retires
                // the result itself. A value sent before the close is ours.
                rx.close();
                match rx.try_recv() {
                    Ok(result) => result.into(),
                    Err(_) => LocateOutcome::Pending,
                }
            }
        }
    }
}

impl std::fmt::Debug for RemoteLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.lock_status();
        f.debug_struct("RemoteLocator")
            .field("host", &self.host)
            .field("state", &status.state)
            .field("last_error", &status.last_error)
            .finish_non_exhaustive()
    }
}
