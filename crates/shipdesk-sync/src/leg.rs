//! Per-pass state of the remote leg.
//!
//! A pass opens one [`RemoteLeg`] and routes every remote call through it.
//! The leg is skipped up front when there is no remote, the oracle says it
//! is unreachable, or nobody is signed in. During the pass the first
//! unreachable, unauthorized or timed-out call takes it down for good;
//! a plain backend error is recorded but the leg stays up.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::connectivity::ConnectivityOracle;
use crate::error::{StoreError, StoreResult, SyncError};
use crate::store::RemoteStore;

pub(crate) struct RemoteLeg {
    store: Option<Arc<dyn RemoteStore>>,
    oracle: Arc<dyn ConnectivityOracle>,
    timeout: Duration,
    down: bool,
    clean: bool,
    issues: Vec<String>,
}

impl RemoteLeg {
    pub(crate) fn open(
        store: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
        timeout: Duration,
    ) -> Self {
        let mut leg = RemoteLeg {
            store,
            oracle,
            timeout,
            down: false,
            clean: true,
            issues: Vec::new(),
        };

        let auth = leg.store.as_ref().map(|s| s.requires_authenticated_user());
        match auth {
            None => {
                debug!("No remote store configured, local only");
                leg.down = true;
                leg.clean = false;
            }
            Some(_) if !leg.oracle.is_reachable() => {
                leg.mark_down("remote unreachable, remote leg skipped".to_string());
            }
            Some(Err(err)) => {
                let issue = SyncError::remote("session check", err).to_string();
                leg.mark_down(issue);
            }
            Some(Ok(())) => {}
        }

        leg
    }

    /// The store, if the leg is still up and the oracle still agrees.
    pub(crate) fn active(&mut self) -> Option<Arc<dyn RemoteStore>> {
        if self.down {
            return None;
        }
        if !self.oracle.is_reachable() {
            self.mark_down("connectivity lost, remote leg stopped".to_string());
            return None;
        }
        self.store.clone()
    }

    /// Awaits one remote call under the per-operation time limit.
    ///
    /// Failures are recorded and turn into `None`.
    pub(crate) async fn call<T>(
        &mut self,
        operation: impl fmt::Display,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> Option<T> {
        let outcome = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                let takes_leg_down = !matches!(err, StoreError::Backend(_));
                let issue = SyncError::remote(&operation, err).to_string();
                warn!(%operation, %issue, "Remote operation failed");

                self.clean = false;
                self.issues.push(issue);
                if takes_leg_down {
                    self.down = true;
                }
                None
            }
        }
    }

    fn mark_down(&mut self, issue: String) {
        warn!(%issue, "Remote leg down");
        self.down = true;
        self.clean = false;
        self.issues.push(issue);
    }

    /// True when the leg ran the whole pass without a single failure.
    pub(crate) fn applied(&self) -> bool {
        self.clean
    }

    pub(crate) fn into_issues(self) -> Vec<String> {
        self.issues
    }
}
