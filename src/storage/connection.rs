//! Connection manager.
//!
//! Turns a [`Connector`] and fixed [`ConnectionParams`] into [`Handle`]s,
//! retrying transient failures with a fixed backoff. The default policy
//! covers a database container that is still initializing: 5 attempts,
//! 3 seconds apart.

use std::sync::Arc;
use std::time::Duration;

use crate::retry::{RetryPolicy, retry};
use crate::storage::db::Connector;
use crate::storage::{ConnectionError, ConnectionParams, Handle, StorageError};

/// Default connection policy (5 attempts, 3 seconds apart).
pub const DEFAULT_CONNECT_RETRY: RetryPolicy = RetryPolicy::new(5, Duration::from_secs(3));

/// Hands out one fresh [`Handle`] per operation.
///
/// Cheap to clone; clones share the connector and parameters.
#[derive(Clone)]
pub struct ConnectionManager {
    params: Arc<ConnectionParams>,
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("params", &self.params)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager with the default connection policy.
    pub fn new(params: &ConnectionParams, connector: Arc<dyn Connector>) -> Self {
        Self {
            params: Arc::new(params.clone()),
            connector,
            policy: DEFAULT_CONNECT_RETRY,
        }
    }

    /// Set the retry policy for [`acquire`](Self::acquire).
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Connection parameters used for every attempt.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Current retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Open a handle, retrying transient failures.
    ///
    /// Returns on the first successful attempt. Fails with
    /// [`ConnectionError`] once the policy is exhausted or a failure is not
    /// transient.
    pub async fn acquire(&self) -> Result<Handle, ConnectionError> {
        let connector = &self.connector;
        let params = self.params.as_ref();

        retry(self.policy, "connect", StorageError::is_transient, |attempt| {
            tracing::debug!(attempt, db = %params, "Connecting to database");
            connector.connect(params)
        })
        .await
        .map(Handle::new)
        .map_err(|e| ConnectionError {
            attempts: e.attempts,
            source: e.last,
        })
    }
}
