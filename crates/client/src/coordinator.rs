// ================
// crates/client/src/coordinator.rs
// ================
//! Refresh coordination for a client process.
//!
//! At most one refresh runs at a time. Callers that need a fresh access token
//! while a refresh is in flight join it instead of starting another one. The
//! in-flight slot is cleared a short grace window after the refresh settles,
//! so callers arriving just after completion still join the finished result.
//!
//! The refresh itself runs on its own task: a caller that gives up only drops
//! its handle, the refresh keeps going for everybody else.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{ClientError, RefreshError};

/// How long a settled refresh stays joinable
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(100);

/// Performs one refresh round-trip
#[async_trait::async_trait]
pub trait Refresher: Send + Sync + 'static {
    async fn refresh(&self) -> Result<(), RefreshError>;
}

/// A response that may signal an expired or missing access token
pub trait Reply {
    fn is_unauthorized(&self) -> bool;
}

type SharedRefresh = Shared<BoxFuture<'static, Result<(), RefreshError>>>;

struct InFlight {
    generation: u64,
    refresh: SharedRefresh,
}

type Slot = Arc<Mutex<Option<InFlight>>>;

/// Empties the slot when the refresh task ends, unless a newer refresh owns it
struct ClearSlot {
    slot: Slot,
    generation: u64,
}

impl Drop for ClearSlot {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|f| f.generation == self.generation) {
            *slot = None;
        }
    }
}

pub struct RefreshCoordinator<R> {
    refresher: Arc<R>,
    slot: Slot,
    generation: AtomicU64,
    grace: Duration,
}

impl<R: Refresher> RefreshCoordinator<R> {
    pub fn new(refresher: R) -> Self {
        Self::with_grace_window(refresher, DEFAULT_GRACE_WINDOW)
    }

    pub fn with_grace_window(refresher: R, grace: Duration) -> Self {
        Self {
            refresher: Arc::new(refresher),
            slot: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
            grace,
        }
    }

    /// Make sure a refresh has happened, joining one already in flight.
    /// Every joined caller sees the same outcome.
    pub async fn ensure_fresh_access_token(&self) -> Result<(), RefreshError> {
        let refresh = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(in_flight) => {
                    tracing::trace!(generation = in_flight.generation, "joining in-flight refresh");
                    in_flight.refresh.clone()
                },
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let refresh = self.start(generation);
                    *slot = Some(InFlight {
                        generation,
                        refresh: refresh.clone(),
                    });
                    refresh
                },
            }
        };

        refresh.await
    }

    fn start(&self, generation: u64) -> SharedRefresh {
        let refresher = Arc::clone(&self.refresher);
        let clear = ClearSlot {
            slot: Arc::clone(&self.slot),
            generation,
        };
        let grace = self.grace;
        let (tx, rx) = oneshot::channel();

        tracing::debug!(generation, "starting token refresh");
        tokio::spawn(async move {
            let result = refresher.refresh().await;
            if let Err(e) = &result {
                tracing::warn!(generation, error = %e, "token refresh failed");
            }
            // Nobody may be waiting any more
            let _ = tx.send(result);
            tokio::time::sleep(grace).await;
            drop(clear);
        });

        async move { rx.await.unwrap_or(Err(RefreshError::Aborted)) }
            .boxed()
            .shared()
    }

    /// Send a request; on an unauthorized reply refresh once and replay it.
    /// A second unauthorized reply ends the session.
    pub async fn call<T, F, Fut>(&self, mut send: F) -> Result<T, ClientError>
    where
        T: Reply,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let reply = send().await?;
        if !reply.is_unauthorized() {
            return Ok(reply);
        }

        tracing::debug!("request unauthorized, refreshing access token");
        self.ensure_fresh_access_token().await?;

        let retried = send().await?;
        if retried.is_unauthorized() {
            tracing::info!("request still unauthorized after refresh");
            return Err(ClientError::SessionExpired);
        }
        Ok(retried)
    }
}
