//! Latest-request-wins gating for refreshable views.
//!
//! A view that refreshes from the backend starts each refresh with
//! [`RequestGate::begin`]. Starting a new refresh cancels the previous one,
//! and only the newest generation may deliver its result.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::PortalError;

#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    token: CancellationToken,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` until it completes or this ticket is superseded.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

#[derive(Debug, Default)]
pub struct RequestGate {
    generation: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self) -> RequestTicket {
        let token = CancellationToken::new();
        let mut current = self.current.lock().await;
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "request generation started");

        RequestTicket { generation, token }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Run `fut` as the newest request for this view.
    ///
    /// Fails with [`PortalError::Superseded`] if a later request begins
    /// before `fut` delivers.
    pub async fn run_latest<T, F>(&self, fut: F) -> Result<T, PortalError>
    where
        F: Future<Output = Result<T, PortalError>>,
    {
        let ticket = self.begin().await;
        match ticket.run(fut).await {
            Some(out) if self.is_current(&ticket) => out,
            _ => {
                metrics::counter!("view_stale_results_dropped_total").increment(1);
                tracing::debug!(generation = ticket.generation, "dropping stale view result");
                Err(PortalError::Superseded)
            }
        }
    }
}

/// Idle gates are dropped once this many views are tracked.
pub const MAX_TRACKED_VIEWS: usize = 1024;

/// One [`RequestGate`] per client-chosen view ID, so refreshes of
/// different views never cancel each other.
#[derive(Debug, Default)]
pub struct ViewGates {
    gates: Mutex<HashMap<String, Arc<RequestGate>>>,
}

impl ViewGates {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn gate(&self, view: &str) -> Arc<RequestGate> {
        let mut gates = self.gates.lock().await;
        if !gates.contains_key(view) && gates.len() >= MAX_TRACKED_VIEWS {
            // A gate only the map refers to has no request in flight.
            gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        }
        gates.entry(view.to_string()).or_default().clone()
    }

    pub async fn tracked(&self) -> usize {
        self.gates.lock().await.len()
    }
}
