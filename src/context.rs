//! Per-request context handed to `Plan::execute_in`.
//!
//! Carries the request identity used in log lines, an optional deadline and a
//! cancellation signal. Cancelling (or passing the deadline) drops every
//! backend call still pending for the plan.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{ProxyError, ProxyResult};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Cloneable handle that cancels the request it was taken from.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: u64,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        RequestContext {
            request_id: next_request_id(),
            timeout: None,
            deadline: None,
            cancel_tx: Arc::new(tx),
            cancel_rx: rx,
        }
    }

    /// Bound the request to `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle { tx: Arc::clone(&self.cancel_tx) }
    }

    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // sender lives in self, so changed() only fails if we are being torn down
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `work` to completion unless the request is cancelled or its
    /// deadline passes first; in both cases `work` is dropped.
    pub async fn run<T, F>(&self, work: F) -> ProxyResult<T>
    where
        F: Future<Output = ProxyResult<T>>,
    {
        if self.is_cancelled() {
            return Err(ProxyError::Cancelled);
        }
        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, work).await {
                    Ok(res) => res,
                    Err(_) => Err(ProxyError::Timeout(
                        self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
                    )),
                },
                None => work.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ProxyError::Cancelled),
            res = bounded => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_passes_result_through() {
        let ctx = RequestContext::new();
        let out = ctx.run(async { Ok::<_, ProxyError>(7) }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn run_after_cancel_fails_fast() {
        let ctx = RequestContext::new();
        ctx.cancel_handle().cancel();
        let res = ctx.run(async { Ok::<_, ProxyError>(1) }).await;
        assert!(matches!(res, Err(ProxyError::Cancelled)));
    }

    #[tokio::test]
    async fn run_times_out() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(20));
        let res = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ProxyError>(())
            })
            .await;
        assert!(matches!(res, Err(ProxyError::Timeout(20))));
    }

    #[test]
    fn request_ids_increase() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert!(b.request_id > a.request_id);
    }
}
