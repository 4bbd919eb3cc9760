//! Fan-out of a routing map over the executor.
//!
//! Statements run concurrently, at most `max_parallel` at a time, and are
//! awaited in completion order. The first failure, wherever it sits in the
//! routing map, drops every call still in flight. Successful results are put
//! back in routing-map order before they are returned.

use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, warn};

use crate::config::PlannerConfig;
use crate::context::RequestContext;
use crate::error::{ProxyError, ProxyResult};
use crate::execution::Executor;
use crate::plan::RoutingMap;
use crate::result::ResultSet;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DispatchOptions {
    pub max_parallel: usize,
    pub backend_timeout: Option<Duration>,
}

impl From<&PlannerConfig> for DispatchOptions {
    fn from(config: &PlannerConfig) -> Self {
        DispatchOptions {
            max_parallel: config.max_parallel.max(1),
            backend_timeout: config.backend_timeout,
        }
    }
}

fn scoped(ctx: &RequestContext, opts: &DispatchOptions) -> Option<RequestContext> {
    match opts.backend_timeout {
        Some(timeout) if !ctx.has_deadline() => Some(ctx.clone().with_timeout(timeout)),
        _ => None,
    }
}

async fn call(
    executor: &dyn Executor,
    request_id: u64,
    slice: &str,
    db: &str,
    sql: &str,
) -> ProxyResult<ResultSet> {
    let res = executor.execute(slice, db, sql).await;
    if let Err(e) = &res {
        warn!("request {}: [{}/{}] {} failed: {}", request_id, slice, db, sql, e);
    }
    res
}

pub(crate) async fn dispatch_one(
    ctx: &RequestContext,
    executor: &dyn Executor,
    opts: &DispatchOptions,
    slice: &str,
    db: &str,
    sql: &str,
) -> ProxyResult<ResultSet> {
    let local = scoped(ctx, opts);
    let ctx = local.as_ref().unwrap_or(ctx);
    ctx.run(call(executor, ctx.request_id, slice, db, sql)).await
}

pub(crate) async fn dispatch_all(
    ctx: &RequestContext,
    executor: &dyn Executor,
    opts: &DispatchOptions,
    routing: &RoutingMap,
) -> ProxyResult<Vec<ResultSet>> {
    let local = scoped(ctx, opts);
    let ctx = local.as_ref().unwrap_or(ctx);
    let request_id = ctx.request_id;
    debug!(
        "request {}: dispatching {} statements (max {} in flight)",
        request_id,
        routing.len(),
        opts.max_parallel
    );
    let calls = routing.entries().enumerate().map(|(index, (slice, db, sql))| async move {
        call(executor, request_id, slice, db, sql).await.map(|rs| (index, rs))
    });
    let work = async {
        let mut parts: Vec<(usize, ResultSet)> = stream::iter(calls)
            .buffer_unordered(opts.max_parallel)
            .try_collect()
            .await?;
        parts.sort_unstable_by_key(|(index, _)| *index);
        Ok::<Vec<ResultSet>, ProxyError>(parts.into_iter().map(|(_, rs)| rs).collect())
    };
    ctx.run(work).await
}
