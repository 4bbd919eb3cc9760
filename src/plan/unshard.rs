use log::debug;

use crate::config::PlannerConfig;
use crate::context::RequestContext;
use crate::error::ProxyResult;
use crate::execution::Executor;
use crate::execution::dispatch::{DispatchOptions, dispatch_one};
use crate::plan::RoutingMap;
use crate::result::ResultSet;

/// A statement that touches no sharded table; sent as written to the default
/// slice.
#[derive(Debug)]
pub struct UnshardPlan {
    slice: String,
    db: String,
    sql: String,
    routing: RoutingMap,
    dispatch: DispatchOptions,
}

impl UnshardPlan {
    pub(crate) fn build(config: &PlannerConfig, db: &str, sql: &str) -> Self {
        UnshardPlan {
            slice: config.default_slice.clone(),
            db: db.to_string(),
            sql: sql.to_string(),
            routing: RoutingMap::single(&config.default_slice, db, sql.to_string()),
            dispatch: DispatchOptions::from(config),
        }
    }

    pub(crate) async fn execute_in(
        self,
        ctx: &RequestContext,
        executor: &dyn Executor,
    ) -> ProxyResult<ResultSet> {
        debug!("request {}: unshard [{}/{}] {}", ctx.request_id, self.slice, self.db, self.sql);
        dispatch_one(ctx, executor, &self.dispatch, &self.slice, &self.db, &self.sql).await
    }

    pub fn size(&self) -> usize {
        1
    }

    pub(crate) fn routing_map(&self) -> &RoutingMap {
        &self.routing
    }
}
