use log::debug;

use crate::context::RequestContext;
use crate::error::{ProxyError, ProxyResult};
use crate::execution::Executor;
use crate::plan::{Plan, PlanBuilder, RoutingMap, ShardType};
use crate::result::{ResultSet, Value};
use crate::sql::ast::Statement;
use crate::sql::restore;

pub const EXPLAIN_COLUMNS: [&str; 4] = ["type", "slice", "db", "sql"];

/// Shows where a statement would go without running it.
#[derive(Debug)]
pub struct ExplainPlan {
    shard_type: ShardType,
    routing: RoutingMap,
}

impl ExplainPlan {
    pub(crate) fn build(builder: &PlanBuilder<'_>, inner: &Statement, db: &str) -> ProxyResult<Self> {
        if matches!(inner, Statement::Explain(_)) {
            return Err(ProxyError::NestedExplain);
        }
        // the client text still carries the EXPLAIN keyword
        let sql = restore(inner);
        let plan = builder
            .build(inner, db, &sql)
            .map_err(|e| ProxyError::ExplainBuild(Box::new(e)))?;
        ExplainPlan::wrap(plan)
    }

    fn wrap(plan: Plan) -> ProxyResult<Self> {
        if let Plan::Explain(_) = plan {
            return Err(ProxyError::UnsupportedExplain(plan.kind()));
        }
        Ok(ExplainPlan { shard_type: plan.shard_type(), routing: plan.routing_map().clone() })
    }

    pub(crate) async fn execute_in(
        self,
        ctx: &RequestContext,
        _executor: &dyn Executor,
    ) -> ProxyResult<ResultSet> {
        let kind = self.shard_type.as_str();
        let rows = self
            .routing
            .entries()
            .map(|(slice, db, sql)| {
                vec![Value::from(kind), Value::from(slice), Value::from(db), Value::from(sql)]
            })
            .collect::<Vec<_>>();
        debug!("request {}: explain yields {} rows", ctx.request_id, rows.len());
        Ok(ResultSet::with_rows(&EXPLAIN_COLUMNS, rows))
    }

    pub fn size(&self) -> usize {
        1
    }

    pub(crate) fn shard_type(&self) -> ShardType {
        self.shard_type
    }

    pub(crate) fn routing_map(&self) -> &RoutingMap {
        &self.routing
    }
}
