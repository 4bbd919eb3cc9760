use log::debug;

use crate::config::PlannerConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::plan::classify::{StatementClass, classify};
use crate::plan::{
    DeletePlan, ExplainPlan, InsertPlan, Plan, SelectPlan, UnshardPlan, UpdatePlan,
};
use crate::router::Router;
use crate::sequence::SequenceManager;
use crate::sql::ast::Statement;

/// Turns parsed statements into plans against one rule table and sequence
/// source.
pub struct PlanBuilder<'a> {
    config: PlannerConfig,
    router: &'a dyn Router,
    sequence: &'a dyn SequenceManager,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(router: &'a dyn Router, sequence: &'a dyn SequenceManager) -> Self {
        PlanBuilder { config: PlannerConfig::default(), router, sequence }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Build the plan for `stmt`, issued against `db` as the text `sql`.
    pub fn build(&self, stmt: &Statement, db: &str, sql: &str) -> ProxyResult<Plan> {
        if let Statement::Explain(inner) = stmt {
            if matches!(inner.as_ref(), Statement::Explain(_)) {
                return Err(ProxyError::NestedExplain);
            }
        }

        let class = classify(stmt, db, self.router);
        let plan = match (class, stmt) {
            (StatementClass::Explain, Statement::Explain(inner)) => {
                Plan::Explain(ExplainPlan::build(self, inner, db)?)
            }
            (StatementClass::ShardAware, Statement::Select(s)) => {
                Plan::Select(SelectPlan::build(s, db, self.router, &self.config)?)
            }
            (StatementClass::ShardAware, Statement::Insert(i)) => {
                Plan::Insert(InsertPlan::build(i, db, self.router, self.sequence, &self.config)?)
            }
            (StatementClass::ShardAware, Statement::Update(u)) => {
                Plan::Update(UpdatePlan::build(u, db, self.router, &self.config)?)
            }
            (StatementClass::ShardAware, Statement::Delete(d)) => {
                Plan::Delete(DeletePlan::build(d, db, self.router, &self.config)?)
            }
            _ => Plan::Unshard(UnshardPlan::build(&self.config, db, sql)),
        };
        debug!("{} statement planned as {} ({} statements)", stmt.kind(), plan.kind(), plan.size());
        Ok(plan)
    }
}

/// Build a plan with the default [`PlannerConfig`].
pub fn build_plan(
    stmt: &Statement,
    db: &str,
    sql: &str,
    router: &dyn Router,
    sequence: &dyn SequenceManager,
) -> ProxyResult<Plan> {
    PlanBuilder::new(router, sequence).build(stmt, db, sql)
}
