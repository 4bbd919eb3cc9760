//! Query plans of the sharding proxy.
//!
//! A plan is built once per statement by [`PlanBuilder`], holds the routing
//! map of every physical statement it will issue, and is consumed by
//! [`Plan::execute_in`].

mod builder;
mod classify;
mod delete;
mod explain;
mod insert;
mod merge;
mod rewrite;
mod route;
mod select;
mod unshard;
mod update;

pub use builder::{PlanBuilder, build_plan};
pub use classify::{StatementClass, classify};
pub use delete::DeletePlan;
pub use explain::ExplainPlan;
pub use insert::InsertPlan;
pub use select::SelectPlan;
pub use unshard::UnshardPlan;
pub use update::UpdatePlan;

use std::collections::BTreeMap;

use crate::context::RequestContext;
use crate::error::ProxyResult;
use crate::execution::Executor;
use crate::result::ResultSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardType {
    Unshard,
    Shard,
}

impl ShardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardType::Unshard => "unshard",
            ShardType::Shard => "shard",
        }
    }
}

/// slice -> database -> physical statements, every one directly executable
/// on its (slice, database) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingMap {
    slices: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl RoutingMap {
    pub(crate) fn new() -> Self {
        RoutingMap::default()
    }

    pub(crate) fn single(slice: &str, db: &str, sql: String) -> Self {
        let mut map = RoutingMap::new();
        map.push(slice, db, sql);
        map
    }

    pub(crate) fn push(&mut self, slice: &str, db: &str, sql: String) {
        self.slices
            .entry(slice.to_string())
            .or_default()
            .entry(db.to_string())
            .or_default()
            .push(sql);
    }

    pub fn get(&self, slice: &str, db: &str) -> Option<&[String]> {
        self.slices.get(slice)?.get(db).map(Vec::as_slice)
    }

    pub fn slices(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    /// Flattened `(slice, db, sql)` tuples, slices and databases in sorted
    /// order, statements in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.slices.iter().flat_map(|(slice, dbs)| {
            dbs.iter().flat_map(move |(db, sqls)| {
                sqls.iter().map(move |sql| (slice.as_str(), db.as_str(), sql.as_str()))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slices.values().flat_map(|dbs| dbs.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub enum Plan {
    Unshard(UnshardPlan),
    Select(SelectPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
    Insert(InsertPlan),
    Explain(ExplainPlan),
}

impl Plan {
    /// Run the plan and merge the per-target results. The plan is spent.
    pub async fn execute_in(
        self,
        ctx: &RequestContext,
        executor: &dyn Executor,
    ) -> ProxyResult<ResultSet> {
        match self {
            Plan::Unshard(p) => p.execute_in(ctx, executor).await,
            Plan::Select(p) => p.execute_in(ctx, executor).await,
            Plan::Update(p) => p.execute_in(ctx, executor).await,
            Plan::Delete(p) => p.execute_in(ctx, executor).await,
            Plan::Insert(p) => p.execute_in(ctx, executor).await,
            Plan::Explain(p) => p.execute_in(ctx, executor).await,
        }
    }

    /// Number of physical statements the plan issues; explain counts as one.
    pub fn size(&self) -> usize {
        match self {
            Plan::Unshard(p) => p.size(),
            Plan::Select(p) => p.size(),
            Plan::Update(p) => p.size(),
            Plan::Delete(p) => p.size(),
            Plan::Insert(p) => p.size(),
            Plan::Explain(p) => p.size(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Plan::Unshard(_) => "unshard",
            Plan::Select(_) => "select",
            Plan::Update(_) => "update",
            Plan::Delete(_) => "delete",
            Plan::Insert(_) => "insert",
            Plan::Explain(_) => "explain",
        }
    }

    pub(crate) fn shard_type(&self) -> ShardType {
        match self {
            Plan::Unshard(_) => ShardType::Unshard,
            Plan::Explain(p) => p.shard_type(),
            _ => ShardType::Shard,
        }
    }

    pub(crate) fn routing_map(&self) -> &RoutingMap {
        match self {
            Plan::Unshard(p) => p.routing_map(),
            Plan::Select(p) => p.routing_map(),
            Plan::Update(p) => p.routing_map(),
            Plan::Delete(p) => p.routing_map(),
            Plan::Insert(p) => p.routing_map(),
            Plan::Explain(p) => p.routing_map(),
        }
    }
}
