use log::debug;

use crate::config::PlannerConfig;
use crate::context::RequestContext;
use crate::error::{ProxyError, ProxyResult};
use crate::execution::Executor;
use crate::execution::dispatch::{DispatchOptions, dispatch_all};
use crate::plan::RoutingMap;
use crate::plan::merge::{SelectMerge, merge_select};
use crate::plan::rewrite::{TableRename, rewrite_select};
use crate::plan::route::{ShardedTable, co_locate};
use crate::result::ResultSet;
use crate::router::Router;
use crate::sql::ast::{Limit, Select};

#[derive(Debug)]
pub struct SelectPlan {
    routing: RoutingMap,
    merge: SelectMerge,
    dispatch: DispatchOptions,
}

impl SelectPlan {
    pub(crate) fn build(
        select: &Select,
        db: &str,
        router: &dyn Router,
        config: &PlannerConfig,
    ) -> ProxyResult<Self> {
        let selection = select.selection.as_ref();
        let mut tables = Vec::new();
        for factor in select.from.iter().chain(select.joins.iter().map(|j| &j.table)) {
            if let Some(t) = ShardedTable::resolve(factor, db, selection, router)? {
                tables.push(t);
            }
        }
        if tables.is_empty() {
            return Err(ProxyError::Route("select references no sharded table".into()));
        }
        let groups = co_locate(&tables, router)?;

        let mut merge = SelectMerge::default();
        let mut shard_select = select.clone();
        if groups.len() > 1 {
            match SelectMerge::sort_keys(select) {
                Some(keys) => {
                    merge.order_by = keys;
                    if let Some(limit) = select.limit {
                        merge.limit = Some(limit);
                        shard_select.limit = Some(Limit {
                            offset: None,
                            count: limit.count.saturating_add(limit.offset.unwrap_or(0)),
                        });
                    }
                }
                // each shard applies its own ORDER BY and LIMIT; parts are concatenated
                None => debug!("ORDER BY cannot be re-applied after merge, LIMIT left per shard"),
            }
        }

        let mut routing = RoutingMap::new();
        for group in &groups {
            let renames: Vec<TableRename> = tables
                .iter()
                .zip(&group.targets)
                .map(|(t, target)| {
                    merge.add_table(&target.table, &t.name);
                    TableRename::new(&t.db, &t.name, target)
                })
                .collect();
            let sql = rewrite_select(&shard_select, db, &renames).to_string();
            routing.push(&group.slice, &group.db, sql);
        }
        debug!("select fans out to {} shards", routing.len());

        Ok(SelectPlan { routing, merge, dispatch: DispatchOptions::from(config) })
    }

    pub(crate) async fn execute_in(
        self,
        ctx: &RequestContext,
        executor: &dyn Executor,
    ) -> ProxyResult<ResultSet> {
        let results = dispatch_all(ctx, executor, &self.dispatch, &self.routing).await?;
        merge_select(results, &self.merge)
    }

    pub fn size(&self) -> usize {
        self.routing.len()
    }

    pub(crate) fn routing_map(&self) -> &RoutingMap {
        &self.routing
    }
}
