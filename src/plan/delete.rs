use log::debug;

use crate::config::PlannerConfig;
use crate::context::RequestContext;
use crate::error::{ProxyError, ProxyResult};
use crate::execution::Executor;
use crate::execution::dispatch::{DispatchOptions, dispatch_all};
use crate::plan::RoutingMap;
use crate::plan::merge::merge_write;
use crate::plan::rewrite::{TableRename, rewrite_delete};
use crate::plan::route::ShardedTable;
use crate::result::ResultSet;
use crate::router::Router;
use crate::sql::ast::{Delete, TableFactor};

#[derive(Debug)]
pub struct DeletePlan {
    routing: RoutingMap,
    dispatch: DispatchOptions,
}

impl DeletePlan {
    pub(crate) fn build(
        delete: &Delete,
        db: &str,
        router: &dyn Router,
        config: &PlannerConfig,
    ) -> ProxyResult<Self> {
        let factor = TableFactor { table: delete.table.clone(), alias: None };
        let table = ShardedTable::resolve(&factor, db, delete.selection.as_ref(), router)?
            .ok_or_else(|| ProxyError::Route("delete references no sharded table".into()))?;

        let mut routing = RoutingMap::new();
        for target in &table.targets {
            let renames = [TableRename::new(&table.db, &table.name, target)];
            routing.push(&target.slice, &target.db, rewrite_delete(delete, db, &renames).to_string());
        }
        debug!("delete from {}.{} fans out to {} shards", table.db, table.name, routing.len());

        Ok(DeletePlan { routing, dispatch: DispatchOptions::from(config) })
    }

    pub(crate) async fn execute_in(
        self,
        ctx: &RequestContext,
        executor: &dyn Executor,
    ) -> ProxyResult<ResultSet> {
        let results = dispatch_all(ctx, executor, &self.dispatch, &self.routing).await?;
        Ok(merge_write(results, None))
    }

    pub fn size(&self) -> usize {
        self.routing.len()
    }

    pub(crate) fn routing_map(&self) -> &RoutingMap {
        &self.routing
    }
}
