use log::debug;

use crate::config::PlannerConfig;
use crate::context::RequestContext;
use crate::error::{ProxyError, ProxyResult};
use crate::execution::Executor;
use crate::execution::dispatch::{DispatchOptions, dispatch_all};
use crate::plan::RoutingMap;
use crate::plan::merge::merge_write;
use crate::plan::rewrite::{TableRename, rewrite_update};
use crate::plan::route::ShardedTable;
use crate::result::ResultSet;
use crate::router::Router;
use crate::sql::ast::Update;

#[derive(Debug)]
pub struct UpdatePlan {
    routing: RoutingMap,
    dispatch: DispatchOptions,
}

impl UpdatePlan {
    pub(crate) fn build(
        update: &Update,
        db: &str,
        router: &dyn Router,
        config: &PlannerConfig,
    ) -> ProxyResult<Self> {
        let table = ShardedTable::resolve(&update.table, db, update.selection.as_ref(), router)?
            .ok_or_else(|| ProxyError::Route("update references no sharded table".into()))?;
        if let Some(a) = update.assignments.iter().find(|a| table.is_key(&a.column)) {
            return Err(ProxyError::ShardKeyUpdate(a.column.name.clone()));
        }

        let mut routing = RoutingMap::new();
        for target in &table.targets {
            let renames = [TableRename::new(&table.db, &table.name, target)];
            routing.push(&target.slice, &target.db, rewrite_update(update, db, &renames).to_string());
        }
        debug!("update of {}.{} fans out to {} shards", table.db, table.name, routing.len());

        Ok(UpdatePlan { routing, dispatch: DispatchOptions::from(config) })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{RuleRouter, ShardRule};
    use crate::sql::ast::Statement;
    use crate::sql::parse_statement;

    fn plan(sql: &str) -> ProxyResult<UpdatePlan> {
        let router = RuleRouter::new()
            .with_rule(ShardRule::new("shop", "orders", "id", 4).slices(&["s0", "s1"]))
            .unwrap();
        let Statement::Update(update) = parse_statement(sql).unwrap() else {
            panic!("expected update")
        };
        UpdatePlan::build(&update, "shop", &router, &PlannerConfig::default())
    }

    #[test]
    fn pinned_update_hits_one_shard() {
        let p = plan("UPDATE orders SET status = 'paid' WHERE id IN (1, 5) LIMIT 1").unwrap();
        let entries: Vec<_> = p.routing_map().entries().collect();
        assert_eq!(
            entries,
            vec![("s0", "shop", "UPDATE orders_1 SET status = 'paid' WHERE id IN (1, 5) LIMIT 1")]
        );
    }

    #[test]
    fn unpinned_update_hits_all_shards() {
        assert_eq!(plan("UPDATE orders SET n = n + 1").unwrap().size(), 4);
    }

    #[test]
    fn shard_key_assignment_rejected() {
        let err = plan("UPDATE orders o SET o.id = 3 WHERE o.id = 2").unwrap_err();
        assert_eq!(err.to_string(), "sharding column 'id' cannot be updated");
    }
}
