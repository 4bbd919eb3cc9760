use std::collections::BTreeMap;

use log::debug;

use crate::config::PlannerConfig;
use crate::context::RequestContext;
use crate::error::{ProxyError, ProxyResult};
use crate::execution::Executor;
use crate::execution::dispatch::{DispatchOptions, dispatch_all};
use crate::plan::RoutingMap;
use crate::plan::merge::merge_write;
use crate::plan::rewrite::{Renamer, TableRename};
use crate::plan::route::literal_value;
use crate::result::ResultSet;
use crate::router::{KeyHint, RouteTarget, Router, ShardValue};
use crate::sequence::{SequenceManager, sequence_scope};
use crate::sql::ast::{Expr, Insert, Literal};

#[derive(Debug)]
pub struct InsertPlan {
    routing: RoutingMap,
    /// First sequence value handed out while planning, if any.
    generated_id: Option<u64>,
    dispatch: DispatchOptions,
}

impl InsertPlan {
    pub(crate) fn build(
        insert: &Insert,
        db: &str,
        router: &dyn Router,
        sequence: &dyn SequenceManager,
        config: &PlannerConfig,
    ) -> ProxyResult<Self> {
        let table_db = insert.table.schema.as_deref().unwrap_or(db);
        let table = insert.table.name.as_str();
        let key = router.shard_key(table_db, table).ok_or_else(|| {
            ProxyError::Route(format!("'{}.{}' is not sharded", table_db, table))
        })?;
        if insert.columns.is_empty() {
            return Err(ProxyError::MissingColumnList(table.to_string()));
        }
        if insert.on_duplicate.iter().any(|a| a.column.name.eq_ignore_ascii_case(&key)) {
            return Err(ProxyError::ShardKeyUpdate(key));
        }

        let mut columns = insert.columns.clone();
        let key_pos = match columns.iter().position(|c| c.eq_ignore_ascii_case(&key)) {
            Some(pos) => pos,
            None => {
                columns.push(key.clone());
                columns.len() - 1
            }
        };

        let scope = sequence_scope(table_db, table);
        let mut generated_id = None;
        // shard index -> (target, rows), rows in statement order
        let mut groups: BTreeMap<usize, (RouteTarget, Vec<Vec<Expr>>)> = BTreeMap::new();
        for (n, row) in insert.rows.iter().enumerate() {
            if row.len() != insert.columns.len() {
                return Err(ProxyError::InvalidValue(format!(
                    "column count doesn't match value count at row {}",
                    n + 1
                )));
            }
            let mut row = row.clone();
            if row.len() < columns.len() {
                row.push(Expr::Literal(Literal::Null));
            }
            let value = if matches!(row[key_pos], Expr::Literal(Literal::Null) | Expr::Default) {
                let id = sequence.next(&scope)?;
                generated_id = generated_id.or(Some(id));
                row[key_pos] = Expr::Literal(Literal::Integer(id));
                ShardValue::Int(id)
            } else {
                literal_value(&row[key_pos]).ok_or_else(|| {
                    ProxyError::InvalidValue(format!(
                        "shard key '{}' needs a literal value, got {}",
                        key, row[key_pos]
                    ))
                })?
            };
            let target = router
                .route(table_db, table, &KeyHint::Values(vec![value.clone()]))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ProxyError::Route(format!("no shard of '{}.{}' owns key {}", table_db, table, value))
                })?;
            groups.entry(target.index).or_insert_with(|| (target, Vec::new())).1.push(row);
        }

        let mut routing = RoutingMap::new();
        for (target, rows) in groups.into_values() {
            let renames = [TableRename::new(table_db, table, &target)];
            let mut shard_insert = Insert { columns: columns.clone(), rows, ..insert.clone() };
            Renamer::new(db, &renames).table(&mut shard_insert.table);
            routing.push(&target.slice, &target.db, shard_insert.to_string());
        }
        debug!(
            "insert of {} rows into {}.{} spread over {} shards",
            insert.rows.len(),
            table_db,
            table,
            routing.len()
        );

        Ok(InsertPlan {
            routing,
            generated_id: generated_id.and_then(|id| u64::try_from(id).ok()),
            dispatch: DispatchOptions::from(config),
        })
    }

    pub(crate) async fn execute_in(
        self,
        ctx: &RequestContext,
        executor: &dyn Executor,
    ) -> ProxyResult<ResultSet> {
        let results = dispatch_all(ctx, executor, &self.dispatch, &self.routing).await?;
        Ok(merge_write(results, self.generated_id))
    }

    pub fn size(&self) -> usize {
        self.routing.len()
    }

    pub(crate) fn routing_map(&self) -> &RoutingMap {
        &self.routing
    }
}
