#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use shardplan::error::{ProxyError, ProxyResult};
use shardplan::execution::Executor;
use shardplan::result::{Column, ResultSet, Value};
use shardplan::router::{KeyHint, RouteTarget, Router, RuleRouter, ShardRule};
use shardplan::sequence::SequenceManager;

/// `orders` (key `id`) and `items` (key `order_id`) in `db1`, four shards
/// each, spread over `slice0` and `slice1`.
pub fn shop_router() -> RuleRouter {
    RuleRouter::new()
        .with_rule(ShardRule::new("db1", "orders", "id", 4).slices(&["slice0", "slice1"]))
        .unwrap()
        .with_rule(ShardRule::new("db1", "items", "order_id", 4).slices(&["slice0", "slice1"]))
        .unwrap()
}

/// `orders` sharded eight ways, all on `slice0`.
pub fn single_slice_router() -> RuleRouter {
    RuleRouter::new()
        .with_rule(ShardRule::new("db1", "orders", "id", 8).slices(&["slice0"]))
        .unwrap()
}

/// Physical table named in a rewritten statement, e.g. `orders_3`.
fn physical_table(sql: &str) -> String {
    sql.split_whitespace()
        .find(|w| w.contains('_') && w.chars().last().is_some_and(|c| c.is_ascii_digit()))
        .unwrap_or("")
        .to_string()
}

/// Records every call; SELECTs answer one row `(table)` tagged with the
/// physical table, writes report one affected row.
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> Vec<(String, String, String)> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, slice: &str, db: &str, sql: &str) -> ProxyResult<ResultSet> {
        self.calls
            .lock()
            .unwrap()
            .push((slice.to_string(), db.to_string(), sql.to_string()));
        if sql.starts_with("SELECT") {
            let table = physical_table(sql);
            Ok(ResultSet {
                columns: vec![Column::from_table("shard", &table)],
                rows: vec![vec![Value::from(table.as_str())]],
                ..Default::default()
            })
        } else {
            Ok(ResultSet::affected(1, 0))
        }
    }
}

/// Answers every statement with the same canned result.
pub struct CannedExecutor {
    pub result: ResultSet,
}

#[async_trait]
impl Executor for CannedExecutor {
    async fn execute(&self, _slice: &str, _db: &str, _sql: &str) -> ProxyResult<ResultSet> {
        Ok(self.result.clone())
    }
}

/// Returns the rows registered for a physical table; unknown tables are empty.
pub struct TableExecutor {
    pub column: &'static str,
    pub tables: Vec<(&'static str, Vec<i64>)>,
}

#[async_trait]
impl Executor for TableExecutor {
    async fn execute(&self, _slice: &str, _db: &str, sql: &str) -> ProxyResult<ResultSet> {
        let table = physical_table(sql);
        let ids = self
            .tables
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, ids)| ids.clone())
            .unwrap_or_default();
        Ok(ResultSet {
            columns: vec![Column::from_table(self.column, &table)],
            rows: ids.into_iter().map(|i| vec![Value::Int(i)]).collect(),
            ..Default::default()
        })
    }
}

/// Fails statements sent to one physical table, succeeds elsewhere.
pub struct FailingExecutor {
    pub fail_table: &'static str,
    pub inner: RecordingExecutor,
}

impl FailingExecutor {
    pub fn new(fail_table: &'static str) -> Self {
        FailingExecutor { fail_table, inner: RecordingExecutor::default() }
    }
}

#[async_trait]
impl Executor for FailingExecutor {
    async fn execute(&self, slice: &str, db: &str, sql: &str) -> ProxyResult<ResultSet> {
        if physical_table(sql) == self.fail_table {
            return Err(ProxyError::Backend {
                slice: slice.to_string(),
                db: db.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.execute(slice, db, sql).await
    }
}

/// Sleeps before answering.
pub struct SlowExecutor {
    pub delay: Duration,
}

#[async_trait]
impl Executor for SlowExecutor {
    async fn execute(&self, _slice: &str, _db: &str, _sql: &str) -> ProxyResult<ResultSet> {
        tokio::time::sleep(self.delay).await;
        Ok(ResultSet::affected(1, 0))
    }
}

/// Hangs on one physical table and fails another at once.
pub struct StallingExecutor {
    pub stall_table: &'static str,
    pub fail_table: &'static str,
}

#[async_trait]
impl Executor for StallingExecutor {
    async fn execute(&self, slice: &str, db: &str, sql: &str) -> ProxyResult<ResultSet> {
        let table = physical_table(sql);
        if table == self.stall_table {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if table == self.fail_table {
            return Err(ProxyError::Backend {
                slice: slice.to_string(),
                db: db.to_string(),
                message: "boom".to_string(),
            });
        }
        Ok(ResultSet::affected(1, 0))
    }
}

/// Knows one sharded table but cannot route it.
pub struct BrokenRouter;

impl Router for BrokenRouter {
    fn shard_key(&self, _db: &str, table: &str) -> Option<String> {
        (table == "orders").then(|| "id".to_string())
    }

    fn route(&self, db: &str, table: &str, _hint: &KeyHint) -> ProxyResult<Vec<RouteTarget>> {
        Err(ProxyError::Route(format!("rule table for '{}.{}' unavailable", db, table)))
    }
}

pub struct BrokenSequence;

impl SequenceManager for BrokenSequence {
    fn next(&self, scope: &str) -> ProxyResult<i64> {
        Err(ProxyError::Sequence(format!("sequence '{}' unavailable", scope)))
    }
}
