mod support;

use shardplan::config::PlannerConfig;
use shardplan::context::RequestContext;
use shardplan::error::{ProxyError, ProxyResult};
use shardplan::plan::{Plan, PlanBuilder, StatementClass, build_plan, classify};
use shardplan::router::Router;
use shardplan::sequence::MemorySequence;
use shardplan::sql::parser::parse_statement;

use support::{BrokenRouter, BrokenSequence, RecordingExecutor, shop_router};

fn build(sql: &str, router: &dyn Router) -> ProxyResult<Plan> {
    let stmt = parse_statement(sql)?;
    build_plan(&stmt, "db1", sql, router, &MemorySequence::auto_create(1, 1))
}

#[tokio::test]
async fn unsharded_statements_pass_through_verbatim() {
    let router = shop_router();
    for sql in [
        "show tables",
        "SELECT * FROM users WHERE id = 1",
        "create table t (id int)",
        "INSERT INTO users (id) VALUES (1)",
        "SELECT * FROM other_db.orders",
    ] {
        let plan = build(sql, &router).unwrap();
        assert_eq!(plan.kind(), "unshard", "{}", sql);
        assert_eq!(plan.size(), 1);

        let exec = RecordingExecutor::default();
        plan.execute_in(&RequestContext::new(), &exec).await.unwrap();
        assert_eq!(exec.calls(), vec![("slice-0".to_string(), "db1".to_string(), sql.to_string())]);
    }
}

#[test]
fn statement_classes() {
    let router = shop_router();
    let class = |sql: &str| classify(&parse_statement(sql).unwrap(), "db1", &router);
    assert_eq!(class("SELECT * FROM orders"), StatementClass::ShardAware);
    assert_eq!(class("DELETE FROM db1.items WHERE order_id = 1"), StatementClass::ShardAware);
    assert_eq!(class("SELECT * FROM users JOIN orders ON users.id = orders.uid"), StatementClass::ShardAware);
    assert_eq!(class("SELECT 1"), StatementClass::PassThrough);
    assert_eq!(class("SHOW TABLES"), StatementClass::PassThrough);
    assert_eq!(class("EXPLAIN SELECT * FROM orders"), StatementClass::Explain);
}

#[test]
fn nested_explain_is_rejected() {
    let err = build("EXPLAIN EXPLAIN SELECT * FROM orders", &shop_router()).unwrap_err();
    assert!(matches!(err, ProxyError::NestedExplain));
    assert_eq!(err.to_string(), "nested explain");

    // checked before the router is consulted
    let err = build("EXPLAIN EXPLAIN SELECT * FROM orders", &BrokenRouter).unwrap_err();
    assert!(matches!(err, ProxyError::NestedExplain));
}

#[test]
fn plan_size_counts_physical_statements() {
    let router = shop_router();
    assert_eq!(build("SELECT * FROM orders", &router).unwrap().size(), 4);
    assert_eq!(build("SELECT * FROM orders WHERE id IN (1, 2)", &router).unwrap().size(), 2);
    assert_eq!(build("UPDATE orders SET n = 1 WHERE id = 7", &router).unwrap().size(), 1);
    assert_eq!(build("DELETE FROM orders", &router).unwrap().size(), 4);
    assert_eq!(build("EXPLAIN SELECT * FROM orders", &router).unwrap().size(), 1);
}

#[test]
fn plan_kinds() {
    let router = shop_router();
    let kind = |sql: &str| build(sql, &router).unwrap().kind();
    assert_eq!(kind("SELECT * FROM orders"), "select");
    assert_eq!(kind("INSERT INTO orders (id) VALUES (1)"), "insert");
    assert_eq!(kind("UPDATE orders SET n = 1"), "update");
    assert_eq!(kind("DELETE FROM orders WHERE id = 1"), "delete");
    assert_eq!(kind("EXPLAIN DELETE FROM orders"), "explain");
}

#[test]
fn router_errors_propagate_unchanged() {
    let err = build("SELECT * FROM orders WHERE id = 1", &BrokenRouter).unwrap_err();
    assert_eq!(err.to_string(), "route error: rule table for 'db1.orders' unavailable");
}

#[test]
fn sequence_errors_propagate_unchanged() {
    let router = shop_router();
    let sql = "INSERT INTO orders (n) VALUES ('x')";
    let stmt = parse_statement(sql).unwrap();
    let err = build_plan(&stmt, "db1", sql, &router, &BrokenSequence).unwrap_err();
    assert_eq!(err.to_string(), "sequence error: sequence 'db1.orders' unavailable");
}

#[test]
fn unsupported_shapes_fail_to_plan() {
    let router = shop_router();
    assert!(matches!(
        build("SELECT * FROM orders WHERE id IN (SELECT id FROM items)", &router),
        Err(ProxyError::Unsupported(_))
    ));
    assert!(matches!(
        build("UPDATE orders SET id = 2 WHERE id = 1", &router),
        Err(ProxyError::ShardKeyUpdate(_))
    ));
}

#[tokio::test]
async fn default_slice_comes_from_config() {
    let router = shop_router();
    let sequence = MemorySequence::new();
    let builder = PlanBuilder::new(&router, &sequence)
        .with_config(PlannerConfig::default().with_default_slice("main"));
    let plan = builder.build(&parse_statement("SHOW TABLES").unwrap(), "app", "SHOW TABLES").unwrap();

    let exec = RecordingExecutor::default();
    plan.execute_in(&RequestContext::new(), &exec).await.unwrap();
    assert_eq!(exec.calls(), vec![("main".to_string(), "app".to_string(), "SHOW TABLES".to_string())]);
}
