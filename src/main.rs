// src/main.rs

use std::env;
use std::io::{self, Write};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::runtime::Runtime;

use shardplan::config::PlannerConfig;
use shardplan::context::RequestContext;
use shardplan::error::{ProxyError, ProxyResult};
use shardplan::execution::Executor;
use shardplan::plan::PlanBuilder;
use shardplan::result::{ResultSet, format_header, format_row};
use shardplan::router::{RuleRouter, ShardRule};
use shardplan::sequence::MemorySequence;
use shardplan::sql::ast::Statement;
use shardplan::sql::parser::parse_statement;

/// The shell only explains, so nothing ever reaches a backend.
struct NoBackend;

#[async_trait]
impl Executor for NoBackend {
    async fn execute(&self, slice: &str, db: &str, _sql: &str) -> ProxyResult<ResultSet> {
        Err(ProxyError::Backend {
            slice: slice.to_string(),
            db: db.to_string(),
            message: "no backend attached to the explain shell".into(),
        })
    }
}

fn explain_line(
    runtime: &Runtime,
    builder: &PlanBuilder<'_>,
    db: &str,
    line: &str,
) -> ProxyResult<ResultSet> {
    let stmt = match parse_statement(line)? {
        stmt @ Statement::Explain(_) => stmt,
        stmt => Statement::Explain(Box::new(stmt)),
    };
    let plan = builder.build(&stmt, db, line)?;
    debug!("{} plan, cost {}", plan.kind(), plan.size());
    runtime.block_on(plan.execute_in(&RequestContext::new(), &NoBackend))
}

fn main() -> io::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(db) = args.next() else {
        eprintln!("usage: shardplan <default-db> [table:key:count:slice[,slice...][:hash] ...]");
        std::process::exit(2);
    };
    let mut router = RuleRouter::new();
    for spec in args {
        if let Err(e) = ShardRule::parse(&db, &spec).and_then(|rule| router.add_rule(rule)) {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    let config = PlannerConfig::from_env();
    let sequence = MemorySequence::auto_create(1, 1);
    let builder = PlanBuilder::new(&router, &sequence).with_config(config);
    info!(
        "shardplan explain shell, db '{}', default slice '{}'. Type .exit to quit.",
        db,
        builder.config().default_slice
    );

    loop {
        print!("shardplan> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let trimmed = input.trim().trim_end_matches(';');
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case(".exit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        match explain_line(&runtime, &builder, &db, trimmed) {
            Ok(rs) => {
                println!("{}", format_header(&rs.columns));
                for row in &rs.rows {
                    println!("{}", format_row(row));
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
    Ok(())
}
