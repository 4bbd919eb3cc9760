use crate::router::Router;
use crate::sql::ast::{Statement, TableName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementClass {
    Explain,
    /// Runs unchanged on the default slice.
    PassThrough,
    /// SELECT/INSERT/UPDATE/DELETE touching at least one sharded table.
    ShardAware,
}

/// Tables a DML statement reads or writes; empty for everything else.
pub(crate) fn referenced_tables(stmt: &Statement) -> Vec<&TableName> {
    match stmt {
        Statement::Select(s) => s
            .from
            .iter()
            .chain(s.joins.iter().map(|j| &j.table))
            .map(|f| &f.table)
            .collect(),
        Statement::Insert(i) => vec![&i.table],
        Statement::Update(u) => vec![&u.table.table],
        Statement::Delete(d) => vec![&d.table],
        Statement::Explain(_) | Statement::Other(_) => Vec::new(),
    }
}

pub fn classify(stmt: &Statement, db: &str, router: &dyn Router) -> StatementClass {
    if matches!(stmt, Statement::Explain(_)) {
        return StatementClass::Explain;
    }
    let sharded = referenced_tables(stmt).into_iter().any(|t| {
        let table_db = t.schema.as_deref().unwrap_or(db);
        router.shard_key(table_db, &t.name).is_some()
    });
    if sharded { StatementClass::ShardAware } else { StatementClass::PassThrough }
}
