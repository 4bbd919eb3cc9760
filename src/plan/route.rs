use std::collections::BTreeSet;

use log::debug;

use crate::error::{ProxyError, ProxyResult};
use crate::router::{KeyHint, RouteTarget, Router, ShardValue};
use crate::sql::ast::{BinaryOp, ColumnName, Expr, Literal, TableFactor, UnaryOp};

/// A sharded table as referenced by the statement.
#[derive(Debug, Clone)]
pub(crate) struct ShardedTable {
    /// Logical database the reference resolves to.
    pub db: String,
    pub name: String,
    pub alias: Option<String>,
    pub key: String,
    pub targets: Vec<RouteTarget>,
}

impl ShardedTable {
    /// Route `factor` if it names a sharded table, pruning with `selection`.
    pub fn resolve(
        factor: &TableFactor,
        default_db: &str,
        selection: Option<&Expr>,
        router: &dyn Router,
    ) -> ProxyResult<Option<ShardedTable>> {
        let db = factor.table.schema.as_deref().unwrap_or(default_db);
        let Some(key) = router.shard_key(db, &factor.table.name) else {
            return Ok(None);
        };
        let mut table = ShardedTable {
            db: db.to_string(),
            name: factor.table.name.clone(),
            alias: factor.alias.clone(),
            key,
            targets: Vec::new(),
        };
        let hint = table.key_hint(selection);
        table.targets = match router.route(db, &table.name, &hint) {
            // a predicate on an unplaceable value pins nothing
            Err(ProxyError::InvalidValue(reason)) if hint != KeyHint::All => {
                debug!("{}.{}: {}, reading every shard", db, table.name, reason);
                router.route(db, &table.name, &KeyHint::All)?
            }
            res => res?,
        };
        debug!("{}.{} pruned to {} of its shards", db, table.name, table.targets.len());
        Ok(Some(table))
    }

    pub fn is_key(&self, col: &ColumnName) -> bool {
        if !col.name.eq_ignore_ascii_case(&self.key) {
            return false;
        }
        match &col.table {
            None => true,
            Some(q) => {
                q.eq_ignore_ascii_case(&self.name)
                    || self.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(q))
            }
        }
    }

    pub fn key_hint(&self, selection: Option<&Expr>) -> KeyHint {
        match selection {
            Some(expr) => self.hint_of(expr),
            None => KeyHint::All,
        }
    }

    fn hint_of(&self, expr: &Expr) -> KeyHint {
        match expr {
            Expr::Nested(inner) => self.hint_of(inner),
            Expr::Binary { left, op: BinaryOp::And, right } => {
                intersect(self.hint_of(left), self.hint_of(right))
            }
            Expr::Binary { left, op: BinaryOp::Or, right } => {
                union(self.hint_of(left), self.hint_of(right))
            }
            Expr::Binary { left, op: BinaryOp::Eq, right } => {
                match (left.as_ref(), right.as_ref()) {
                    (Expr::Column(c), other) | (other, Expr::Column(c)) if self.is_key(c) => {
                        match literal_value(other) {
                            Some(v) => KeyHint::Values(vec![v]),
                            None => KeyHint::All,
                        }
                    }
                    _ => KeyHint::All,
                }
            }
            Expr::InList { expr, list, negated: false } => match expr.as_ref() {
                Expr::Column(c) if self.is_key(c) => {
                    match list.iter().map(literal_value).collect::<Option<Vec<_>>>() {
                        Some(values) => KeyHint::Values(values),
                        None => KeyHint::All,
                    }
                }
                _ => KeyHint::All,
            },
            _ => KeyHint::All,
        }
    }
}

/// Shard-key value of a literal expression; `None` for anything computed.
pub(crate) fn literal_value(expr: &Expr) -> Option<ShardValue> {
    match expr {
        Expr::Literal(Literal::Integer(i)) => Some(ShardValue::Int(*i)),
        Expr::Literal(Literal::String(s)) => Some(ShardValue::Str(s.clone())),
        Expr::Literal(Literal::Number(n)) => Some(ShardValue::Str(n.clone())),
        Expr::Unary { op: UnaryOp::Minus, expr } => match expr.as_ref() {
            Expr::Literal(Literal::Integer(i)) => i.checked_neg().map(ShardValue::Int),
            _ => None,
        },
        Expr::Nested(inner) => literal_value(inner),
        _ => None,
    }
}

fn dedup(values: Vec<ShardValue>) -> Vec<ShardValue> {
    let mut seen = BTreeSet::new();
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

fn intersect(a: KeyHint, b: KeyHint) -> KeyHint {
    match (a, b) {
        (KeyHint::All, other) | (other, KeyHint::All) => other,
        (KeyHint::Values(a), KeyHint::Values(b)) => {
            let common: Vec<ShardValue> = a.iter().filter(|v| b.contains(v)).cloned().collect();
            if common.is_empty() {
                // contradictory predicate: any one real shard yields the empty answer
                KeyHint::Values(a)
            } else {
                KeyHint::Values(common)
            }
        }
    }
}

fn union(a: KeyHint, b: KeyHint) -> KeyHint {
    match (a, b) {
        (KeyHint::Values(mut a), KeyHint::Values(b)) => {
            a.extend(b);
            KeyHint::Values(dedup(a))
        }
        _ => KeyHint::All,
    }
}

/// One shard index of a co-located table group: the target of every table.
pub(crate) struct ShardGroup {
    pub slice: String,
    pub db: String,
    pub targets: Vec<RouteTarget>,
}

/// Align the routed shards of several sharded tables by shard index. Only
/// indexes every table was routed to are kept; every table of a group must
/// live on the same slice and database.
pub(crate) fn co_locate(tables: &[ShardedTable], router: &dyn Router) -> ProxyResult<Vec<ShardGroup>> {
    let Some(first) = tables.first() else {
        return Ok(Vec::new());
    };
    let mut common: BTreeSet<usize> = first.targets.iter().map(|t| t.index).collect();
    for t in &tables[1..] {
        let indexes: BTreeSet<usize> = t.targets.iter().map(|t| t.index).collect();
        common = common.intersection(&indexes).copied().collect();
    }

    let mut fallback: Vec<Vec<RouteTarget>> = Vec::new();
    if common.is_empty() {
        // predicates pin disjoint shards; any one shard returns the empty join
        let index = first
            .targets
            .first()
            .map(|t| t.index)
            .ok_or_else(|| ProxyError::Route(format!("no shard for '{}.{}'", first.db, first.name)))?;
        common.insert(index);
        for t in tables {
            fallback.push(router.route(&t.db, &t.name, &KeyHint::All)?);
        }
    }

    let mut groups = Vec::with_capacity(common.len());
    for index in common {
        let mut targets = Vec::with_capacity(tables.len());
        for (pos, t) in tables.iter().enumerate() {
            let pool = fallback.get(pos).unwrap_or(&t.targets);
            let target = pool.iter().find(|rt| rt.index == index).ok_or_else(|| {
                ProxyError::Unsupported(format!(
                    "tables '{}' and '{}' are not co-located",
                    first.name, t.name
                ))
            })?;
            targets.push(target.clone());
        }
        let lead = &targets[0];
        if let Some(stray) = targets.iter().find(|rt| rt.slice != lead.slice || rt.db != lead.db) {
            return Err(ProxyError::Unsupported(format!(
                "cross-slice join between '{}' ({}/{}) and '{}' ({}/{})",
                lead.table, lead.slice, lead.db, stray.table, stray.slice, stray.db
            )));
        }
        groups.push(ShardGroup { slice: lead.slice.clone(), db: lead.db.clone(), targets });
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::Statement;
    use crate::sql::parse_statement;

    fn orders() -> ShardedTable {
        ShardedTable {
            db: "shop".into(),
            name: "orders".into(),
            alias: Some("o".into()),
            key: "id".into(),
            targets: Vec::new(),
        }
    }

    fn hint(where_clause: &str) -> KeyHint {
        let stmt = parse_statement(&format!("SELECT * FROM orders o WHERE {}", where_clause)).unwrap();
        let Statement::Select(select) = stmt else { panic!("expected select") };
        orders().key_hint(select.selection.as_ref())
    }

    fn ints(values: &[i64]) -> KeyHint {
        KeyHint::Values(values.iter().map(|v| ShardValue::Int(*v)).collect())
    }

    #[test]
    fn equality_pins_value() {
        assert_eq!(hint("id = 5"), ints(&[5]));
        assert_eq!(hint("5 = o.id"), ints(&[5]));
        assert_eq!(hint("orders.id = -3"), ints(&[-3]));
    }

    #[test]
    fn in_list_and_or_union() {
        assert_eq!(hint("id IN (1, 2, 2)"), ints(&[1, 2, 2]));
        assert_eq!(hint("id = 1 OR id = 7 OR id = 1"), ints(&[1, 7]));
    }

    #[test]
    fn and_intersects() {
        assert_eq!(hint("id IN (1, 2) AND id IN (2, 3)"), ints(&[2]));
        assert_eq!(hint("id = 4 AND status = 'paid'"), ints(&[4]));
        assert_eq!(hint("id = 1 AND id = 2"), ints(&[1]));
    }

    #[test]
    fn unpinned_predicates_scan_everything() {
        assert_eq!(hint("id > 5"), KeyHint::All);
        assert_eq!(hint("id = ?"), KeyHint::All);
        assert_eq!(hint("id = 1 OR status = 'x'"), KeyHint::All);
        assert_eq!(hint("NOT id = 1"), KeyHint::All);
        assert_eq!(hint("other.id = 1"), KeyHint::All);
    }

    #[test]
    fn nested_parentheses_are_transparent() {
        assert_eq!(hint("(id = 1 OR id = 2) AND (id = 2)"), ints(&[2]));
    }
}
