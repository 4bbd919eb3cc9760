//! Merging of per-target results into the client-facing result.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{ProxyError, ProxyResult};
use crate::result::ResultSet;
use crate::sql::ast::{Expr, Limit, Literal, Select, SelectItem};

/// One ORDER BY item resolved against the merged result's columns.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SortKey {
    /// Result column by name.
    Column(String),
    /// Zero-based result column, from `ORDER BY <n>`.
    Position(usize),
}

/// Post-processing a fanned-out SELECT needs once its parts are concatenated.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectMerge {
    /// ORDER BY re-applied after concatenation, `true` for descending.
    pub order_by: Vec<(SortKey, bool)>,
    /// The client's original LIMIT; shards were asked for `offset + count`.
    pub limit: Option<Limit>,
    /// physical table -> logical table, lower-cased keys.
    pub table_names: HashMap<String, String>,
}

impl SelectMerge {
    /// Sort keys for the ORDER BY of `select`, or `None` when some item cannot
    /// be found in the result: expressions, aggregates, out-of-range ordinals
    /// and columns missing from an explicit projection.
    pub fn sort_keys(select: &Select) -> Option<Vec<(SortKey, bool)>> {
        let wildcard = select
            .items
            .iter()
            .any(|i| matches!(i, SelectItem::Wildcard | SelectItem::QualifiedWildcard(_)));
        let mut keys = Vec::with_capacity(select.order_by.len());
        for item in &select.order_by {
            let key = match &item.expr {
                Expr::Literal(Literal::Integer(n)) if *n >= 1 => {
                    let pos = (*n - 1) as usize;
                    if !wildcard && pos >= select.items.len() {
                        return None;
                    }
                    SortKey::Position(pos)
                }
                Expr::Column(c) if wildcard || projects(&select.items, &c.name) => {
                    SortKey::Column(c.name.clone())
                }
                _ => return None,
            };
            keys.push((key, item.descending));
        }
        Some(keys)
    }

    pub fn add_table(&mut self, physical: &str, logical: &str) {
        self.table_names.insert(physical.to_ascii_lowercase(), logical.to_string());
    }
}

/// Whether an explicit projection yields a result column named `name`.
fn projects(items: &[SelectItem], name: &str) -> bool {
    items.iter().any(|item| match item {
        SelectItem::Expr { alias: Some(alias), .. } => alias.eq_ignore_ascii_case(name),
        SelectItem::Expr { expr: Expr::Column(c), alias: None } => c.name.eq_ignore_ascii_case(name),
        _ => false,
    })
}

/// Concatenate row sets in routing-map order, column metadata from the first.
///
/// A sort key missing from the merged columns fails the merge when a LIMIT
/// has to be re-applied, since the top rows could not be picked.
pub(crate) fn merge_select(results: Vec<ResultSet>, merge: &SelectMerge) -> ProxyResult<ResultSet> {
    let mut parts = results.into_iter();
    let Some(mut merged) = parts.next() else {
        return Ok(ResultSet::default());
    };
    for part in parts {
        merged.rows.extend(part.rows);
        merged.affected_rows += part.affected_rows;
    }
    for col in merged.columns.iter_mut() {
        let logical = col
            .table
            .as_deref()
            .and_then(|t| merge.table_names.get(&t.to_ascii_lowercase()));
        if let Some(logical) = logical {
            col.table = Some(logical.clone());
        }
    }

    if !merge.order_by.is_empty() {
        let width = merged.columns.len();
        let keys: Option<Vec<(usize, bool)>> = merge
            .order_by
            .iter()
            .map(|(key, desc)| {
                let index = match key {
                    SortKey::Column(name) => merged.column_index(name),
                    SortKey::Position(pos) => (*pos < width).then_some(*pos),
                };
                index.map(|i| (i, *desc))
            })
            .collect();
        match keys {
            Some(keys) => {
                merged.rows.sort_by(|a, b| {
                    for (i, desc) in &keys {
                        let ord = match (a.get(*i), b.get(*i)) {
                            (Some(x), Some(y)) => x.sort_cmp(y),
                            _ => Ordering::Equal,
                        };
                        let ord = if *desc { ord.reverse() } else { ord };
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    Ordering::Equal
                });
            }
            None if merge.limit.is_some() => {
                return Err(ProxyError::Unsupported(
                    "ORDER BY key of a cross-shard LIMIT is missing from the result".into(),
                ));
            }
            None => {}
        }
    }

    if let Some(limit) = merge.limit {
        let offset = limit.offset.unwrap_or(0) as usize;
        merged.rows = merged.rows.into_iter().skip(offset).take(limit.count as usize).collect();
    }
    Ok(merged)
}

/// Sum affected rows; `generated` (a sequence value handed out while
/// planning) wins over whatever ids the backends report.
pub(crate) fn merge_write(results: Vec<ResultSet>, generated: Option<u64>) -> ResultSet {
    let affected_rows = results.iter().map(|r| r.affected_rows).sum();
    let reported = results.iter().map(|r| r.last_insert_id).max().unwrap_or(0);
    ResultSet::affected(affected_rows, generated.unwrap_or(reported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Column, Value};

    fn part(table: &str, ids: &[i64]) -> ResultSet {
        ResultSet {
            columns: vec![Column::from_table("id", table)],
            rows: ids.iter().map(|i| vec![Value::Int(*i)]).collect(),
            ..Default::default()
        }
    }

    fn ids(rs: &ResultSet) -> Vec<i64> {
        rs.rows
            .iter()
            .map(|r| match r[0] {
                Value::Int(i) => i,
                _ => panic!("expected int"),
            })
            .collect()
    }

    #[test]
    fn rows_concatenate_and_tables_renamed() {
        let mut merge = SelectMerge::default();
        merge.add_table("orders_0", "orders");
        merge.add_table("orders_1", "orders");
        let rs = merge_select(vec![part("orders_0", &[1, 3]), part("orders_1", &[2])], &merge).unwrap();
        assert_eq!(ids(&rs), vec![1, 3, 2]);
        assert_eq!(rs.columns[0].table.as_deref(), Some("orders"));
    }

    #[test]
    fn order_and_limit_reapplied() {
        let merge = SelectMerge {
            order_by: vec![(SortKey::Column("id".into()), true)],
            limit: Some(Limit { offset: Some(1), count: 2 }),
            ..Default::default()
        };
        let rs = merge_select(vec![part("t_0", &[5, 1]), part("t_1", &[4, 2])], &merge).unwrap();
        assert_eq!(ids(&rs), vec![4, 2]);
    }

    #[test]
    fn positional_order_reapplied() {
        let merge = SelectMerge {
            order_by: vec![(SortKey::Position(0), false)],
            limit: Some(Limit { offset: None, count: 1 }),
            ..Default::default()
        };
        let parts = vec![part("t_0", &[4]), part("t_1", &[1, 5]), part("t_2", &[]), part("t_3", &[3])];
        let rs = merge_select(parts, &merge).unwrap();
        assert_eq!(ids(&rs), vec![1]);
    }

    #[test]
    fn missing_sort_column_under_limit_fails() {
        let merge = SelectMerge {
            order_by: vec![(SortKey::Column("created".into()), false)],
            limit: Some(Limit { offset: None, count: 1 }),
            ..Default::default()
        };
        let res = merge_select(vec![part("t_0", &[4]), part("t_1", &[1])], &merge);
        assert!(matches!(res, Err(ProxyError::Unsupported(_))));
    }

    fn keys(sql: &str) -> Option<Vec<(SortKey, bool)>> {
        let crate::sql::ast::Statement::Select(select) = crate::sql::parse_statement(sql).unwrap() else {
            panic!("expected select")
        };
        SelectMerge::sort_keys(&select)
    }

    #[test]
    fn sort_keys_resolve_against_projection() {
        assert_eq!(keys("SELECT id FROM t ORDER BY 1 DESC"), Some(vec![(SortKey::Position(0), true)]));
        assert_eq!(keys("SELECT * FROM t ORDER BY t.created"), Some(vec![(SortKey::Column("created".into()), false)]));
        assert_eq!(keys("SELECT n AS c FROM t ORDER BY c"), Some(vec![(SortKey::Column("c".into()), false)]));
        assert_eq!(keys("SELECT id FROM t ORDER BY created"), None);
        assert_eq!(keys("SELECT id FROM t ORDER BY 2"), None);
        assert_eq!(keys("SELECT id FROM t ORDER BY id + 1"), None);
        assert_eq!(keys("SELECT n, COUNT(*) FROM t GROUP BY n ORDER BY COUNT(*)"), None);
        assert_eq!(keys("SELECT id FROM t"), Some(Vec::new()));
    }

    #[test]
    fn unknown_sort_column_keeps_concatenation_order() {
        let merge = SelectMerge {
            order_by: vec![(SortKey::Column("missing".into()), false)],
            ..Default::default()
        };
        let rs = merge_select(vec![part("t_0", &[3]), part("t_1", &[1])], &merge).unwrap();
        assert_eq!(ids(&rs), vec![3, 1]);
    }

    #[test]
    fn writes_sum_and_pick_insert_id() {
        let parts = vec![ResultSet::affected(2, 7), ResultSet::affected(3, 9)];
        let rs = merge_write(parts.clone(), None);
        assert_eq!((rs.affected_rows, rs.last_insert_id), (5, 9));
        let rs = merge_write(parts, Some(100));
        assert_eq!(rs.last_insert_id, 100);
    }

    #[test]
    fn empty_merge_is_empty() {
        assert_eq!(merge_select(Vec::new(), &SelectMerge::default()).unwrap(), ResultSet::default());
    }
}
