//! Substitution of physical shard names into a logical statement.

use crate::router::RouteTarget;
use crate::sql::ast::{ColumnName, Delete, Expr, Select, SelectItem, TableName, Update};

/// One logical table and the physical shard it is replaced with.
#[derive(Debug, Clone)]
pub(crate) struct TableRename {
    pub db: String,
    pub table: String,
    pub physical_db: String,
    pub physical_table: String,
}

impl TableRename {
    pub fn new(db: &str, table: &str, target: &RouteTarget) -> Self {
        TableRename {
            db: db.to_string(),
            table: table.to_string(),
            physical_db: target.db.clone(),
            physical_table: target.table.clone(),
        }
    }
}

pub(crate) struct Renamer<'a> {
    default_db: &'a str,
    renames: &'a [TableRename],
    /// Aliases declared in the statement; a qualifier equal to one of these
    /// names the alias, never the table.
    aliases: Vec<String>,
}

impl<'a> Renamer<'a> {
    pub fn new(default_db: &'a str, renames: &'a [TableRename]) -> Self {
        Renamer { default_db, renames, aliases: Vec::new() }
    }

    fn with_aliases<'b>(mut self, aliases: impl IntoIterator<Item = &'b Option<String>>) -> Self {
        self.aliases = aliases.into_iter().flatten().cloned().collect();
        self
    }

    fn find(&self, table: &TableName) -> Option<&TableRename> {
        let db = table.schema.as_deref().unwrap_or(self.default_db);
        self.renames.iter().find(|r| {
            r.table.eq_ignore_ascii_case(&table.name) && r.db.eq_ignore_ascii_case(db)
        })
    }

    pub fn table(&self, table: &mut TableName) {
        if let Some(r) = self.find(table) {
            table.name = r.physical_table.clone();
            if table.schema.is_some() {
                table.schema = Some(r.physical_db.clone());
            }
        }
    }

    fn qualifier(&self, name: &str) -> Option<&str> {
        if self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            return None;
        }
        self.renames
            .iter()
            .find(|r| r.table.eq_ignore_ascii_case(name))
            .map(|r| r.physical_table.as_str())
    }

    fn column(&self, col: &mut ColumnName) {
        let renamed = col.table.as_deref().and_then(|q| self.qualifier(q));
        if let Some(physical) = renamed {
            col.table = Some(physical.to_string());
        }
    }

    fn expr(&self, expr: &mut Expr) {
        expr.visit_columns_mut(&mut |c| self.column(c));
    }
}

pub(crate) fn rewrite_select(select: &Select, default_db: &str, renames: &[TableRename]) -> Select {
    let mut out = select.clone();
    let renamer = Renamer::new(default_db, renames)
        .with_aliases(select.from.iter().chain(select.joins.iter().map(|j| &j.table)).map(|f| &f.alias));

    for factor in out.from.iter_mut() {
        renamer.table(&mut factor.table);
    }
    for join in out.joins.iter_mut() {
        renamer.table(&mut join.table.table);
        if let Some(on) = join.on.as_mut() {
            renamer.expr(on);
        }
    }
    for item in out.items.iter_mut() {
        match item {
            SelectItem::Wildcard => {}
            SelectItem::QualifiedWildcard(t) => {
                if let Some(physical) = renamer.qualifier(t) {
                    *t = physical.to_string();
                }
            }
            SelectItem::Expr { expr, .. } => renamer.expr(expr),
        }
    }
    if let Some(selection) = out.selection.as_mut() {
        renamer.expr(selection);
    }
    for e in out.group_by.iter_mut() {
        renamer.expr(e);
    }
    if let Some(having) = out.having.as_mut() {
        renamer.expr(having);
    }
    for item in out.order_by.iter_mut() {
        renamer.expr(&mut item.expr);
    }
    out
}

pub(crate) fn rewrite_update(update: &Update, default_db: &str, renames: &[TableRename]) -> Update {
    let mut out = update.clone();
    let renamer = Renamer::new(default_db, renames).with_aliases([&update.table.alias]);
    renamer.table(&mut out.table.table);
    for a in out.assignments.iter_mut() {
        renamer.column(&mut a.column);
        renamer.expr(&mut a.value);
    }
    if let Some(selection) = out.selection.as_mut() {
        renamer.expr(selection);
    }
    out
}

pub(crate) fn rewrite_delete(delete: &Delete, default_db: &str, renames: &[TableRename]) -> Delete {
    let mut out = delete.clone();
    let renamer = Renamer::new(default_db, renames);
    renamer.table(&mut out.table);
    if let Some(selection) = out.selection.as_mut() {
        renamer.expr(selection);
    }
    out
}
