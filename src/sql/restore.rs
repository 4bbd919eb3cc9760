//! Canonical SQL rendering of the AST.
//!
//! Keywords are upper-cased, identifiers are back-quoted only when they would
//! not lex back as the same identifier, and string literals are re-escaped so
//! their contents survive a parse/restore cycle byte for byte.

use std::fmt::{self, Display, Formatter, Write};

use crate::sql::ast::{
    Assignment, ColumnName, Delete, Expr, Insert, Join, JoinKind, Literal, Select, SelectItem,
    Statement, TableFactor, TableName, UnaryOp, Update,
};
use crate::sql::lexer::Token;
use crate::sql::parser::is_reserved;

/// Words upper-cased when a pass-through statement is restored.
const KEYWORDS: &[&str] = &[
    "ADD", "ALTER", "AUTO_INCREMENT", "BEGIN", "BIGINT", "CHAR", "CHARACTER", "CHARSET", "COLUMN",
    "COLUMNS", "COMMIT", "CREATE", "DATABASE", "DATABASES", "DEFAULT", "DESCRIBE", "DROP",
    "ENGINE", "ERRORS", "EXISTS", "FULL", "GLOBAL", "GRANTS", "IF", "INDEX", "INT", "INTEGER",
    "NAMES", "PRIMARY", "PROCESSLIST", "ROLLBACK", "SESSION", "SHOW", "START", "STATUS", "TABLE",
    "TABLES", "TEXT", "TO", "TRANSACTION", "TRUNCATE", "UNIQUE", "USE", "VARCHAR", "VARIABLES",
    "WARNINGS",
];

pub fn restore(stmt: &Statement) -> String {
    stmt.to_string()
}

fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') && !is_reserved(s)
}

pub struct Ident<'a>(pub &'a str);

impl Display for Ident<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if is_plain_ident(self.0) {
            f.write_str(self.0)
        } else {
            write!(f, "`{}`", self.0.replace('`', "``"))
        }
    }
}

pub struct Quoted<'a>(pub &'a str);

impl Display for Quoted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('\'')?;
        for c in self.0.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\'' => f.write_str("\\'")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                '\0' => f.write_str("\\0")?,
                '\u{1a}' => f.write_str("\\Z")?,
                other => f.write_char(other)?,
            }
        }
        f.write_char('\'')
    }
}

fn comma_separated<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Number(n) => f.write_str(n),
            Literal::String(s) => write!(f, "{}", Quoted(s)),
        }
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{}.", Ident(table))?;
        }
        write!(f, "{}", Ident(&self.name))
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::Placeholder => f.write_str("?"),
            Expr::Variable(v) => f.write_str(v),
            Expr::Default => f.write_str("DEFAULT"),
            Expr::Wildcard => f.write_str("*"),
            Expr::Unary { op: UnaryOp::Not, expr } => write!(f, "NOT {}", expr),
            Expr::Unary { op: UnaryOp::Minus, expr } => write!(f, "-{}", expr),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op.as_str(), right),
            Expr::InList { expr, list, negated } => {
                write!(f, "{} {}IN (", expr, if *negated { "NOT " } else { "" })?;
                comma_separated(f, list)?;
                f.write_char(')')
            }
            Expr::Between { expr, low, high, negated } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                expr,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
            Expr::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", expr, if *negated { "NOT " } else { "" })
            }
            Expr::Like { expr, pattern, negated } => {
                write!(f, "{} {}LIKE {}", expr, if *negated { "NOT " } else { "" }, pattern)
            }
            Expr::Function { name, args, distinct } => {
                write!(f, "{}(", name.to_ascii_uppercase())?;
                if *distinct {
                    f.write_str("DISTINCT ")?;
                }
                comma_separated(f, args)?;
                f.write_char(')')
            }
            Expr::Nested(e) => write!(f, "({})", e),
        }
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", Ident(schema))?;
        }
        write!(f, "{}", Ident(&self.name))
    }
}

impl Display for TableFactor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", Ident(alias))?;
        }
        Ok(())
    }
}

impl Display for Join {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kw = match self.kind {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Cross => "CROSS JOIN",
        };
        write!(f, "{} {}", kw, self.table)?;
        if let Some(on) = &self.on {
            write!(f, " ON {}", on)?;
        }
        Ok(())
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard => f.write_char('*'),
            SelectItem::QualifiedWildcard(t) => write!(f, "{}.*", Ident(t)),
            SelectItem::Expr { expr, alias: None } => write!(f, "{}", expr),
            SelectItem::Expr { expr, alias: Some(alias) } => {
                write!(f, "{} AS {}", expr, Ident(alias))
            }
        }
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

impl Display for Select {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        comma_separated(f, &self.items)?;
        if !self.from.is_empty() {
            f.write_str(" FROM ")?;
            comma_separated(f, &self.from)?;
        }
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            comma_separated(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        for (i, item) in self.order_by.iter().enumerate() {
            f.write_str(if i == 0 { " ORDER BY " } else { ", " })?;
            write!(f, "{}", item.expr)?;
            if item.descending {
                f.write_str(" DESC")?;
            }
        }
        if let Some(limit) = &self.limit {
            match limit.offset {
                Some(offset) => write!(f, " LIMIT {}, {}", offset, limit.count)?,
                None => write!(f, " LIMIT {}", limit.count)?,
            }
        }
        if self.for_update {
            f.write_str(" FOR UPDATE")?;
        }
        Ok(())
    }
}

impl Display for Insert {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(if self.replace { "REPLACE " } else { "INSERT " })?;
        if self.ignore {
            f.write_str("IGNORE ")?;
        }
        write!(f, "INTO {}", self.table)?;
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            let cols: Vec<Ident<'_>> = self.columns.iter().map(|c| Ident(c)).collect();
            comma_separated(f, &cols)?;
            f.write_char(')')?;
        }
        f.write_str(" VALUES ")?;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_char('(')?;
            comma_separated(f, row)?;
            f.write_char(')')?;
        }
        if !self.on_duplicate.is_empty() {
            f.write_str(" ON DUPLICATE KEY UPDATE ")?;
            comma_separated(f, &self.on_duplicate)?;
        }
        Ok(())
    }
}

impl Display for Update {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET ", self.table)?;
        comma_separated(f, &self.assignments)?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}

impl Display for Delete {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}

fn write_tokens(f: &mut Formatter<'_>, tokens: &[Token]) -> fmt::Result {
    let mut prev: Option<&Token> = None;
    for tok in tokens {
        let glue = match (prev, tok) {
            (None, _) => false,
            (_, Token::Symbol(",") | Token::Symbol(")") | Token::Symbol(".") | Token::Symbol(";")) => true,
            (Some(Token::Symbol("(") | Token::Symbol(".") | Token::Symbol("@")), _) => true,
            (Some(Token::Word(_) | Token::Quoted(_)), Token::Symbol("(")) => true,
            _ => false,
        };
        if prev.is_some() && !glue {
            f.write_char(' ')?;
        }
        match tok {
            Token::Word(w) if is_reserved(w) || KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(w)) => {
                f.write_str(&w.to_ascii_uppercase())?
            }
            Token::Word(w) => f.write_str(w)?,
            Token::Quoted(q) => write!(f, "{}", Ident(q))?,
            Token::Str(s) => write!(f, "{}", Quoted(s))?,
            Token::Number(n) => f.write_str(n)?,
            Token::Placeholder => f.write_char('?')?,
            Token::Symbol(s) => f.write_str(s)?,
        }
        prev = Some(tok);
    }
    Ok(())
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(s) => write!(f, "{}", s),
            Statement::Insert(i) => write!(f, "{}", i),
            Statement::Update(u) => write!(f, "{}", u),
            Statement::Delete(d) => write!(f, "{}", d),
            Statement::Explain(inner) => write!(f, "EXPLAIN {}", inner),
            Statement::Other(tokens) => write_tokens(f, tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::parse_statement;

    fn canonical(sql: &str) -> String {
        restore(&parse_statement(sql).unwrap())
    }

    #[test]
    fn keywords_are_uppercased() {
        assert_eq!(canonical("show tables"), "SHOW TABLES");
        assert_eq!(canonical("select a from t where b=1"), "SELECT a FROM t WHERE b = 1");
    }

    #[test]
    fn identifiers_quoted_only_when_needed() {
        assert_eq!(canonical("SELECT `a` FROM `order`"), "SELECT a FROM `order`");
        assert_eq!(canonical("SELECT `my col` FROM t"), "SELECT `my col` FROM t");
    }

    #[test]
    fn string_escapes_survive() {
        assert_eq!(canonical(r"SELECT 'it''s', 'a\\b'"), r"SELECT 'it\'s', 'a\\b'");
    }

    #[test]
    fn pass_through_spacing() {
        assert_eq!(
            canonical("create table t (id int, name varchar(20))"),
            "CREATE TABLE t(id INT, name VARCHAR(20))"
        );
        assert_eq!(canonical("set names utf8mb4"), "SET NAMES utf8mb4");
    }
}
