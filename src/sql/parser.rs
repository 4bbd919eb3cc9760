use crate::error::{ProxyError, ProxyResult};
use crate::sql::ast::{
    Assignment, BinaryOp, ColumnName, Delete, Expr, Insert, Join, JoinKind, Limit, Literal,
    OrderByItem, Select, SelectItem, Statement, TableFactor, TableName, UnaryOp, Update,
};
use crate::sql::lexer::{Token, tokenize};

/// Words that can never be a bare identifier or an implicit alias.
const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CROSS", "DELETE", "DESC", "DISTINCT", "DIV",
    "DUAL", "EXPLAIN", "FALSE", "FOR", "FROM", "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTO",
    "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "LOCK", "MOD", "NOT", "NULL", "ON", "OR",
    "ORDER", "OUTER", "REPLACE", "RIGHT", "SELECT", "SET", "TRUE", "UNION", "UPDATE", "USING",
    "VALUES", "WHERE",
];

/// Deepest expression or EXPLAIN nesting accepted before the statement is refused.
const MAX_DEPTH: usize = 64;

/// Statements that EXPLAIN may wrap; anything else after EXPLAIN is a table description.
const EXPLAINABLE: &[&str] = &[
    "SELECT", "INSERT", "REPLACE", "UPDATE", "DELETE", "EXPLAIN", "DESC", "DESCRIBE", "SHOW", "SET",
    "CREATE", "DROP", "ALTER", "TRUNCATE",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

pub fn parse_statement(input: &str) -> ProxyResult<Statement> {
    let mut tokens = tokenize(input)?;
    while tokens.last().is_some_and(|t| t.is_symbol(";")) {
        tokens.pop();
    }
    if tokens.is_empty() {
        return Err(ProxyError::Parse("empty statement".into()));
    }
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let stmt = parser.statement()?;
    if let Some(tok) = parser.peek() {
        return Err(ProxyError::Parse(format!("unexpected trailing token {:?}", tok)));
    }
    Ok(stmt)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek_word(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(kw))
    }

    fn peek_symbol(&self, sym: &str) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(sym))
    }

    fn eat_word(&mut self, kw: &str) -> bool {
        if self.peek_word(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_symbol(&mut self, sym: &str) -> bool {
        if self.peek_symbol(sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, kw: &str) -> ProxyResult<()> {
        if self.eat_word(kw) {
            Ok(())
        } else {
            Err(self.unexpected(kw))
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> ProxyResult<()> {
        if self.eat_symbol(sym) {
            Ok(())
        } else {
            Err(self.unexpected(sym))
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ProxyResult<T>) -> ProxyResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(ProxyError::Parse(format!(
                "statement nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    fn unexpected(&self, wanted: &str) -> ProxyError {
        match self.peek() {
            Some(tok) => ProxyError::Parse(format!("expected {} but found {:?}", wanted, tok)),
            None => ProxyError::Parse(format!("expected {} but reached end of statement", wanted)),
        }
    }

    fn statement(&mut self) -> ProxyResult<Statement> {
        let first = match self.peek() {
            Some(Token::Word(w)) => w.to_ascii_uppercase(),
            Some(Token::Symbol("(")) => {
                return Err(ProxyError::Unsupported("parenthesized statements are not supported".into()));
            }
            _ => return self.other(),
        };
        match first.as_str() {
            "EXPLAIN" | "DESC" | "DESCRIBE" => {
                let wraps = matches!(
                    self.peek_at(1),
                    Some(Token::Word(w)) if EXPLAINABLE.iter().any(|k| k.eq_ignore_ascii_case(w))
                );
                if !wraps {
                    return self.other();
                }
                self.pos += 1;
                Ok(Statement::Explain(Box::new(self.nested(Self::statement)?)))
            }
            "SELECT" => Ok(Statement::Select(Box::new(self.select()?))),
            "INSERT" | "REPLACE" => Ok(Statement::Insert(self.insert()?)),
            "UPDATE" => Ok(Statement::Update(self.update()?)),
            "DELETE" => Ok(Statement::Delete(self.delete()?)),
            _ => self.other(),
        }
    }

    fn other(&mut self) -> ProxyResult<Statement> {
        let rest = self.tokens[self.pos..].to_vec();
        self.pos = self.tokens.len();
        Ok(Statement::Other(rest))
    }

    fn ident(&mut self) -> ProxyResult<String> {
        match self.peek() {
            Some(Token::Word(w)) if !is_reserved(w) => {
                let w = w.clone();
                self.pos += 1;
                Ok(w)
            }
            Some(Token::Quoted(q)) => {
                let q = q.clone();
                self.pos += 1;
                Ok(q)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Identifier after a `.`; keywords are allowed there.
    fn qualified_part(&mut self) -> ProxyResult<String> {
        match self.next() {
            Some(Token::Word(w)) | Some(Token::Quoted(w)) => Ok(w),
            _ => Err(ProxyError::Parse("expected identifier after '.'".into())),
        }
    }

    fn table_name(&mut self) -> ProxyResult<TableName> {
        let first = self.ident()?;
        if self.eat_symbol(".") {
            let name = self.qualified_part()?;
            Ok(TableName { schema: Some(first), name })
        } else {
            Ok(TableName { schema: None, name: first })
        }
    }

    fn alias(&mut self) -> ProxyResult<Option<String>> {
        if self.eat_word("AS") {
            return match self.next() {
                Some(Token::Word(w)) | Some(Token::Quoted(w)) | Some(Token::Str(w)) => Ok(Some(w)),
                _ => Err(ProxyError::Parse("expected alias after AS".into())),
            };
        }
        match self.peek() {
            Some(Token::Word(w)) if !is_reserved(w) => {
                let w = w.clone();
                self.pos += 1;
                Ok(Some(w))
            }
            Some(Token::Quoted(q)) => {
                let q = q.clone();
                self.pos += 1;
                Ok(Some(q))
            }
            _ => Ok(None),
        }
    }

    fn table_factor(&mut self) -> ProxyResult<TableFactor> {
        if self.peek_symbol("(") {
            return Err(ProxyError::Unsupported("derived tables are not supported".into()));
        }
        let table = self.table_name()?;
        let alias = self.alias()?;
        Ok(TableFactor { table, alias })
    }

    fn select(&mut self) -> ProxyResult<Select> {
        self.expect_word("SELECT")?;
        let distinct = self.eat_word("DISTINCT");
        if !distinct {
            self.eat_word("ALL");
        }
        let mut items = vec![self.select_item()?];
        while self.eat_symbol(",") {
            items.push(self.select_item()?);
        }

        let mut from = Vec::new();
        let mut joins = Vec::new();
        if self.eat_word("FROM") {
            if self.eat_word("DUAL") {
                // SELECT ... FROM DUAL has no table
            } else {
                from.push(self.table_factor()?);
                while self.eat_symbol(",") {
                    from.push(self.table_factor()?);
                }
                while let Some(kind) = self.join_kind()? {
                    let table = self.table_factor()?;
                    let on = if self.eat_word("ON") {
                        Some(self.expr()?)
                    } else if self.peek_word("USING") {
                        return Err(ProxyError::Unsupported("JOIN ... USING is not supported".into()));
                    } else {
                        None
                    };
                    joins.push(Join { kind, table, on });
                }
            }
        }

        let selection = if self.eat_word("WHERE") { Some(self.expr()?) } else { None };

        let mut group_by = Vec::new();
        if self.eat_word("GROUP") {
            self.expect_word("BY")?;
            group_by.push(self.expr()?);
            while self.eat_symbol(",") {
                group_by.push(self.expr()?);
            }
        }
        let having = if self.eat_word("HAVING") { Some(self.expr()?) } else { None };
        let order_by = self.order_by()?;
        let limit = self.limit()?;
        let for_update = if self.eat_word("FOR") {
            self.expect_word("UPDATE")?;
            true
        } else {
            false
        };
        if self.peek_word("UNION") {
            return Err(ProxyError::Unsupported("UNION is not supported".into()));
        }

        Ok(Select {
            distinct,
            items,
            from,
            joins,
            selection,
            group_by,
            having,
            order_by,
            limit,
            for_update,
        })
    }

    fn join_kind(&mut self) -> ProxyResult<Option<JoinKind>> {
        if self.eat_word("JOIN") {
            return Ok(Some(JoinKind::Inner));
        }
        let kind = if self.eat_word("INNER") {
            JoinKind::Inner
        } else if self.eat_word("CROSS") {
            JoinKind::Cross
        } else if self.eat_word("LEFT") {
            self.eat_word("OUTER");
            JoinKind::Left
        } else if self.eat_word("RIGHT") {
            self.eat_word("OUTER");
            JoinKind::Right
        } else {
            return Ok(None);
        };
        self.expect_word("JOIN")?;
        Ok(Some(kind))
    }

    fn select_item(&mut self) -> ProxyResult<SelectItem> {
        if self.eat_symbol("*") {
            return Ok(SelectItem::Wildcard);
        }
        let qualified_star = matches!(self.peek(), Some(Token::Word(_)) | Some(Token::Quoted(_)))
            && self.peek_at(1).is_some_and(|t| t.is_symbol("."))
            && self.peek_at(2).is_some_and(|t| t.is_symbol("*"));
        if qualified_star {
            let table = self.qualified_part()?;
            self.pos += 2;
            return Ok(SelectItem::QualifiedWildcard(table));
        }
        let expr = self.expr()?;
        let alias = self.alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    fn order_by(&mut self) -> ProxyResult<Vec<OrderByItem>> {
        let mut items = Vec::new();
        if self.eat_word("ORDER") {
            self.expect_word("BY")?;
            loop {
                let expr = self.expr()?;
                let descending = if self.eat_word("DESC") {
                    true
                } else {
                    self.eat_word("ASC");
                    false
                };
                items.push(OrderByItem { expr, descending });
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }
        Ok(items)
    }

    fn unsigned(&mut self) -> ProxyResult<u64> {
        match self.next() {
            Some(Token::Number(n)) => n
                .parse::<u64>()
                .map_err(|_| ProxyError::Parse(format!("invalid LIMIT value '{}'", n))),
            Some(tok) => Err(ProxyError::Parse(format!("expected number but found {:?}", tok))),
            None => Err(ProxyError::Parse("expected number but reached end of statement".into())),
        }
    }

    fn limit(&mut self) -> ProxyResult<Option<Limit>> {
        if !self.eat_word("LIMIT") {
            return Ok(None);
        }
        let first = self.unsigned()?;
        if self.eat_symbol(",") {
            let count = self.unsigned()?;
            Ok(Some(Limit { offset: Some(first), count }))
        } else if self.eat_word("OFFSET") {
            let offset = self.unsigned()?;
            Ok(Some(Limit { offset: Some(offset), count: first }))
        } else {
            Ok(Some(Limit { offset: None, count: first }))
        }
    }

    fn column_name(&mut self) -> ProxyResult<ColumnName> {
        let first = self.ident()?;
        if self.eat_symbol(".") {
            let name = self.qualified_part()?;
            Ok(ColumnName { table: Some(first), name })
        } else {
            Ok(ColumnName { table: None, name: first })
        }
    }

    fn assignments(&mut self) -> ProxyResult<Vec<Assignment>> {
        let mut out = Vec::new();
        loop {
            let column = self.column_name()?;
            self.expect_symbol("=")?;
            let value = self.expr()?;
            out.push(Assignment { column, value });
            if !self.eat_symbol(",") {
                break;
            }
        }
        Ok(out)
    }

    fn insert(&mut self) -> ProxyResult<Insert> {
        let replace = self.eat_word("REPLACE");
        if !replace {
            self.expect_word("INSERT")?;
        }
        let ignore = self.eat_word("IGNORE");
        self.eat_word("INTO");
        let table = self.table_name()?;

        let mut columns = Vec::new();
        let mut rows = Vec::new();
        if self.eat_word("SET") {
            let mut row = Vec::new();
            for a in self.assignments()? {
                columns.push(a.column.name);
                row.push(a.value);
            }
            rows.push(row);
        } else {
            if self.eat_symbol("(") {
                columns.push(self.ident()?);
                while self.eat_symbol(",") {
                    columns.push(self.ident()?);
                }
                self.expect_symbol(")")?;
            }
            if self.peek_word("SELECT") {
                return Err(ProxyError::Unsupported("INSERT ... SELECT is not supported".into()));
            }
            if !self.eat_word("VALUES") && !self.eat_word("VALUE") {
                return Err(self.unexpected("VALUES"));
            }
            loop {
                self.expect_symbol("(")?;
                let mut row = Vec::new();
                if !self.peek_symbol(")") {
                    row.push(self.insert_value()?);
                    while self.eat_symbol(",") {
                        row.push(self.insert_value()?);
                    }
                }
                self.expect_symbol(")")?;
                rows.push(row);
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }

        let mut on_duplicate = Vec::new();
        if self.eat_word("ON") {
            self.expect_word("DUPLICATE")?;
            self.expect_word("KEY")?;
            self.expect_word("UPDATE")?;
            on_duplicate = self.assignments()?;
        }

        Ok(Insert { replace, ignore, table, columns, rows, on_duplicate })
    }

    fn insert_value(&mut self) -> ProxyResult<Expr> {
        if self.eat_word("DEFAULT") {
            return Ok(Expr::Default);
        }
        self.expr()
    }

    fn update(&mut self) -> ProxyResult<Update> {
        self.expect_word("UPDATE")?;
        self.eat_word("LOW_PRIORITY");
        self.eat_word("IGNORE");
        let table = self.table_factor()?;
        if self.peek_symbol(",") || self.peek_word("JOIN") {
            return Err(ProxyError::Unsupported("multi-table UPDATE is not supported".into()));
        }
        self.expect_word("SET")?;
        let assignments = self.assignments()?;
        let selection = if self.eat_word("WHERE") { Some(self.expr()?) } else { None };
        let limit = if self.eat_word("LIMIT") { Some(self.unsigned()?) } else { None };
        Ok(Update { table, assignments, selection, limit })
    }

    fn delete(&mut self) -> ProxyResult<Delete> {
        self.expect_word("DELETE")?;
        self.expect_word("FROM")?;
        let table = self.table_name()?;
        let selection = if self.eat_word("WHERE") { Some(self.expr()?) } else { None };
        let limit = if self.eat_word("LIMIT") { Some(self.unsigned()?) } else { None };
        Ok(Delete { table, selection, limit })
    }

    fn expr(&mut self) -> ProxyResult<Expr> {
        self.nested(Self::or_expr)
    }

    fn or_expr(&mut self) -> ProxyResult<Expr> {
        let mut left = self.and_expr()?;
        while self.eat_word("OR") {
            let right = self.and_expr()?;
            left = Expr::Binary { left: Box::new(left), op: BinaryOp::Or, right: Box::new(right) };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> ProxyResult<Expr> {
        let mut left = self.not_expr()?;
        while self.eat_word("AND") {
            let right = self.not_expr()?;
            left = Expr::Binary { left: Box::new(left), op: BinaryOp::And, right: Box::new(right) };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> ProxyResult<Expr> {
        if self.eat_word("NOT") {
            let expr = self.nested(Self::not_expr)?;
            return Ok(Expr::Unary { op: UnaryOp::Not, expr: Box::new(expr) });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ProxyResult<Expr> {
        let left = self.additive()?;

        if self.eat_word("IS") {
            let negated = self.eat_word("NOT");
            self.expect_word("NULL")?;
            return Ok(Expr::IsNull { expr: Box::new(left), negated });
        }

        let negated = self.peek_word("NOT")
            && self
                .peek_at(1)
                .is_some_and(|t| t.is_word("IN") || t.is_word("BETWEEN") || t.is_word("LIKE"));
        if negated {
            self.pos += 1;
        }
        if self.eat_word("IN") {
            self.expect_symbol("(")?;
            if self.peek_word("SELECT") {
                return Err(ProxyError::Unsupported("subqueries are not supported".into()));
            }
            let mut list = vec![self.expr()?];
            while self.eat_symbol(",") {
                list.push(self.expr()?);
            }
            self.expect_symbol(")")?;
            return Ok(Expr::InList { expr: Box::new(left), list, negated });
        }
        if self.eat_word("BETWEEN") {
            let low = self.additive()?;
            self.expect_word("AND")?;
            let high = self.additive()?;
            return Ok(Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }
        if self.eat_word("LIKE") {
            let pattern = self.additive()?;
            return Ok(Expr::Like { expr: Box::new(left), pattern: Box::new(pattern), negated });
        }

        let op = match self.peek() {
            Some(Token::Symbol("=")) => BinaryOp::Eq,
            Some(Token::Symbol("<=>")) => BinaryOp::NullSafeEq,
            Some(Token::Symbol("!=")) | Some(Token::Symbol("<>")) => BinaryOp::NotEq,
            Some(Token::Symbol("<")) => BinaryOp::Lt,
            Some(Token::Symbol("<=")) => BinaryOp::LtEq,
            Some(Token::Symbol(">")) => BinaryOp::Gt,
            Some(Token::Symbol(">=")) => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(Expr::Binary { left: Box::new(left), op, right: Box::new(right) })
    }

    fn additive(&mut self) -> ProxyResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.eat_symbol("+") {
                BinaryOp::Plus
            } else if self.eat_symbol("-") {
                BinaryOp::Minus
            } else {
                return Ok(left);
            };
            let right = self.multiplicative()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right) };
        }
    }

    fn multiplicative(&mut self) -> ProxyResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_symbol("*") {
                BinaryOp::Multiply
            } else if self.eat_symbol("/") {
                BinaryOp::Divide
            } else if self.eat_symbol("%") || self.eat_word("MOD") {
                BinaryOp::Modulo
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right) };
        }
    }

    fn unary(&mut self) -> ProxyResult<Expr> {
        if self.eat_symbol("-") {
            let expr = self.nested(Self::unary)?;
            return Ok(Expr::Unary { op: UnaryOp::Minus, expr: Box::new(expr) });
        }
        if self.eat_symbol("+") {
            return self.nested(Self::unary);
        }
        self.primary()
    }

    fn primary(&mut self) -> ProxyResult<Expr> {
        let tok = self
            .next()
            .ok_or_else(|| ProxyError::Parse("unexpected end of expression".into()))?;
        match tok {
            Token::Number(n) => Ok(Expr::Literal(match n.parse::<i64>() {
                Ok(i) => Literal::Integer(i),
                Err(_) => Literal::Number(n),
            })),
            Token::Str(s) => Ok(Expr::Literal(Literal::String(s))),
            Token::Placeholder => Ok(Expr::Placeholder),
            Token::Symbol("(") => {
                if self.peek_word("SELECT") {
                    return Err(ProxyError::Unsupported("subqueries are not supported".into()));
                }
                let inner = self.expr()?;
                self.expect_symbol(")")?;
                Ok(Expr::Nested(Box::new(inner)))
            }
            Token::Symbol("@") => {
                let mut name = String::from("@");
                if self.eat_symbol("@") {
                    name.push('@');
                }
                name.push_str(&self.qualified_part()?);
                while self.eat_symbol(".") {
                    name.push('.');
                    name.push_str(&self.qualified_part()?);
                }
                Ok(Expr::Variable(name))
            }
            Token::Word(w) if w.eq_ignore_ascii_case("NULL") => Ok(Expr::Literal(Literal::Null)),
            Token::Word(w) if w.eq_ignore_ascii_case("TRUE") => {
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            Token::Word(w) if w.eq_ignore_ascii_case("FALSE") => {
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            Token::Word(w) if self.peek_symbol("(") => self.function(w),
            Token::Word(w) if is_reserved(&w) => {
                Err(ProxyError::Parse(format!("unexpected keyword '{}'", w)))
            }
            Token::Word(w) | Token::Quoted(w) => {
                if self.eat_symbol(".") {
                    let name = self.qualified_part()?;
                    Ok(Expr::Column(ColumnName { table: Some(w), name }))
                } else {
                    Ok(Expr::Column(ColumnName { table: None, name: w }))
                }
            }
            other => Err(ProxyError::Parse(format!("unexpected token {:?}", other))),
        }
    }

    fn function(&mut self, name: String) -> ProxyResult<Expr> {
        self.expect_symbol("(")?;
        let mut args = Vec::new();
        let distinct = self.eat_word("DISTINCT");
        if self.eat_symbol("*") {
            args.push(Expr::Wildcard);
        } else if !self.peek_symbol(")") {
            args.push(self.expr()?);
            while self.eat_symbol(",") {
                args.push(self.expr()?);
            }
        }
        self.expect_symbol(")")?;
        Ok(Expr::Function { name, args, distinct })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_select_with_join_and_limit() {
        let stmt = parse_statement(
            "SELECT o.id, u.name FROM orders o JOIN users AS u ON o.uid = u.id WHERE o.id IN (1, 2) LIMIT 5, 10",
        )
        .unwrap();
        let Statement::Select(select) = stmt else { panic!("expected select") };
        assert_eq!(select.from.len(), 1);
        assert_eq!(select.from[0].alias.as_deref(), Some("o"));
        assert_eq!(select.joins.len(), 1);
        assert_eq!(select.joins[0].table.table.name, "users");
        assert_eq!(select.limit, Some(Limit { offset: Some(5), count: 10 }));
    }

    #[test]
    fn parse_insert_set_form() {
        let stmt = parse_statement("INSERT INTO t SET a = 1, b = 'x'").unwrap();
        let Statement::Insert(insert) = stmt else { panic!("expected insert") };
        assert_eq!(insert.columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(insert.rows.len(), 1);
    }

    #[test]
    fn explain_of_table_is_a_description() {
        let stmt = parse_statement("EXPLAIN orders").unwrap();
        assert!(matches!(stmt, Statement::Other(_)));
    }

    #[test]
    fn nested_explain_parses() {
        let stmt = parse_statement("EXPLAIN EXPLAIN SELECT 1").unwrap();
        let Statement::Explain(inner) = stmt else { panic!("expected explain") };
        assert!(matches!(*inner, Statement::Explain(_)));
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        let deep = format!("SELECT * FROM t WHERE {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(parse_statement(&deep), Err(ProxyError::Parse(_))));
        let nots = format!("SELECT * FROM t WHERE {}a = 1", "NOT ".repeat(10_000));
        assert!(matches!(parse_statement(&nots), Err(ProxyError::Parse(_))));
        let signs = format!("SELECT {}1", "- ".repeat(10_000));
        assert!(matches!(parse_statement(&signs), Err(ProxyError::Parse(_))));
        let explains = format!("{}SELECT 1", "EXPLAIN ".repeat(10_000));
        assert!(matches!(parse_statement(&explains), Err(ProxyError::Parse(_))));

        let fine = format!("SELECT * FROM t WHERE {}a = 1{}", "(".repeat(40), ")".repeat(40));
        assert!(parse_statement(&fine).is_ok());
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(parse_statement("SELECT a FROM t WHERE").is_err());
        assert!(parse_statement("DELETE FROM t x y").is_err());
    }
}
