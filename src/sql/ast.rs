// src/sql/ast.rs
use crate::sql::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    /// Decimal, float or out-of-range integer, kept as written.
    Number(String),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnName {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnName {
    pub fn new(name: &str) -> Self {
        ColumnName { table: None, name: name.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NullSafeEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NullSafeEq => "<=>",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnName),
    Literal(Literal),
    Placeholder,
    /// `@user_var` or `@@system_var`, name includes the sigils.
    Variable(String),
    /// `DEFAULT` in an INSERT row.
    Default,
    /// `*` inside `COUNT(*)`.
    Wildcard,
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { left: Box<Expr>, op: BinaryOp, right: Box<Expr> },
    InList { expr: Box<Expr>, list: Vec<Expr>, negated: bool },
    Between { expr: Box<Expr>, low: Box<Expr>, high: Box<Expr>, negated: bool },
    IsNull { expr: Box<Expr>, negated: bool },
    Like { expr: Box<Expr>, pattern: Box<Expr>, negated: bool },
    Function { name: String, args: Vec<Expr>, distinct: bool },
    Nested(Box<Expr>),
}

impl Expr {
    /// Visit every column reference, depth first.
    pub fn visit_columns_mut(&mut self, f: &mut dyn FnMut(&mut ColumnName)) {
        match self {
            Expr::Column(c) => f(c),
            Expr::Literal(_)
            | Expr::Placeholder
            | Expr::Variable(_)
            | Expr::Default
            | Expr::Wildcard => {}
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Nested(expr) => {
                expr.visit_columns_mut(f)
            }
            Expr::Binary { left, right, .. } => {
                left.visit_columns_mut(f);
                right.visit_columns_mut(f);
            }
            Expr::InList { expr, list, .. } => {
                expr.visit_columns_mut(f);
                for e in list {
                    e.visit_columns_mut(f);
                }
            }
            Expr::Between { expr, low, high, .. } => {
                expr.visit_columns_mut(f);
                low.visit_columns_mut(f);
                high.visit_columns_mut(f);
            }
            Expr::Like { expr, pattern, .. } => {
                expr.visit_columns_mut(f);
                pattern.visit_columns_mut(f);
            }
            Expr::Function { args, .. } => {
                for a in args {
                    a.visit_columns_mut(f);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableFactor {
    pub table: TableName,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableFactor,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    QualifiedWildcard(String),
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: Option<u64>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Vec<TableFactor>,
    pub joins: Vec<Join>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Limit>,
    pub for_update: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnName,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub replace: bool,
    pub ignore: bool,
    pub table: TableName,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expr>>,
    pub on_duplicate: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableFactor,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Expr>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableName,
    pub selection: Option<Expr>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<Select>),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Explain(Box<Statement>),
    /// Any statement the planner passes through untouched (SHOW, SET, DDL, ...).
    Other(Vec<Token>),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Insert(i) if i.replace => "replace",
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
            Statement::Explain(_) => "explain",
            Statement::Other(_) => "other",
        }
    }
}
