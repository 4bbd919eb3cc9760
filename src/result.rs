use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Total order used when re-sorting merged rows: NULL first, numbers
    /// numerically, text lexicographically, numbers before text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::UInt(a), Value::UInt(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Table the column was read from, as reported by the backend.
    pub table: Option<String>,
}

impl Column {
    pub fn new(name: &str) -> Self {
        Column { name: name.to_string(), table: None }
    }

    pub fn from_table(name: &str, table: &str) -> Self {
        Column { name: name.to_string(), table: Some(table.to_string()) }
    }
}

/// Result of one statement: a row set for reads, counters for writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

impl ResultSet {
    pub fn with_rows(names: &[&str], rows: Vec<Vec<Value>>) -> Self {
        ResultSet {
            columns: names.iter().map(|n| Column::new(n)).collect(),
            rows,
            ..Default::default()
        }
    }

    pub fn affected(affected_rows: u64, last_insert_id: u64) -> Self {
        ResultSet { affected_rows, last_insert_id, ..Default::default() }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

pub fn format_row(row: &[Value]) -> String {
    row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" | ")
}

pub fn format_header(columns: &[Column]) -> String {
    columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_row_simple() {
        let row = vec![Value::Int(1), Value::Text("bob".into())];
        assert_eq!(format_row(&row), "1 | bob");
    }

    #[test]
    fn format_header_simple() {
        let rs = ResultSet::with_rows(&["id", "name"], vec![]);
        assert_eq!(format_header(&rs.columns), "id | name");
    }

    #[test]
    fn sort_cmp_orders_mixed_values() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int(1)), Ordering::Less);
        assert_eq!(Value::Int(2).sort_cmp(&Value::Float(1.5)), Ordering::Greater);
        assert_eq!(Value::Int(9).sort_cmp(&Value::Text("a".into())), Ordering::Less);
    }
}
