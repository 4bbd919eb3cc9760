pub mod rule;

pub use rule::{RuleRouter, ShardAlgorithm, ShardRule};

use std::fmt;

use crate::error::ProxyResult;

/// A literal shard-key value pinned by a predicate or an INSERT row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShardValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for ShardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardValue::Int(i) => write!(f, "{}", i),
            ShardValue::Str(s) => f.write_str(s),
        }
    }
}

/// What the statement's predicates say about the shard key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyHint {
    /// Nothing pinned: every shard of the table.
    All,
    /// Only the shards owning these values.
    Values(Vec<ShardValue>),
}

/// One physical shard of a logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub slice: String,
    pub db: String,
    pub table: String,
    /// Position of this shard in the table's shard list; co-located tables
    /// share indexes.
    pub index: usize,
}

/// The shard-routing rule table.
pub trait Router: Send + Sync {
    /// Shard key column of `db.table`, or `None` when the table is not sharded.
    fn shard_key(&self, db: &str, table: &str) -> Option<String>;

    /// Physical targets of `db.table` narrowed by `hint`, ordered by index
    /// and free of duplicates. A pinned value the rule cannot place is an
    /// `InvalidValue` error.
    fn route(&self, db: &str, table: &str, hint: &KeyHint) -> ProxyResult<Vec<RouteTarget>>;
}
