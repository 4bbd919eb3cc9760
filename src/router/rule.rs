use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::config::DEFAULT_SLICE;
use crate::error::{ProxyError, ProxyResult};
use crate::router::{KeyHint, RouteTarget, Router, ShardValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardAlgorithm {
    /// Integer key modulo the table count.
    Mod,
    /// FNV-1a of the key's text modulo the table count.
    Hash,
}

/// Sharding rule for one logical table. Shard `i` is the physical table
/// `<table>_<i>`; shards are spread over the slices in contiguous runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardRule {
    pub db: String,
    pub table: String,
    pub key: String,
    pub algorithm: ShardAlgorithm,
    pub table_count: usize,
    pub slices: Vec<String>,
    /// Physical database per shard; empty means the logical database.
    pub databases: Vec<String>,
}

impl ShardRule {
    pub fn new(db: &str, table: &str, key: &str, table_count: usize) -> Self {
        ShardRule {
            db: db.to_string(),
            table: table.to_string(),
            key: key.to_string(),
            algorithm: ShardAlgorithm::Mod,
            table_count,
            slices: vec![DEFAULT_SLICE.to_string()],
            databases: Vec::new(),
        }
    }

    pub fn hashed(mut self) -> Self {
        self.algorithm = ShardAlgorithm::Hash;
        self
    }

    pub fn slices(mut self, slices: &[&str]) -> Self {
        self.slices = slices.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn databases(mut self, databases: &[&str]) -> Self {
        self.databases = databases.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Parse `table:key:count:slice[,slice...]` with an optional `:hash`
    /// suffix, e.g. `orders:id:8:slice-0,slice-1`.
    pub fn parse(db: &str, spec: &str) -> ProxyResult<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.len() < 4 || parts.len() > 5 {
            return Err(ProxyError::Route(format!(
                "invalid rule '{}', expected table:key:count:slice[,slice...][:hash]",
                spec
            )));
        }
        let count = parts[2]
            .parse::<usize>()
            .map_err(|_| ProxyError::Route(format!("invalid table count '{}'", parts[2])))?;
        let slices: Vec<&str> = parts[3].split(',').filter(|s| !s.is_empty()).collect();
        let rule = ShardRule::new(db, parts[0], parts[1], count).slices(&slices);
        match parts.get(4) {
            None => Ok(rule),
            Some(alg) if alg.eq_ignore_ascii_case("hash") => Ok(rule.hashed()),
            Some(alg) if alg.eq_ignore_ascii_case("mod") => Ok(rule),
            Some(alg) => Err(ProxyError::Route(format!("unknown shard algorithm '{}'", alg))),
        }
    }

    fn validate(&self) -> ProxyResult<()> {
        if self.table_count == 0 {
            return Err(ProxyError::Route(format!("rule for '{}' has no shards", self.table)));
        }
        if self.slices.is_empty() {
            return Err(ProxyError::Route(format!("rule for '{}' has no slices", self.table)));
        }
        if !self.databases.is_empty() && self.databases.len() != self.table_count {
            return Err(ProxyError::Route(format!(
                "rule for '{}' lists {} databases for {} shards",
                self.table,
                self.databases.len(),
                self.table_count
            )));
        }
        Ok(())
    }

    fn index_of(&self, value: &ShardValue) -> ProxyResult<usize> {
        let n = self.table_count as u64;
        match (self.algorithm, value) {
            (ShardAlgorithm::Mod, ShardValue::Int(i)) => Ok(i.rem_euclid(n as i64) as usize),
            (ShardAlgorithm::Mod, ShardValue::Str(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(i.rem_euclid(n as i64) as usize),
                Err(_) => Err(ProxyError::InvalidValue(format!(
                    "mod rule on '{}.{}' needs an integer key, got '{}'",
                    self.db, self.table, s
                ))),
            },
            (ShardAlgorithm::Hash, v) => Ok((fnv1a(v.to_string().as_bytes()) % n) as usize),
        }
    }

    fn target(&self, index: usize, logical_db: &str) -> RouteTarget {
        let slice_pos = index * self.slices.len() / self.table_count;
        let db = match self.databases.get(index) {
            Some(db) => db.clone(),
            None => logical_db.to_string(),
        };
        RouteTarget {
            slice: self.slices[slice_pos].clone(),
            db,
            table: format!("{}_{}", self.table, index),
            index,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// In-memory rule table keyed by (db, table), case-insensitive.
#[derive(Debug, Default)]
pub struct RuleRouter {
    rules: HashMap<(String, String), ShardRule>,
}

impl RuleRouter {
    pub fn new() -> Self {
        RuleRouter { rules: HashMap::new() }
    }

    pub fn add_rule(&mut self, rule: ShardRule) -> ProxyResult<()> {
        rule.validate()?;
        let key = (rule.db.to_ascii_lowercase(), rule.table.to_ascii_lowercase());
        if self.rules.contains_key(&key) {
            return Err(ProxyError::Route(format!(
                "duplicate rule for '{}.{}'",
                rule.db, rule.table
            )));
        }
        self.rules.insert(key, rule);
        Ok(())
    }

    pub fn with_rule(mut self, rule: ShardRule) -> ProxyResult<Self> {
        self.add_rule(rule)?;
        Ok(self)
    }

    fn rule(&self, db: &str, table: &str) -> Option<&ShardRule> {
        self.rules.get(&(db.to_ascii_lowercase(), table.to_ascii_lowercase()))
    }
}

impl Router for RuleRouter {
    fn shard_key(&self, db: &str, table: &str) -> Option<String> {
        self.rule(db, table).map(|r| r.key.clone())
    }

    fn route(&self, db: &str, table: &str, hint: &KeyHint) -> ProxyResult<Vec<RouteTarget>> {
        let rule = self
            .rule(db, table)
            .ok_or_else(|| ProxyError::Route(format!("no shard rule for '{}.{}'", db, table)))?;
        let indexes: BTreeSet<usize> = match hint {
            KeyHint::All => (0..rule.table_count).collect(),
            KeyHint::Values(values) => {
                values.iter().map(|v| rule.index_of(v)).collect::<ProxyResult<_>>()?
            }
        };
        debug!("route {}.{} {:?} -> shards {:?}", db, table, hint, indexes);
        Ok(indexes.into_iter().map(|i| rule.target(i, db)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> RuleRouter {
        RuleRouter::new()
            .with_rule(ShardRule::new("shop", "orders", "id", 4).slices(&["s0", "s1"]))
            .unwrap()
    }

    #[test]
    fn shards_spread_over_slices() {
        let targets = router().route("shop", "orders", &KeyHint::All).unwrap();
        let slices: Vec<&str> = targets.iter().map(|t| t.slice.as_str()).collect();
        assert_eq!(slices, vec!["s0", "s0", "s1", "s1"]);
        assert_eq!(targets[3].table, "orders_3");
        assert_eq!(targets[3].db, "shop");
    }

    #[test]
    fn values_dedup_to_one_shard() {
        let hint = KeyHint::Values(vec![ShardValue::Int(1), ShardValue::Int(5), ShardValue::Str("9".into())]);
        let targets = router().route("shop", "orders", &hint).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].index, 1);
    }

    #[test]
    fn negative_keys_wrap() {
        let hint = KeyHint::Values(vec![ShardValue::Int(-1)]);
        let targets = router().route("shop", "orders", &hint).unwrap();
        assert_eq!(targets[0].index, 3);
    }

    #[test]
    fn mod_rule_rejects_text_key() {
        for key in ["abc", "1.5"] {
            let hint = KeyHint::Values(vec![ShardValue::Str(key.into())]);
            assert!(matches!(
                router().route("shop", "orders", &hint),
                Err(ProxyError::InvalidValue(_))
            ));
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(router().shard_key("SHOP", "Orders").as_deref(), Some("id"));
        assert_eq!(router().shard_key("shop", "users"), None);
    }

    #[test]
    fn parse_rule_spec() {
        let rule = ShardRule::parse("shop", "users:uid:2:a,b:hash").unwrap();
        assert_eq!(rule.algorithm, ShardAlgorithm::Hash);
        assert_eq!(rule.slices, vec!["a".to_string(), "b".to_string()]);
        assert!(ShardRule::parse("shop", "users:uid").is_err());
    }

    #[test]
    fn database_count_must_match() {
        let rule = ShardRule::new("shop", "t", "id", 2).databases(&["db_0"]);
        assert!(RuleRouter::new().add_rule(rule).is_err());
    }
}
