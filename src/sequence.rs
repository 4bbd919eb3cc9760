use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ProxyError, ProxyResult};

/// Source of globally unique values for shard keys that an INSERT leaves out.
pub trait SequenceManager: Send + Sync {
    /// Next value for `scope`, which the planner forms as `db.table`.
    fn next(&self, scope: &str) -> ProxyResult<i64>;
}

pub fn sequence_scope(db: &str, table: &str) -> String {
    format!("{}.{}", db, table)
}

#[derive(Debug, Clone, Copy)]
struct SequenceState {
    next: i64,
    increment: i64,
}

/// In-process sequence registry. Scopes must be registered with `create`
/// unless the manager was built with `auto_create`.
#[derive(Debug)]
pub struct MemorySequence {
    sequences: Mutex<HashMap<String, SequenceState>>,
    auto_create: Option<(i64, i64)>,
}

impl Default for MemorySequence {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySequence {
    pub fn new() -> Self {
        MemorySequence { sequences: Mutex::new(HashMap::new()), auto_create: None }
    }

    /// Unknown scopes start at `start` and step by `increment`.
    pub fn auto_create(start: i64, increment: i64) -> Self {
        MemorySequence {
            sequences: Mutex::new(HashMap::new()),
            auto_create: Some((start, increment)),
        }
    }

    pub fn create(&self, scope: &str, start: i64, increment: i64) -> ProxyResult<()> {
        if increment == 0 {
            return Err(ProxyError::Sequence(format!("sequence '{}' has zero increment", scope)));
        }
        let mut sequences = self.lock()?;
        if sequences.contains_key(scope) {
            return Err(ProxyError::Sequence(format!("sequence '{}' already exists", scope)));
        }
        sequences.insert(scope.to_string(), SequenceState { next: start, increment });
        Ok(())
    }

    fn lock(&self) -> ProxyResult<std::sync::MutexGuard<'_, HashMap<String, SequenceState>>> {
        self.sequences
            .lock()
            .map_err(|_| ProxyError::Sequence("sequence registry poisoned".into()))
    }
}

impl SequenceManager for MemorySequence {
    fn next(&self, scope: &str) -> ProxyResult<i64> {
        let mut sequences = self.lock()?;
        if !sequences.contains_key(scope) {
            if let Some((start, increment)) = self.auto_create {
                sequences.insert(scope.to_string(), SequenceState { next: start, increment });
            }
        }
        let state = sequences
            .get_mut(scope)
            .ok_or_else(|| ProxyError::Sequence(format!("sequence '{}' not found", scope)))?;
        let value = state.next;
        state.next = value
            .checked_add(state.increment)
            .ok_or_else(|| ProxyError::Sequence(format!("sequence '{}' exhausted", scope)))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sequence_and_next_values() {
        let seq = MemorySequence::new();
        seq.create("shop.orders", 100, 5).unwrap();
        assert_eq!(seq.next("shop.orders").unwrap(), 100);
        assert_eq!(seq.next("shop.orders").unwrap(), 105);
    }

    #[test]
    fn unknown_sequence_is_an_error() {
        let seq = MemorySequence::new();
        assert!(matches!(seq.next("shop.orders"), Err(ProxyError::Sequence(_))));
    }

    #[test]
    fn auto_created_scopes_are_independent() {
        let seq = MemorySequence::auto_create(1, 1);
        assert_eq!(seq.next("a.t").unwrap(), 1);
        assert_eq!(seq.next("a.t").unwrap(), 2);
        assert_eq!(seq.next("b.t").unwrap(), 1);
    }

    #[test]
    fn duplicate_create_rejected() {
        let seq = MemorySequence::new();
        seq.create("a.t", 1, 1).unwrap();
        assert!(seq.create("a.t", 1, 1).is_err());
    }
}
