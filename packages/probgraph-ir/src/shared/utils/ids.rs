//! ID generation utilities
//!
//! Expression ids key the evaluators' cycle-detection working sets. They only
//! need to be unique per allocation, never stable across runs.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id of an expression allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u64);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = ExprId::fresh();
        let b = ExprId::fresh();
        assert_ne!(a, b);
    }
}
