use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// A session-local, positive, monotonically-allocated identifier naming
/// a deferred or completed computation.
///
/// Two sessions may reuse the same numeric value to mean different
/// things; an `ExportId` is only meaningful paired with the session
/// that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ExportId(pub i64);

impl ExportId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ExportId {
    fn from(value: i64) -> Self {
        ExportId(value)
    }
}

/// Allocates export ids 1, 2, 3, ... in push order, per session.
#[derive(Debug)]
pub struct ExportIdAllocator {
    next: AtomicI64,
}

impl ExportIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
        }
    }

    /// Allocate the next id and advance the counter.
    pub fn allocate(&self) -> ExportId {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        ExportId(id)
    }

    /// The id that would be returned by the next `allocate()` call.
    pub fn peek_next(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for ExportIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_monotonically_from_one() {
        let alloc = ExportIdAllocator::new();
        assert_eq!(alloc.allocate(), ExportId(1));
        assert_eq!(alloc.allocate(), ExportId(2));
        assert_eq!(alloc.allocate(), ExportId(3));
        assert_eq!(alloc.peek_next(), 4);
    }

    #[test]
    fn display_matches_inner_value() {
        assert_eq!(format!("{}", ExportId(42)), "42");
    }

    #[test]
    fn concurrent_allocation_never_duplicates() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let alloc = Arc::new(ExportIdAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let alloc = Arc::clone(&alloc);
            handles.push(thread::spawn(move || {
                (0..200).map(|_| alloc.allocate().0).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate export id {id}");
            }
        }
        assert_eq!(seen.len(), 8 * 200);
    }
}
