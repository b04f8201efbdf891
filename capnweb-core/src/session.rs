use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::trace;

use crate::dispatcher::RpcTarget;
use crate::ids::{ExportId, ExportIdAllocator};
use crate::message::PendingCall;
use crate::value::Value;

/// Per-session mutable state: export id counter, the pending-operation
/// and result tables, and the in-flight set used for cycle detection.
///
/// Owned exclusively by one session (spec §3). The three tables are
/// each a `DashMap`/`DashSet` so that individual lookups and edits are
/// atomic without a session-wide lock; `SessionEngine` is responsible
/// for calling `handle_message` for one message to completion before
/// starting the next (spec §5's "single message's effects are atomic"
/// guarantee), since a message's own edits may themselves span several
/// table operations with a dispatcher call in between.
pub struct SessionState {
    allocator: ExportIdAllocator,
    pending: DashMap<ExportId, PendingCall>,
    results: DashMap<ExportId, Value>,
    /// Export ids currently being drained by a resolver call on this
    /// session, used to detect self-reference (spec §4.3's cycle note).
    resolving: DashSet<ExportId>,
    target: Arc<dyn RpcTarget>,
    /// Release messages have no observable effect on the tables (spec's
    /// Non-goal on refcount enforcement); these counters exist purely so
    /// an operator can see that clients are sending them.
    release_count: AtomicU64,
    abort_count: AtomicU64,
}

impl SessionState {
    pub fn new(target: Arc<dyn RpcTarget>) -> Self {
        Self {
            allocator: ExportIdAllocator::new(),
            pending: DashMap::new(),
            results: DashMap::new(),
            resolving: DashSet::new(),
            target,
            release_count: AtomicU64::new(0),
            abort_count: AtomicU64::new(0),
        }
    }

    pub fn target(&self) -> &Arc<dyn RpcTarget> {
        &self.target
    }

    pub fn allocate_id(&self) -> ExportId {
        self.allocator.allocate()
    }

    /// Insert a freshly-pushed operation. Per invariant 1 an id is never
    /// inserted twice (the allocator only ever hands out fresh ids).
    pub fn register_pending(&self, id: ExportId, call: PendingCall) {
        self.pending.insert(id, call);
    }

    /// Remove and return a pending op, if any.
    pub fn take_pending(&self, id: ExportId) -> Option<PendingCall> {
        self.pending.remove(&id).map(|(_, call)| call)
    }

    /// Read-only peek at a completed result, without consuming it.
    pub fn peek_result(&self, id: ExportId) -> Option<Value> {
        self.results.get(&id).map(|entry| entry.value().clone())
    }

    /// Remove and return a completed result (invariant 4: a consumed
    /// pull leaves the id unknown).
    pub fn take_result(&self, id: ExportId) -> Option<Value> {
        self.results.remove(&id).map(|(_, value)| value)
    }

    pub fn store_result(&self, id: ExportId, value: Value) {
        self.results.insert(id, value);
    }

    pub fn has_pending(&self, id: ExportId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn has_result(&self, id: ExportId) -> bool {
        self.results.contains_key(&id)
    }

    /// Is `id` currently being drained by an in-progress resolver call?
    pub fn is_resolving(&self, id: ExportId) -> bool {
        self.resolving.contains(&id)
    }

    /// Mark `id` as currently being resolved. Returns `false` if it was
    /// already marked — the caller should report `CycleDetected`.
    pub fn begin_resolving(&self, id: ExportId) -> bool {
        self.resolving.insert(id)
    }

    pub fn end_resolving(&self, id: ExportId) {
        self.resolving.remove(&id);
        trace!(export_id = %id, "finished resolving");
    }

    pub fn record_release(&self) -> u64 {
        self.release_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_abort(&self) -> u64 {
        self.abort_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn release_count(&self) -> u64 {
        self.release_count.load(Ordering::Relaxed)
    }

    pub fn abort_count(&self) -> u64 {
        self.abort_count.load(Ordering::Relaxed)
    }
}
