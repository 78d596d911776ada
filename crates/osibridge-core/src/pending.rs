//! Reentrant dispatch buffer
//!
//! A firing looks up a run of handler ids in the node map, but a handler may
//! subscribe new listeners mid-dispatch and mutate that map. Each firing
//! therefore copies its ids into a pooled buffer first and iterates the copy.
//!
//! The pool holds one buffer per nesting depth and only grows. A buffer at
//! depth `d` is never touched while a nested firing at `d + 1` is running,
//! so buffers are cleared and reused across firings without reallocating.

use crate::registry::HandlerId;

/// Handler ids each pre-allocated buffer holds before it reallocates
pub const LEVEL_CAPACITY: usize = 16;

/// Ticket for one in-flight firing.
///
/// Deliberately neither `Clone` nor `Copy`: it is handed back to
/// [`PendingCallbacks::exit`] exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a snapshot must be passed back to PendingCallbacks::exit"]
pub struct Snapshot {
    depth: usize,
}

impl Snapshot {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Depth-indexed pool of handler-id buffers
#[derive(Debug, Default)]
pub struct PendingCallbacks {
    cache: Vec<Vec<HandlerId>>,
    depth: usize,
}

impl PendingCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate `levels` buffers of [`LEVEL_CAPACITY`] ids each
    pub fn with_levels(levels: usize) -> Self {
        Self {
            cache: (0..levels)
                .map(|_| Vec::with_capacity(LEVEL_CAPACITY))
                .collect(),
            depth: 0,
        }
    }

    /// Copy `handlers` into the buffer for the current depth and descend
    pub fn enter(&mut self, handlers: &[HandlerId]) -> Snapshot {
        if self.depth >= self.cache.len() {
            self.cache.push(Vec::with_capacity(handlers.len()));
        }

        let entry = &mut self.cache[self.depth];
        entry.clear();
        entry.extend_from_slice(handlers);

        let snapshot = Snapshot { depth: self.depth };
        self.depth += 1;
        snapshot
    }

    /// The `index`-th handler captured by `snapshot`
    pub fn get(&self, snapshot: &Snapshot, index: usize) -> Option<HandlerId> {
        self.cache
            .get(snapshot.depth)
            .and_then(|entry| entry.get(index))
            .copied()
    }

    pub fn len(&self, snapshot: &Snapshot) -> usize {
        self.cache.get(snapshot.depth).map_or(0, Vec::len)
    }

    /// Release the innermost snapshot.
    ///
    /// # Panics
    ///
    /// When `snapshot` is not the most recently entered one. Out-of-order exits
    /// mean a buffer still being iterated could be reused.
    pub fn exit(&mut self, snapshot: Snapshot) {
        assert!(
            self.depth > 0 && snapshot.depth == self.depth - 1,
            "pending callback exit out of order: snapshot depth {}, current depth {}",
            snapshot.depth,
            self.depth
        );
        self.depth -= 1;
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of buffers the pool owns
    pub fn pooled_levels(&self) -> usize {
        self.cache.len()
    }
}
