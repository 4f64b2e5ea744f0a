//! Table statistics.
//!
//! Counters are relaxed atomics; they can be read while operations are in
//! progress. Tests use them to check which access path a query took.
//!
//! ```rust,ignore
//! let stats = users.stats();
//! println!("full scans: {}", stats.full_scans);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-table operation counters.
#[derive(Debug, Default)]
pub struct TableStats {
    /// Rows inserted.
    inserts: AtomicU64,
    /// Rows updated.
    updates: AtomicU64,
    /// Rows removed.
    removes: AtomicU64,
    /// Queries executed.
    queries: AtomicU64,
    /// Scans served by the primary or a secondary index.
    index_scans: AtomicU64,
    /// Scans that visited every row.
    full_scans: AtomicU64,
    /// Candidate rows produced by scans.
    rows_scanned: AtomicU64,
    /// Live query notifications delivered.
    notifications: AtomicU64,
}

impl TableStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_inserts(&self, n: usize) {
        self.inserts.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_updates(&self, n: usize) {
        self.updates.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_removes(&self, n: usize) {
        self.removes.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_index_scan(&self) {
        self.index_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_full_scan(&self) {
        self.full_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rows_scanned(&self, n: usize) {
        self.rows_scanned.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of full scans so far.
    ///
    /// High counts may indicate missing indexes.
    pub fn full_scans(&self) -> u64 {
        self.full_scans.load(Ordering::Relaxed)
    }

    /// Returns the number of index scans so far.
    pub fn index_scans(&self) -> u64 {
        self.index_scans.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            index_scans: self.index_scans(),
            full_scans: self.full_scans(),
            rows_scanned: self.rows_scanned.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of table statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Rows inserted.
    pub inserts: u64,
    /// Rows updated.
    pub updates: u64,
    /// Rows removed.
    pub removes: u64,
    /// Queries executed.
    pub queries: u64,
    /// Index-served scans.
    pub index_scans: u64,
    /// Full table scans.
    pub full_scans: u64,
    /// Candidate rows produced by scans.
    pub rows_scanned: u64,
    /// Live query notifications delivered.
    pub notifications: u64,
}
