//! Stress helpers.
//!
//! These exercise a table from several threads at once: writers insert
//! disjoint key ranges while readers run indexed queries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tabula_core::{Query, Table, Where};
use tabula_value::Row;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration,
        }
    }

    /// Operations per second.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_ops as f64 / secs
        } else {
            0.0
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Writer threads.
    pub writers: usize,
    /// Rows inserted by each writer.
    pub rows_per_writer: usize,
    /// Reader threads.
    pub readers: usize,
    /// Queries run by each reader.
    pub queries_per_reader: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            writers: 4,
            rows_per_writer: 250,
            readers: 4,
            queries_per_reader: 100,
        }
    }
}

/// Inserts rows from several writers while readers query the `age` field.
///
/// Writer `w` inserts keys `w * rows_per_writer ..`, so no insert collides.
pub fn concurrent_insert_and_query(table: &Table, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for writer in 0..config.writers {
        let (table, ok, err) = (table.clone(), Arc::clone(&successful), Arc::clone(&failed));
        let rows = config.rows_per_writer;
        handles.push(thread::spawn(move || {
            for i in 0..rows {
                let key = (writer * rows + i) as i64;
                let row = Row::new().with("id", key).with("age", key % 50);
                match table.insert(row) {
                    Ok(_) => ok.fetch_add(1, Ordering::Relaxed),
                    Err(_) => err.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }
    for reader in 0..config.readers {
        let (table, ok, err) = (table.clone(), Arc::clone(&successful), Arc::clone(&failed));
        let queries = config.queries_per_reader;
        handles.push(thread::spawn(move || {
            for i in 0..queries {
                let age = ((reader + i) % 50) as i64;
                let query = Query::new().filter(Where::new().eq("age", age));
                match table.many(query) {
                    Ok(rows) if rows.iter().all(|r| r.get("age").as_integer() == Some(age)) => {
                        ok.fetch_add(1, Ordering::Relaxed)
                    }
                    _ => err.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Stress thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
