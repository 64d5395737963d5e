// History storage and operations

use crate::history::error::{HistoryError, Result};
use crate::history::types::{ExecutionResult, HistoryPage, Pagination};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Default number of entries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page size a listing may request
pub const MAX_PAGE_SIZE: usize = 100;

/// Bounded, newest-first execution log plus the execution id counter.
///
/// Constructed once by the daemon and shared behind an `Arc`. The lock is
/// only held for short, synchronous sections and never across an `.await`.
#[derive(Debug)]
pub struct HistoryStore {
    entries: Mutex<VecDeque<ExecutionResult>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ExecutionResult>> {
        // Entries are replaced whole, so a poisoned lock still holds a
        // consistent list
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserve the next execution id
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Insert at the head, evicting the oldest entry past capacity
    pub fn append(&self, result: ExecutionResult) {
        let mut entries = self.lock();
        entries.push_front(result);
        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_back() {
                debug!(id = evicted.id, "history at capacity, evicted oldest entry");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Page through history, newest first.
    ///
    /// `page` is clamped to at least 1 and `page_size` to `1..=100`. When
    /// `user` is given only entries recorded for exactly that user count.
    pub fn list(&self, page: usize, page_size: usize, user: Option<&str>) -> HistoryPage {
        let page = page.max(1);
        let limit = page_size.clamp(1, MAX_PAGE_SIZE);

        let entries = self.lock();
        let filtered: Vec<&ExecutionResult> = entries
            .iter()
            .filter(|e| user.is_none_or(|u| e.user == u))
            .collect();

        let total_commands = filtered.len();
        let total_pages = total_commands.div_ceil(limit);
        let start = (page - 1).saturating_mul(limit);

        let commands = filtered
            .into_iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect();

        HistoryPage {
            commands,
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_commands,
                has_next_page: page < total_pages,
                has_prev_page: page > 1,
                limit,
            },
        }
    }

    pub fn get(&self, id: u64) -> Result<ExecutionResult> {
        self.lock()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(HistoryError::NotFound(id))
    }

    /// Remove an entry and return it
    pub fn delete(&self, id: u64) -> Result<ExecutionResult> {
        let mut entries = self.lock();
        let pos = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(HistoryError::NotFound(id))?;
        entries.remove(pos).ok_or(HistoryError::NotFound(id))
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
