//! Per-date critical sections for slot mutation.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

use chrono::NaiveDate;

/// Registry handing out one critical section per slot date.
///
/// Ranking recomputation reads and rewrites a slot's entire membership, so
/// every mutation of a slot happens while holding that date's section.
/// Operations spanning several slots request all their dates in a single
/// call; the registry grants them atomically, which rules out lock-order
/// deadlocks between compound operations.
#[derive(Debug, Default)]
pub struct SlotLocks {
    busy: Mutex<HashSet<NaiveDate>>,
    released: Condvar,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section for a single date.
    pub fn acquire(&self, date: NaiveDate) -> SlotGuard<'_> {
        self.acquire_all(vec![date])
    }

    /// Enter the critical sections for every given date at once.
    ///
    /// Blocks until all requested dates are free, then claims them in one
    /// step. Duplicates are collapsed.
    pub fn acquire_all(&self, mut dates: Vec<NaiveDate>) -> SlotGuard<'_> {
        dates.sort();
        dates.dedup();
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        while dates.iter().any(|date| busy.contains(date)) {
            busy = self
                .released
                .wait(busy)
                .unwrap_or_else(PoisonError::into_inner);
        }
        for date in &dates {
            busy.insert(*date);
        }
        SlotGuard { locks: self, dates }
    }
}

/// Critical sections held by one operation; released on drop.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    locks: &'a SlotLocks,
    dates: Vec<NaiveDate>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self
            .locks
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for date in &self.dates {
            busy.remove(date);
        }
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 3, day).unwrap()
    }

    #[test]
    fn test_reacquire_after_release() {
        let locks = SlotLocks::new();
        drop(locks.acquire(date(17)));
        drop(locks.acquire(date(17)));
    }

    #[test]
    fn test_duplicate_dates_collapse() {
        let locks = SlotLocks::new();
        let guard = locks.acquire_all(vec![date(17), date(17), date(14)]);
        drop(guard);
        drop(locks.acquire_all(vec![date(14), date(17)]));
    }

    #[test]
    fn test_held_date_blocks_second_acquirer() {
        let locks = Arc::new(SlotLocks::new());
        let guard = locks.acquire(date(17));

        let (tx, rx) = mpsc::channel();
        let contender = Arc::clone(&locks);
        let handle = thread::spawn(move || {
            let _guard = contender.acquire(date(17));
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(guard);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_disjoint_dates_do_not_block() {
        let locks = Arc::new(SlotLocks::new());
        let _guard = locks.acquire(date(17));

        let (tx, rx) = mpsc::channel();
        let contender = Arc::clone(&locks);
        let handle = thread::spawn(move || {
            let _guard = contender.acquire(date(18));
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }
}
