use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

const READY: u64 = 0;
const CLEARING: u64 = u64::MAX;

#[derive(Debug, Default)]
pub struct OkBadCounter {
    pub ok: AtomicU64,
    pub bad: AtomicU64,
}

impl OkBadCounter {
    fn clear(&self) {
        self.ok.store(0, Ordering::Relaxed);
        self.bad.store(0, Ordering::Relaxed);
    }
}

/// One ring position. `stamp` is `READY`, `CLEARING`, or `time_index + 1`
/// for the index the counters currently belong to.
#[derive(Debug)]
struct Slot {
    stamp: AtomicU64,
    counters: Box<[OkBadCounter]>,
}

impl Slot {
    fn new(buckets: usize) -> Self {
        Self {
            stamp: AtomicU64::new(READY),
            counters: (0..buckets).map(|_| OkBadCounter::default()).collect(),
        }
    }

    fn clear(&self) {
        for counter in self.counters.iter() {
            counter.clear();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowSnapshot {
    pub ok: Vec<u64>,
    pub bad: Vec<u64>,
    /// Largest `ok + bad` across buckets, never below 1.
    pub max_combined: u64,
}

impl WindowSnapshot {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.ok
            .iter()
            .chain(self.bad.iter())
            .fold(0u64, |acc, value| acc.saturating_add(*value))
    }
}

/// Time-indexed ring of per-bucket counters covering a trailing window.
#[derive(Debug)]
pub struct MovingWindow {
    slots: Box<[Slot]>,
    buckets: usize,
    refresh: Duration,
    epoch: Instant,
}

impl MovingWindow {
    #[must_use]
    pub fn new(window: Duration, refresh: Duration, buckets: usize, epoch: Instant) -> Self {
        let refresh = refresh.max(Duration::from_millis(1));
        let count = window
            .as_nanos()
            .div_ceil(refresh.as_nanos())
            .max(1);
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let slots = (0..count).map(|_| Slot::new(buckets)).collect();
        Self {
            slots,
            buckets,
            refresh,
            epoch,
        }
    }

    #[must_use]
    pub const fn buckets(&self) -> usize {
        self.buckets
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn time_index(&self, now: Instant) -> u64 {
        let since = now.saturating_duration_since(self.epoch).as_nanos();
        let index = since.checked_div(self.refresh.as_nanos()).unwrap_or(0);
        u64::try_from(index).unwrap_or(u64::MAX / 2)
    }

    fn position(&self, index: u64) -> usize {
        let len = u64::try_from(self.slots.len()).unwrap_or(u64::MAX);
        usize::try_from(index.checked_rem(len).unwrap_or(0)).unwrap_or(0)
    }

    /// Counters for the slot owning `now`. The first writer of a new time
    /// index clears the stale contents; everyone else waits for that clear.
    pub fn slot_at(&self, now: Instant) -> &[OkBadCounter] {
        let index = self.time_index(now);
        let Some(slot) = self.slots.get(self.position(index)) else {
            return &[];
        };
        let wanted = index.saturating_add(1);
        loop {
            let current = slot.stamp.load(Ordering::Acquire);
            if current == wanted {
                return &slot.counters;
            }
            if current == CLEARING {
                std::hint::spin_loop();
                continue;
            }
            // A late writer from an older index lands in the newer slot.
            if current > wanted {
                return &slot.counters;
            }
            if slot
                .stamp
                .compare_exchange(current, CLEARING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                slot.clear();
                slot.stamp.store(wanted, Ordering::Release);
                return &slot.counters;
            }
        }
    }

    pub fn record(&self, now: Instant, bucket: usize, ok: bool) {
        if let Some(counter) = self.slot_at(now).get(bucket) {
            if ok {
                counter.ok.fetch_add(1, Ordering::Relaxed);
            } else {
                counter.bad.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn reset(&self) {
        for slot in self.slots.iter() {
            slot.clear();
            slot.stamp.store(READY, Ordering::Release);
        }
    }

    /// Per-bucket totals over the slots that fall inside the trailing window.
    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> WindowSnapshot {
        let current = self.time_index(now);
        let span = u64::try_from(self.slots.len()).unwrap_or(u64::MAX);
        let mut ok = vec![0u64; self.buckets];
        let mut bad = vec![0u64; self.buckets];

        for slot in self.slots.iter() {
            let stamp = slot.stamp.load(Ordering::Acquire);
            if stamp == READY || stamp == CLEARING {
                continue;
            }
            let index = stamp.saturating_sub(1);
            let in_window = index <= current && current.saturating_sub(index) < span;
            if !in_window {
                continue;
            }
            for ((ok_total, bad_total), counter) in
                ok.iter_mut().zip(bad.iter_mut()).zip(slot.counters.iter())
            {
                *ok_total = ok_total.saturating_add(counter.ok.load(Ordering::Relaxed));
                *bad_total = bad_total.saturating_add(counter.bad.load(Ordering::Relaxed));
            }
        }

        let max_combined = ok
            .iter()
            .zip(bad.iter())
            .map(|(ok, bad)| ok.saturating_add(*bad))
            .max()
            .unwrap_or(0)
            .max(1);

        WindowSnapshot {
            ok,
            bad,
            max_combined,
        }
    }
}
