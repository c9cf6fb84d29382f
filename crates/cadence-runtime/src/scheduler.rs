//! Scheduled-callback queue.
//!
//! Callback records live in an arena and are addressed by generation-checked
//! [`CallbackId`]s. The due-time ordering is a separate `BTreeSet`, so a
//! record can leave and re-enter the queue (pause, cancel, reschedule)
//! without invalidating its id.

use crate::events::Callback;
use cadence_core::{CadenceError, Result, TimeSpan};
use std::collections::BTreeSet;

/// Stable reference to a callback record within one scene's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId {
    index: u32,
    generation: u32,
}

struct Record {
    generation: u32,
    /// Taken out while the callback runs
    callback: Option<Box<dyn Callback>>,
    wait: TimeSpan,
    due: TimeSpan,
    seq: u64,
    queued: bool,
    /// Time left when paused; consumed by the next reschedule
    remaining: Option<TimeSpan>,
}

enum Slot {
    Occupied(Record),
    Free { generation: u32 },
}

/// Min-ordered queue of callbacks keyed by scene-time due stamp.
///
/// Ties on the due stamp fire in scheduling order.
#[derive(Default)]
pub struct CallbackQueue {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: BTreeSet<(TimeSpan, u64, u32)>,
    next_seq: u64,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `callback` to fire once `wait` has passed from `now`.
    pub fn schedule(&mut self, callback: Box<dyn Callback>, wait: TimeSpan, now: TimeSpan) -> CallbackId {
        let record = Record {
            generation: 0,
            callback: Some(callback),
            wait,
            due: TimeSpan::ZERO,
            seq: 0,
            queued: false,
            remaining: None,
        };

        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let generation = match slot {
                    Slot::Free { generation } => *generation,
                    Slot::Occupied(r) => r.generation,
                };
                *slot = Slot::Occupied(Record {
                    generation,
                    ..record
                });
                index
            }
            None => {
                self.slots.push(Slot::Occupied(record));
                (self.slots.len() - 1) as u32
            }
        };

        let generation = self.record(index).map(|r| r.generation).unwrap_or(0);
        let id = CallbackId { index, generation };
        self.enqueue(index, wait, now);
        id
    }

    /// Queue a callback that already fired or was cancelled/paused. Uses the
    /// time left at pause if there is one, the scheduled wait otherwise.
    pub fn reschedule(&mut self, id: CallbackId, now: TimeSpan) -> Result<()> {
        let record = self.get_mut(id)?;
        if record.queued {
            return Err(CadenceError::InvalidState(
                "callback is still queued; cancel or pause it before rescheduling".into(),
            ));
        }
        let wait = record.remaining.take().unwrap_or(record.wait);
        self.enqueue(id.index, wait, now);
        Ok(())
    }

    /// Remove from the queue if queued. Any time captured by a pause is kept.
    pub fn cancel(&mut self, id: CallbackId) -> Result<()> {
        let record = self.get_mut(id)?;
        if record.queued {
            record.queued = false;
            let key = (record.due, record.seq, id.index);
            self.order.remove(&key);
        }
        Ok(())
    }

    /// Capture the time left and take the callback out of the queue.
    ///
    /// When not queued, the capture still records how long would have been
    /// left had it kept running.
    pub fn pause(&mut self, id: CallbackId, now: TimeSpan) -> Result<()> {
        let record = self.get_mut(id)?;
        record.remaining = Some(record.due - now);
        self.cancel(id)
    }

    /// Requeue a paused callback with the time it had left. No-op if it was
    /// never paused.
    pub fn unpause(&mut self, id: CallbackId, now: TimeSpan) -> Result<()> {
        let record = self.get_mut(id)?;
        if record.remaining.is_none() || record.queued {
            return Ok(());
        }
        self.reschedule(id, now)
    }

    /// Drop the record and free its slot. Its id becomes stale.
    pub fn release(&mut self, id: CallbackId) -> Result<()> {
        self.cancel(id)?;
        let slot = &mut self.slots[id.index as usize];
        *slot = Slot::Free {
            generation: id.generation.wrapping_add(1),
        };
        self.free.push(id.index);
        Ok(())
    }

    pub fn is_queued(&self, id: CallbackId) -> Result<bool> {
        self.get(id).map(|r| r.queued)
    }

    /// Due stamp of a queued callback.
    pub fn due(&self, id: CallbackId) -> Result<Option<TimeSpan>> {
        self.get(id).map(|r| r.queued.then_some(r.due))
    }

    /// Number of queued callbacks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sequence stamp separating callbacks queued so far from ones queued
    /// later. Passed to [`pop_due`](Self::pop_due) so that a callback
    /// scheduled while firing waits for the next tick.
    pub fn watermark(&self) -> u64 {
        self.next_seq
    }

    /// Dequeue the earliest callback with `due <= now` queued before
    /// `watermark`, taking its callback out of the record. The caller runs it
    /// and hands it back with [`restore`](Self::restore).
    pub fn pop_due(&mut self, now: TimeSpan, watermark: u64) -> Option<(CallbackId, Box<dyn Callback>)> {
        let candidate = self
            .order
            .iter()
            .take_while(|(due, _, _)| *due <= now)
            .find(|(_, seq, _)| *seq < watermark)
            .copied()?;
        self.order.remove(&candidate);

        let (_, _, index) = candidate;
        let Slot::Occupied(record) = &mut self.slots[index as usize] else {
            return None;
        };
        record.queued = false;
        let id = CallbackId {
            index,
            generation: record.generation,
        };
        record.callback.take().map(|cb| (id, cb))
    }

    /// Put a fired callback back into its record so it can be rescheduled.
    /// Dropped if the record was released while the callback ran.
    pub fn restore(&mut self, id: CallbackId, callback: Box<dyn Callback>) {
        if let Ok(record) = self.get_mut(id) {
            record.callback = Some(callback);
        }
    }

    fn enqueue(&mut self, index: u32, wait: TimeSpan, now: TimeSpan) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Slot::Occupied(record) = &mut self.slots[index as usize] {
            record.due = now + wait;
            record.seq = seq;
            record.queued = true;
            self.order.insert((record.due, seq, index));
        }
    }

    fn record(&self, index: u32) -> Option<&Record> {
        match self.slots.get(index as usize) {
            Some(Slot::Occupied(r)) => Some(r),
            _ => None,
        }
    }

    fn get(&self, id: CallbackId) -> Result<&Record> {
        match self.slots.get(id.index as usize) {
            Some(Slot::Occupied(r)) if r.generation == id.generation => Ok(r),
            _ => Err(CadenceError::CallbackNotFound),
        }
    }

    fn get_mut(&mut self, id: CallbackId) -> Result<&mut Record> {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot::Occupied(r)) if r.generation == id.generation => Ok(r),
            _ => Err(CadenceError::CallbackNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ms(n: i64) -> TimeSpan {
        TimeSpan::from_millis(n)
    }

    fn tagged(log: &Arc<parking_lot::Mutex<Vec<&'static str>>>, tag: &'static str) -> Box<dyn Callback> {
        let log = log.clone();
        Box::new(move || -> Result<()> {
            log.lock().push(tag);
            Ok(())
        })
    }

    /// Fire everything due at `now`, like one worker tick.
    fn fire(queue: &mut CallbackQueue, now: TimeSpan) -> usize {
        let watermark = queue.watermark();
        let mut fired = 0;
        while let Some((id, mut cb)) = queue.pop_due(now, watermark) {
            cb.call().unwrap();
            queue.restore(id, cb);
            fired += 1;
        }
        fired
    }

    #[test]
    fn test_fires_at_due_not_before() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = CallbackQueue::new();
        queue.schedule(tagged(&log, "a"), ms(100), ms(50));

        assert_eq!(fire(&mut queue, ms(149)), 0);
        assert_eq!(fire(&mut queue, ms(150)), 1);
        assert_eq!(fire(&mut queue, ms(500)), 0);
        assert_eq!(*log.lock(), vec!["a"]);
    }

    #[test]
    fn test_fires_in_due_order() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = CallbackQueue::new();
        queue.schedule(tagged(&log, "late"), ms(30), TimeSpan::ZERO);
        queue.schedule(tagged(&log, "early"), ms(10), TimeSpan::ZERO);
        queue.schedule(tagged(&log, "tie"), ms(10), TimeSpan::ZERO);

        fire(&mut queue, ms(100));
        assert_eq!(*log.lock(), vec!["early", "tie", "late"]);
    }

    #[test]
    fn test_reschedule_queued_is_error() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = CallbackQueue::new();
        let id = queue.schedule(tagged(&log, "a"), ms(10), TimeSpan::ZERO);

        let err = queue.reschedule(id, ms(5)).unwrap_err();
        assert!(matches!(err, CadenceError::InvalidState(_)));

        fire(&mut queue, ms(10));
        queue.reschedule(id, ms(10)).unwrap();
        assert_eq!(queue.due(id).unwrap(), Some(ms(20)));
    }

    #[test]
    fn test_cancel_then_reschedule_uses_wait() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = CallbackQueue::new();
        let id = queue.schedule(tagged(&log, "a"), ms(40), TimeSpan::ZERO);

        queue.cancel(id).unwrap();
        assert!(!queue.is_queued(id).unwrap());
        assert_eq!(fire(&mut queue, ms(100)), 0);

        queue.reschedule(id, ms(100)).unwrap();
        assert_eq!(queue.due(id).unwrap(), Some(ms(140)));
    }

    #[test]
    fn test_pause_captures_remaining() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = CallbackQueue::new();
        let id = queue.schedule(tagged(&log, "a"), ms(100), TimeSpan::ZERO);

        queue.pause(id, ms(30)).unwrap();
        assert_eq!(fire(&mut queue, ms(1_000)), 0);

        queue.unpause(id, ms(1_000)).unwrap();
        assert_eq!(queue.due(id).unwrap(), Some(ms(1_070)));
        assert_eq!(fire(&mut queue, ms(1_069)), 0);
        assert_eq!(fire(&mut queue, ms(1_070)), 1);
    }

    #[test]
    fn test_paused_never_fires() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut queue = CallbackQueue::new();
        let counter = hits.clone();
        let id = queue.schedule(
            Box::new(move || -> Result<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            ms(10),
            TimeSpan::ZERO,
        );
        queue.pause(id, ms(5)).unwrap();

        for t in 0..100 {
            fire(&mut queue, ms(t * 10));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unpause_without_pause_is_noop() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = CallbackQueue::new();
        let id = queue.schedule(tagged(&log, "a"), ms(10), TimeSpan::ZERO);
        fire(&mut queue, ms(10));

        queue.unpause(id, ms(20)).unwrap();
        assert!(!queue.is_queued(id).unwrap());
    }

    #[test]
    fn test_scheduled_while_firing_waits_for_next_pass() {
        let mut queue = CallbackQueue::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        queue.schedule(tagged(&log, "first"), TimeSpan::ZERO, TimeSpan::ZERO);

        let watermark = queue.watermark();
        let (id, mut cb) = queue.pop_due(TimeSpan::ZERO, watermark).unwrap();
        cb.call().unwrap();
        queue.restore(id, cb);
        queue.schedule(tagged(&log, "second"), TimeSpan::ZERO, TimeSpan::ZERO);
        assert!(queue.pop_due(TimeSpan::ZERO, watermark).is_none());

        assert_eq!(fire(&mut queue, TimeSpan::ZERO), 1);
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_release_invalidates_id() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = CallbackQueue::new();
        let old = queue.schedule(tagged(&log, "a"), ms(10), TimeSpan::ZERO);
        queue.release(old).unwrap();
        assert!(queue.is_empty());

        let new = queue.schedule(tagged(&log, "b"), ms(10), TimeSpan::ZERO);
        assert_ne!(old, new);
        assert!(matches!(queue.cancel(old), Err(CadenceError::CallbackNotFound)));
        assert!(queue.is_queued(new).unwrap());
    }
}
