//! Request identity for overlapping orchestration calls.
//!
//! Every new request takes a ticket; taking one supersedes all earlier
//! tickets. Work holding a superseded ticket stops before its next stage and
//! its result is dropped instead of published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestTicket {
    id: u64,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A newer request was issued while this one was running.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("request {request_id} was superseded by a newer request")]
pub struct Superseded {
    pub request_id: u64,
}

/// Hands out monotonically increasing tickets. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    latest: Arc<AtomicU64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> RequestTicket {
        RequestTicket {
            id: self.latest.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.id
    }

    /// `Err(Superseded)` unless `ticket` is still the latest.
    pub fn check(&self, ticket: RequestTicket) -> Result<(), Superseded> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(Superseded {
                request_id: ticket.id,
            })
        }
    }

    /// Abandon whatever is in flight without starting anything new.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Latest published value, tagged with the ticket that produced it.
#[derive(Debug)]
pub struct ResultSlot<T> {
    sequencer: RequestSequencer,
    value: Mutex<Option<(RequestTicket, T)>>,
}

impl<T: Clone> ResultSlot<T> {
    pub fn new(sequencer: RequestSequencer) -> Self {
        ResultSlot {
            sequencer,
            value: Mutex::new(None),
        }
    }

    /// Store `value` if `ticket` is still current and no newer ticket has
    /// published. Returns whether the value was stored.
    pub fn publish(&self, ticket: RequestTicket, value: T) -> bool {
        if !self.sequencer.is_current(ticket) {
            log::debug!("Dropping result of superseded request {}", ticket.id);
            return false;
        }
        let Ok(mut slot) = self.value.lock() else {
            return false;
        };
        // A newer ticket may have been issued while waiting for the lock.
        if !self.sequencer.is_current(ticket) {
            return false;
        }
        if matches!(slot.as_ref(), Some((held, _)) if held.id > ticket.id) {
            return false;
        }
        *slot = Some((ticket, value));
        true
    }

    pub fn latest(&self) -> Option<T> {
        self.value
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|(_, v)| v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let seq = RequestSequencer::new();
        let first = seq.next();
        assert!(seq.is_current(first));
        let second = seq.next();
        assert!(second > first);
        assert!(!seq.is_current(first));
        assert_eq!(seq.check(first), Err(Superseded { request_id: first.id() }));
        assert_eq!(seq.check(second), Ok(()));
    }

    #[test]
    fn clones_share_the_counter() {
        let seq = RequestSequencer::new();
        let ticket = seq.next();
        seq.clone().next();
        assert!(!seq.is_current(ticket));
    }

    #[test]
    fn invalidate_abandons_in_flight_request() {
        let seq = RequestSequencer::new();
        let ticket = seq.next();
        seq.invalidate();
        assert!(seq.check(ticket).is_err());
    }

    #[test]
    fn stale_publish_is_dropped() {
        let seq = RequestSequencer::new();
        let slot = ResultSlot::new(seq.clone());
        let old = seq.next();
        let new = seq.next();
        assert!(slot.publish(new, "new"));
        assert!(!slot.publish(old, "old"));
        assert_eq!(slot.latest(), Some("new"));
    }

    #[test]
    fn publish_after_invalidate_is_dropped() {
        let seq = RequestSequencer::new();
        let slot = Arc::new(ResultSlot::new(seq.clone()));
        let ticket = seq.next();
        let guard = slot.value.lock().unwrap();
        let publisher = std::thread::spawn({
            let slot = slot.clone();
            move || slot.publish(ticket, 1)
        });
        // The publisher either has not started or waits on the lock; the
        // ticket goes stale before it can store in both cases.
        seq.invalidate();
        drop(guard);
        assert!(!publisher.join().unwrap());
        assert_eq!(slot.latest(), None);
    }

    #[test]
    fn empty_slot_has_no_value() {
        let slot: ResultSlot<u32> = ResultSlot::new(RequestSequencer::new());
        assert_eq!(slot.latest(), None);
    }
}
