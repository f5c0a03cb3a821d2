//! Double-buffered triggered-event flags.
//!
//! Events triggered during tick N land in the write half and become readable
//! in tick N+1, after `swap()` (called from `Player::on_frame_start`). Readers
//! never see an event that was raised later in the same tick.

use crate::ids::EventId;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriggeredEvents {
    halves: [Vec<bool>; 2],
    read: usize,
}

impl TriggeredEvents {
    pub fn new(event_count: usize) -> Self {
        Self {
            halves: [vec![false; event_count], vec![false; event_count]],
            read: 0,
        }
    }

    /// Re-provisions both halves for a new event table, clearing all flags.
    pub fn resize(&mut self, event_count: usize) {
        *self = Self::new(event_count);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.halves[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn write(&self) -> usize {
        1 - self.read
    }

    /// Publishes last tick's writes and clears the half that receives this
    /// tick's writes.
    pub fn swap(&mut self) {
        self.read = self.write();
        let write = self.write();
        self.halves[write].fill(false);
    }

    /// Marks `event` in the write half. Returns `false` for an unknown index.
    pub fn trigger(&mut self, event: EventId) -> bool {
        debug_assert!(event.index() < self.len(), "event {event:?} out of range");
        let write = self.write();
        match self.halves[write].get_mut(event.index()) {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    /// Reads the read half; `false` for an unknown index.
    pub fn was_triggered(&self, event: EventId) -> bool {
        debug_assert!(event.index() < self.len(), "event {event:?} out of range");
        self.halves[self.read]
            .get(event.index())
            .copied()
            .unwrap_or(false)
    }

    /// Clears both halves.
    pub fn clear(&mut self) {
        for half in &mut self.halves {
            half.fill(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_is_visible_for_exactly_one_tick() {
        let mut events = TriggeredEvents::new(2);
        events.trigger(EventId(1));
        assert!(!events.was_triggered(EventId(1)));
        events.swap();
        assert!(events.was_triggered(EventId(1)));
        assert!(!events.was_triggered(EventId(0)));
        events.swap();
        assert!(!events.was_triggered(EventId(1)));
    }

    #[test]
    fn resize_clears_flags() {
        let mut events = TriggeredEvents::new(1);
        events.trigger(EventId(0));
        events.swap();
        events.resize(3);
        assert_eq!(events.len(), 3);
        assert!(!events.was_triggered(EventId(0)));
    }
}
