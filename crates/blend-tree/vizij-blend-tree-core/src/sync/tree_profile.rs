//! Tree-wide sync profile: which event each active clip is heading towards and
//! how far it has progressed, as published during one tick.

use log::warn;

use crate::ids::EventId;

/// Default number of distinct events a profile accepts per tick.
pub const DEFAULT_MAX_SYNC_POINTS: usize = 32;

/// Insertion-ordered `(event, progress)` table, unique by event.
///
/// The first submission of an event in a cycle wins; later submissions of the
/// same event are ignored. Children publish before their parents, so the
/// innermost, earliest clip sets the pace for everybody else.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeSyncProfile {
    entries: Vec<(EventId, f32)>,
    max_entries: usize,
}

impl Default for TreeSyncProfile {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SYNC_POINTS)
    }
}

impl TreeSyncProfile {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_entries),
            max_entries,
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Records `progress` for `event` unless the event is already present.
    pub fn submit(&mut self, event: EventId, progress: f32) {
        if self.contains(event) {
            return;
        }
        if self.entries.len() >= self.max_entries {
            warn!(
                "tree sync profile full ({} entries); dropping event {:?}",
                self.max_entries, event
            );
            return;
        }
        self.entries.push((event, progress));
    }

    #[inline]
    pub fn contains(&self, event: EventId) -> bool {
        self.entries.iter().any(|(e, _)| *e == event)
    }

    pub fn progress_of(&self, event: EventId) -> Option<f32> {
        self.entries
            .iter()
            .find(|(e, _)| *e == event)
            .map(|(_, p)| *p)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (EventId, f32)> + '_ {
        self.entries.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
