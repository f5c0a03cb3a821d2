//! Per-node sync profile: time remaining until each shared sync point, merged
//! bottom-up through the blend tree, and the playback speeds that make every
//! contributor arrive at the same moment.

use crate::ids::{EventId, NodeId};

/// Slot a sync point is stored under. Slots are the global index of the event
/// in the tree's event table, so siblings with partially overlapping event sets
/// still line up on the events they share.
pub type SyncSlot = usize;

#[inline]
pub fn slot_of(event: EventId) -> SyncSlot {
    event.index()
}

/// Weighted sums for one slot. `time` holds the committed value.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SlotEntry {
    slot: SyncSlot,
    sum: f32,
    w: f32,
    plain_sum: f32,
    count: u32,
    time: f32,
}

/// One merged child. The primary slot is the child's first entry with time
/// left; the contributor is retimed against the merged value of that slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contribution {
    pub node: Option<NodeId>,
    pub slot: Option<SyncSlot>,
    pub time_remaining: f32,
    pub weight: f32,
    pub playback_speed: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeSyncProfile {
    owner: Option<NodeId>,
    entries: Vec<SlotEntry>,
    contributions: Vec<Contribution>,
}

impl NodeSyncProfile {
    pub fn new(owner: Option<NodeId>) -> Self {
        Self {
            owner,
            entries: Vec::new(),
            contributions: Vec::new(),
        }
    }

    #[inline]
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.contributions.clear();
    }

    fn entry_mut(&mut self, slot: SyncSlot) -> &mut SlotEntry {
        let idx = match self.entries.iter().position(|e| e.slot == slot) {
            Some(idx) => idx,
            None => {
                self.entries.push(SlotEntry {
                    slot,
                    sum: 0.0,
                    w: 0.0,
                    plain_sum: 0.0,
                    count: 0,
                    time: 0.0,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    /// Writes one unmerged value for `slot`, replacing anything stored there.
    pub fn set_sync_point(&mut self, slot: SyncSlot, time_remaining: f32) {
        let entry = self.entry_mut(slot);
        entry.sum = time_remaining;
        entry.w = 1.0;
        entry.plain_sum = time_remaining;
        entry.count = 1;
        entry.time = time_remaining;
    }

    /// Accumulates a committed child profile with `weight`.
    ///
    /// Zero-weight children still register as contributors so they stay in
    /// phase while faded out; they just do not pull the merged time. Entries
    /// with no time left (a clip parked on its sync point) are skipped.
    pub fn merge_with(&mut self, child: &NodeSyncProfile, weight: f32) {
        let weight = weight.max(0.0);
        let live = || child.entries.iter().filter(|e| e.time > 0.0);
        for e in live() {
            let entry = self.entry_mut(e.slot);
            entry.sum += e.time * weight;
            entry.w += weight;
            entry.plain_sum += e.time;
            entry.count += 1;
        }
        let primary = live().next();
        self.contributions.push(Contribution {
            node: child.owner,
            slot: primary.map(|e| e.slot),
            time_remaining: primary.map(|e| e.time).unwrap_or(0.0),
            weight,
            playback_speed: 1.0,
        });
    }

    /// Finalizes the weighted means and derives every contributor's speed.
    pub fn commit(&mut self) {
        for e in &mut self.entries {
            e.time = if e.w > 0.0 {
                e.sum / e.w
            } else if e.count > 0 {
                e.plain_sum / e.count as f32
            } else {
                0.0
            };
        }
        for i in 0..self.contributions.len() {
            let c = self.contributions[i];
            let speed = match c.slot.and_then(|s| self.time_remaining(s)) {
                Some(merged) if merged > 0.0 => c.time_remaining / merged,
                _ => 1.0,
            };
            self.contributions[i].playback_speed = speed;
        }
    }

    /// Number of slots holding a value.
    #[inline]
    pub fn nodes_count(&self) -> usize {
        self.entries.len()
    }

    pub fn time_remaining(&self, slot: SyncSlot) -> Option<f32> {
        self.entries.iter().find(|e| e.slot == slot).map(|e| e.time)
    }

    /// `(slot, time_remaining)` in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (SyncSlot, f32)> + '_ {
        self.entries.iter().map(|e| (e.slot, e.time))
    }

    #[inline]
    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_sync_point_overwrites_slot() {
        let mut p = NodeSyncProfile::new(None);
        p.set_sync_point(2, 0.5);
        p.set_sync_point(2, 0.25);
        p.commit();
        assert_eq!(p.nodes_count(), 1);
        assert_eq!(p.time_remaining(2), Some(0.25));
    }

    #[test]
    fn child_without_entries_keeps_unit_speed() {
        let empty = NodeSyncProfile::new(Some(NodeId(4)));
        let mut parent = NodeSyncProfile::new(Some(NodeId(0)));
        parent.merge_with(&empty, 1.0);
        parent.commit();
        assert_eq!(parent.nodes_count(), 0);
        assert_eq!(parent.contributions()[0].slot, None);
        assert_eq!(parent.contributions()[0].playback_speed, 1.0);
    }

    #[test]
    fn parked_child_does_not_pull_merged_time() {
        let mut parked = NodeSyncProfile::new(Some(NodeId(1)));
        parked.set_sync_point(0, 0.0);
        let mut live = NodeSyncProfile::new(Some(NodeId(2)));
        live.set_sync_point(0, 1.0);

        let mut parent = NodeSyncProfile::new(None);
        parent.merge_with(&parked, 0.5);
        parent.merge_with(&live, 0.5);
        parent.commit();

        assert_eq!(parent.time_remaining(0), Some(1.0));
        assert_eq!(parent.contributions()[0].slot, None);
        assert_eq!(parent.contributions()[0].playback_speed, 1.0);
        assert_eq!(parent.contributions()[1].playback_speed, 1.0);
    }

    #[test]
    fn primary_slot_skips_entries_without_time_left() {
        let mut child = NodeSyncProfile::new(Some(NodeId(1)));
        child.set_sync_point(3, 0.0);
        child.set_sync_point(5, 0.5);
        let mut parent = NodeSyncProfile::new(None);
        parent.merge_with(&child, 1.0);
        parent.commit();
        assert_eq!(parent.contributions()[0].slot, Some(5));
        assert_eq!(parent.time_remaining(3), None);
        assert_eq!(parent.nodes_count(), 1);
    }

    #[test]
    fn all_zero_weights_fall_back_to_plain_mean() {
        let mut a = NodeSyncProfile::new(Some(NodeId(1)));
        a.set_sync_point(0, 1.0);
        let mut b = NodeSyncProfile::new(Some(NodeId(2)));
        b.set_sync_point(0, 3.0);
        let mut parent = NodeSyncProfile::new(None);
        parent.merge_with(&a, 0.0);
        parent.merge_with(&b, 0.0);
        parent.commit();
        assert_eq!(parent.time_remaining(0), Some(2.0));
    }
}
