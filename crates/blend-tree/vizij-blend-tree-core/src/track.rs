//! Timeline track: the playhead of one clip node and its sync points.
//!
//! Sync points are compiled into segments. A segment owns the stretch of time
//! that ends at its sync point:
//!
//! ```text
//! non-looping, points at 0.25 / 0.75, duration 2
//!   [0.0 ---- e1 0.5) [0.5 -------- e2 1.5) [1.5 -- none 2.0]
//!
//! looping, same points
//!   head:      [-0.5 --- e1 0.5)   (wraps around the back of the clip)
//!              [ 0.5 --- e2 1.5)
//!   duplicate: [ 1.5 --- e1 2.5)   (the head again, one duration later)
//! ```
//!
//! The active segment is the first whose end lies after the playhead. A
//! non-looping playhead parked on `duration` keeps the last segment.

use serde::{Deserialize, Serialize};

use crate::ids::EventId;
use crate::sync::{slot_of, NodeSyncProfile, TreeSyncProfile};

/// A named landmark at a normalized position of a clip.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncPoint {
    pub event: EventId,
    /// Normalized position in [0, 1].
    pub progress: f32,
}

impl SyncPoint {
    pub fn new(event: EventId, progress: f32) -> Self {
        Self { event, progress }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Segment {
    event: Option<EventId>,
    end_time: f32,
    duration: f32,
}

impl Segment {
    /// Position of `t` inside the segment, 0 at its start and 1 at its sync point.
    #[inline]
    fn progress_at(&self, t: f32) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (1.0 - (self.end_time - t) / self.duration).clamp(0.0, 1.0)
    }

    /// Playhead time at which the segment reaches `progress`.
    #[inline]
    fn time_at(&self, progress: f32) -> f32 {
        self.end_time - self.duration * (1.0 - progress)
    }
}

/// Float modulo with a result in [0, b) for positive `b`.
fn fmod(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        return 0.0;
    }
    let m = a % b;
    if (m < 0.0 && b > 0.0) || (m > 0.0 && b < 0.0) {
        m + b
    } else {
        m
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimelineTrack {
    sync_points: Vec<SyncPoint>,
    segments: Vec<Segment>,
    duration: f32,
    looped: bool,
    track_time: f32,
    active: usize,
    completed: Option<EventId>,
    /// Set when `reset_to` parked the playhead on 0; cleared by `update`.
    from_start: bool,
}

impl TimelineTrack {
    /// Builds a track at time 0. Sync points are sorted by progress.
    pub fn new(mut sync_points: Vec<SyncPoint>, duration: f32, looped: bool) -> Self {
        debug_assert!(duration > 0.0, "timeline duration must be positive");
        sync_points.sort_by(|a, b| a.progress.total_cmp(&b.progress));
        let segments = Self::build_segments(&sync_points, duration, looped);
        let mut track = Self {
            sync_points,
            segments,
            duration,
            looped,
            track_time: 0.0,
            active: 0,
            completed: None,
            from_start: true,
        };
        track.active = track.segment_at(0.0);
        track
    }

    fn build_segments(points: &[SyncPoint], duration: f32, looped: bool) -> Vec<Segment> {
        if points.is_empty() {
            return vec![Segment {
                event: None,
                end_time: duration,
                duration,
            }];
        }

        let mut segments = Vec::with_capacity(points.len() + 1);
        let mut prev_end = 0.0;
        for p in points {
            let end_time = p.progress * duration;
            segments.push(Segment {
                event: Some(p.event),
                end_time,
                duration: end_time - prev_end,
            });
            prev_end = end_time;
        }

        if looped {
            let tail_end = prev_end;
            let head = &mut segments[0];
            head.duration = duration + head.end_time - tail_end;
            let mut dup = *head;
            dup.end_time += duration;
            segments.push(dup);
        } else if prev_end < duration {
            segments.push(Segment {
                event: None,
                end_time: duration,
                duration: duration - prev_end,
            });
        }
        segments
    }

    fn segment_at(&self, t: f32) -> usize {
        self.segments
            .iter()
            .position(|s| t < s.end_time)
            .unwrap_or(self.segments.len() - 1)
    }

    /// The looping duplicate of the head segment.
    #[inline]
    fn is_duplicate(&self, idx: usize) -> bool {
        self.looped && !self.sync_points.is_empty() && idx == self.segments.len() - 1
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[inline]
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.track_time
    }

    /// Normalized playhead position in [0, 1].
    #[inline]
    pub fn progress(&self) -> f32 {
        self.track_time / self.duration
    }

    #[inline]
    pub fn sync_points(&self) -> &[SyncPoint] {
        &self.sync_points
    }

    /// Event of the sync point the playhead passed during the last `update`.
    #[inline]
    pub fn completed_sync_point(&self) -> Option<EventId> {
        self.completed
    }

    /// Moves the playhead, wrapping (looping) or clamping (non-looping).
    pub fn reset_to(&mut self, time: f32) {
        self.track_time = if self.looped {
            fmod(time, self.duration)
        } else {
            time.clamp(0.0, self.duration)
        };
        self.active = self.segment_at(self.track_time);
        self.completed = None;
        self.from_start = self.track_time == 0.0;
    }

    /// Whether the playhead was put on 0 by a reset and has not moved since.
    #[inline]
    pub fn is_at_start(&self) -> bool {
        self.from_start
    }

    /// Advances the playhead by `dt`. Returns `true` when a looping track
    /// wrapped around; non-looping tracks clamp at the end and never wrap.
    pub fn update(&mut self, dt: f32) -> bool {
        let advanced = self.track_time + dt;
        let (new_time, wrapped) = if self.looped {
            let wrapped_time = fmod(advanced, self.duration);
            (wrapped_time, wrapped_time != advanced)
        } else {
            (advanced.clamp(0.0, self.duration), false)
        };
        self.track_time = new_time;
        self.from_start = false;

        let prev = self.active;
        self.active = self.segment_at(new_time);
        self.completed = if self.active != prev {
            // Leaving the duplicate for the head is the wrap itself, not a sync point.
            if self.is_duplicate(prev) && self.active == 0 {
                None
            } else {
                self.segments[prev].event
            }
        } else if wrapped {
            self.boundary_event()
        } else {
            None
        };
        wrapped
    }

    /// Event of a sync point sitting on the wrap point (progress 0 or 1).
    /// A lone point there never changes the active segment, so the wrap is
    /// the crossing.
    fn boundary_event(&self) -> Option<EventId> {
        self.sync_points
            .iter()
            .find(|p| p.progress <= 0.0 || p.progress >= 1.0)
            .map(|p| p.event)
    }

    /// Smallest non-negative playhead time at which this track would sit at
    /// the published progress of one of the profile's events. `0.0` when the
    /// track shares no event with the profile.
    pub fn jump_to_first_match(&self, profile: &TreeSyncProfile) -> f32 {
        let mut best: Option<f32> = None;
        for seg in &self.segments {
            let Some(event) = seg.event else { continue };
            let Some(progress) = profile.progress_of(event) else {
                continue;
            };
            let candidate = seg.time_at(progress);
            if candidate < 0.0 {
                // Only the looping head reaches back before zero; its
                // duplicate offers the same point one duration later.
                continue;
            }
            best = Some(best.map_or(candidate, |b: f32| b.min(candidate)));
        }
        best.unwrap_or(0.0)
    }

    /// Publishes the progress towards the upcoming sync point, if any.
    pub fn update_tree_profile(&self, out: &mut TreeSyncProfile) {
        let seg = &self.segments[self.active];
        if let Some(event) = seg.event {
            out.submit(event, seg.progress_at(self.track_time));
        }
    }

    /// Writes the forward-only time remaining until each of the profile's
    /// events, nearest occurrence first.
    pub fn synchronize_to(&self, profile: &TreeSyncProfile, out: &mut NodeSyncProfile) {
        let order: Vec<usize> = if self.looped {
            (self.active..self.segments.len())
                .chain(0..self.active)
                .collect()
        } else {
            (self.active..self.segments.len()).collect()
        };

        let mut found: Vec<(EventId, f32)> = Vec::new();
        for idx in order {
            let seg = &self.segments[idx];
            let Some(event) = seg.event else { continue };
            if !profile.contains(event) || found.iter().any(|(e, _)| *e == event) {
                continue;
            }
            let mut remaining = seg.end_time - self.track_time;
            if remaining < 0.0 && self.looped {
                remaining += self.duration;
            }
            found.push((event, remaining));
        }

        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (event, remaining) in found {
            out.set_sync_point(slot_of(event), remaining);
        }
    }

    /// Whether a marker at time `at` lies between two playhead positions.
    ///
    /// Forward motion covers `(prev, new]`; a wrap covers `(prev, duration]`
    /// and `[0, new]`, so a marker at 0 fires once when the wrap lands on it.
    /// A marker at 0 also fires when the playhead leaves a start position set
    /// by `reset_to` (`from_start`), never after a wrap.
    pub fn passed(prev: f32, new: f32, wrapped: bool, from_start: bool, at: f32) -> bool {
        if wrapped {
            at > prev || at <= new
        } else {
            (prev < at && at <= new) || (from_start && at == 0.0 && prev == 0.0 && new > 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmod_wraps_negative() {
        assert_eq!(fmod(-0.5, 2.0), 1.5);
        assert_eq!(fmod(2.0, 2.0), 0.0);
        assert_eq!(fmod(0.25, 0.0), 0.0);
    }

    #[test]
    fn sync_points_are_sorted() {
        let t = TimelineTrack::new(
            vec![SyncPoint::new(EventId(1), 0.75), SyncPoint::new(EventId(0), 0.25)],
            2.0,
            false,
        );
        assert_eq!(t.sync_points()[0].event, EventId(0));
        assert_eq!(t.sync_points()[1].event, EventId(1));
    }

    #[test]
    fn passed_covers_wrap_and_start() {
        assert!(TimelineTrack::passed(0.2, 0.6, false, false, 0.5));
        assert!(!TimelineTrack::passed(0.5, 0.6, false, false, 0.5));
        assert!(TimelineTrack::passed(0.0, 0.1, false, true, 0.0));
        assert!(!TimelineTrack::passed(0.0, 0.1, false, false, 0.0));
        assert!(TimelineTrack::passed(1.8, 0.1, true, false, 1.9));
        assert!(TimelineTrack::passed(1.8, 0.1, true, false, 0.0));
        assert!(TimelineTrack::passed(1.5, 0.0, true, false, 0.0));
        assert!(!TimelineTrack::passed(1.8, 0.1, true, false, 1.0));
    }
}
