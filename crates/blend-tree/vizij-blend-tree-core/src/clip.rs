//! Animation clips sampled by clip nodes.
//!
//! The player only needs a duration and a way to write a pose for a given
//! time, so clips sit behind [`AnimationClip`]. [`SnapshotClip`] is a small
//! keyframed implementation for hosts without their own clip format.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pose::Transform;

pub trait AnimationClip: fmt::Debug + Send + Sync {
    /// Length in seconds. Must be positive.
    fn duration(&self) -> f32;

    /// Writes the local transform of every bone at `time` into `out`.
    fn sample_pose(&self, time: f32, out: &mut [Transform]);
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneKey {
    pub time: f32,
    pub transform: Transform,
}

/// Keys of one bone, ascending by time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    pub keys: Vec<BoneKey>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotClip {
    pub name: String,
    pub duration: f32,
    /// Track per bone index. Bones without a track stay at the identity.
    pub bones: Vec<BoneTrack>,
}

impl SnapshotClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            bones: Vec::new(),
        }
    }

    /// Appends a key for `bone`, growing the track table as needed.
    pub fn with_key(mut self, bone: usize, time: f32, transform: Transform) -> Self {
        if self.bones.len() <= bone {
            self.bones.resize_with(bone + 1, BoneTrack::default);
        }
        let keys = &mut self.bones[bone].keys;
        keys.push(BoneKey { time, transform });
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        self
    }
}

/// Returns (i0, i1, local_t) for keys around `t`. Clamps outside the range.
fn find_segment(keys: &[BoneKey], t: f32) -> (usize, usize, f32) {
    let n = keys.len();
    if n == 1 || t <= keys[0].time {
        return (0, 0, 0.0);
    }
    if t >= keys[n - 1].time {
        return (n - 1, n - 1, 0.0);
    }
    for i in 0..(n - 1) {
        let t0 = keys[i].time;
        let t1 = keys[i + 1].time;
        if t >= t0 && t <= t1 {
            let denom = (t1 - t0).max(f32::EPSILON);
            return (i, i + 1, ((t - t0) / denom).clamp(0.0, 1.0));
        }
    }
    (n - 1, n - 1, 0.0)
}

impl AnimationClip for SnapshotClip {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn sample_pose(&self, time: f32, out: &mut [Transform]) {
        for (bone, dst) in out.iter_mut().enumerate() {
            *dst = match self.bones.get(bone) {
                Some(track) if !track.keys.is_empty() => {
                    let (i0, i1, lt) = find_segment(&track.keys, time);
                    track.keys[i0].transform.lerp(&track.keys[i1].transform, lt)
                }
                _ => Transform::IDENTITY,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_between_keys() {
        let clip = SnapshotClip::new("slide", 2.0)
            .with_key(0, 0.0, Transform::from_translation([0.0, 0.0, 0.0]))
            .with_key(0, 2.0, Transform::from_translation([4.0, 0.0, 0.0]));
        let mut out = [Transform::IDENTITY; 2];
        clip.sample_pose(0.5, &mut out);
        assert_eq!(out[0].translation, [1.0, 0.0, 0.0]);
        assert_eq!(out[1], Transform::IDENTITY);
    }

    #[test]
    fn clamps_outside_key_range() {
        let clip = SnapshotClip::new("hold", 1.0)
            .with_key(0, 0.25, Transform::from_translation([1.0, 0.0, 0.0]))
            .with_key(0, 0.75, Transform::from_translation([3.0, 0.0, 0.0]));
        let mut out = [Transform::IDENTITY; 1];
        clip.sample_pose(0.0, &mut out);
        assert_eq!(out[0].translation, [1.0, 0.0, 0.0]);
        clip.sample_pose(1.0, &mut out);
        assert_eq!(out[0].translation, [3.0, 0.0, 0.0]);
    }
}
