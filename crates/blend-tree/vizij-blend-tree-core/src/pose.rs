//! Bone transforms, skeletons and the poses sink the player writes into.

use std::sync::Arc;

use nalgebra::{Matrix4, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

#[inline]
fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
    ]
}

#[inline]
fn dot4(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

/// Quaternion NLERP (x, y, z, w) along the shortest arc.
#[inline]
pub fn nlerp_quat(a: [f32; 4], mut b: [f32; 4], t: f32) -> [f32; 4] {
    if dot4(a, b) < 0.0 {
        b = [-b[0], -b[1], -b[2], -b[3]];
    }
    let mut q = [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
        lerp_f32(a[3], b[3], t),
    ];
    let len2 = dot4(q, q);
    if len2 > 0.0 {
        let inv_len = len2.sqrt().recip();
        for c in &mut q {
            *c *= inv_len;
        }
    }
    q
}

/// Local bone transform split to TRS for blending.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: [f32; 3],
    /// Quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    pub fn from_translation(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Component-wise lerp for translation and scale, NLERP for rotation.
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            translation: lerp_vec3(self.translation, other.translation, t),
            rotation: nlerp_quat(self.rotation, other.rotation, t),
            scale: lerp_vec3(self.scale, other.scale, t),
        }
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        let [x, y, z, w] = self.rotation;
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
        let [tx, ty, tz] = self.translation;
        Translation3::new(tx, ty, tz).to_homogeneous()
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&Vector3::from(self.scale))
    }
}

/// Blends two poses bone by bone into `out`; `weight` is the share of `b`.
/// Bones missing from either input keep their value in `out`.
pub fn blend_poses(a: &[Transform], b: &[Transform], weight: f32, out: &mut [Transform]) {
    for (i, dst) in out.iter_mut().enumerate() {
        match (a.get(i), b.get(i)) {
            (Some(ta), Some(tb)) => *dst = ta.lerp(tb, weight),
            (Some(ta), None) => *dst = *ta,
            (None, Some(tb)) => *dst = *tb,
            (None, None) => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
    pub name: String,
    pub bone_names: Vec<String>,
    /// Bind-pose local matrix per bone.
    pub bone_local_matrices: Vec<Matrix4<f32>>,
}

impl Skeleton {
    pub fn new(name: impl Into<String>, bones: Vec<(String, Matrix4<f32>)>) -> Self {
        let (bone_names, bone_local_matrices) = bones.into_iter().unzip();
        Self {
            name: name.into(),
            bone_names,
            bone_local_matrices,
        }
    }

    /// Skeleton whose bones all sit at the identity.
    pub fn with_identity_bones(name: impl Into<String>, bone_count: usize) -> Self {
        Self::new(
            name,
            (0..bone_count)
                .map(|i| (format!("bone{i}"), Matrix4::identity()))
                .collect(),
        )
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_local_matrices.len()
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bone_names.iter().position(|n| n == name)
    }
}

/// Destination of the player's output: one local matrix per bone of the
/// sink's skeleton.
#[derive(Clone, Debug, Default)]
pub struct PosesSink {
    skeleton: Option<Arc<Skeleton>>,
    pub bone_local_mtx: Vec<Matrix4<f32>>,
}

impl PosesSink {
    pub fn new(skeleton: Option<Arc<Skeleton>>) -> Self {
        let mut sink = Self {
            skeleton,
            bone_local_mtx: Vec::new(),
        };
        sink.reset_to_t_pose();
        sink
    }

    #[inline]
    pub fn skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.skeleton.as_ref()
    }

    pub fn set_skeleton(&mut self, skeleton: Option<Arc<Skeleton>>) {
        self.skeleton = skeleton;
        self.reset_to_t_pose();
    }

    /// Overwrites every bone with its bind-pose local matrix.
    pub fn reset_to_t_pose(&mut self) {
        self.bone_local_mtx = self
            .skeleton
            .as_ref()
            .map(|s| s.bone_local_matrices.clone())
            .unwrap_or_default();
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_local_mtx.len()
    }
}
