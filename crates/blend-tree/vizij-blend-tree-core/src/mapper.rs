//! Retargeting seam between the tree's skeleton and the sink's skeleton.
//!
//! The retargeting math lives with the host. The player only checks that a
//! mapper was built for the two skeletons it is about to connect.

use std::sync::Arc;

use crate::pose::{Skeleton, Transform};

pub trait SkeletonMapper {
    /// Skeleton the poses come from (the blend tree's).
    fn source_skeleton(&self) -> &Arc<Skeleton>;

    /// Skeleton the poses are written to (the sink's).
    fn target_skeleton(&self) -> &Arc<Skeleton>;

    fn create_runtime(&self) -> Box<dyn SkeletonMapperRuntime>;

    /// Whether this mapper connects exactly these two skeletons.
    fn maps(&self, source: &Arc<Skeleton>, target: &Arc<Skeleton>) -> bool {
        Arc::ptr_eq(self.source_skeleton(), source) && Arc::ptr_eq(self.target_skeleton(), target)
    }
}

pub trait SkeletonMapperRuntime {
    /// Converts a pose of the source skeleton into one of the target skeleton.
    fn translate_pose(&mut self, source_pose: &[Transform]) -> &[Transform];
}
