//! Player: drives one blend tree against one poses sink.
//!
//! Lifecycle:
//! - `on_started` caches the sink pose, builds the runtime layout, notifies
//!   listeners, activates the root and synchronizes once.
//! - every tick: `on_frame_start` (publishes last tick's events),
//!   `sample_poses(dt)`, `on_frame_end`. `update(dt)` runs all three.
//! - `on_finished` deactivates everything, drops the layout, restores the
//!   cached sink pose and notifies listeners.
//!
//! Nothing here returns errors. A player missing its tree, the tree's skeleton
//! or a sink is disabled; a skeleton mapper that does not connect the two
//! skeletons is ignored with a warning and poses are copied through.

use std::sync::Arc;

use log::{debug, warn};
use nalgebra::Matrix4;

use crate::config::Config;
use crate::events::TriggeredEvents;
use crate::ids::{EventId, NodeId, VariableId};
use crate::listener::{ListenerHandle, ListenerSet};
use crate::mapper::{SkeletonMapper, SkeletonMapperRuntime};
use crate::pose::{PosesSink, Skeleton, Transform};
use crate::runtime::nodes::{raise_event, Ctx};
use crate::runtime::{NodeRuntime, RuntimeData};
use crate::state::{NodeState, PlayerState};
use crate::sync::{NodeSyncProfile, TreeSyncProfile};
use crate::tree::BlendTree;
use crate::variable::VariableValue;

pub struct Player {
    cfg: Config,
    state: PlayerState,
    tree: Option<Arc<BlendTree>>,
    skeleton_mapper: Option<Arc<dyn SkeletonMapper>>,
    sink: Option<PosesSink>,
    /// Skeleton the sink context was initialized for.
    sink_skeleton: Option<Arc<Skeleton>>,
    runtime: Option<RuntimeData>,
    mapper_runtime: Option<Box<dyn SkeletonMapperRuntime>>,
    tree_profile: TreeSyncProfile,
    events: TriggeredEvents,
    listeners: ListenerSet,
    cached_pose: Vec<Matrix4<f32>>,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Player {
    pub fn new(cfg: Config) -> Self {
        if !cfg.has_valid_speed_range() {
            warn!(
                "playback speed range [{}, {}] is malformed; speeds resolve to the upper bound",
                cfg.min_playback_speed, cfg.max_playback_speed
            );
        }
        Self {
            tree_profile: TreeSyncProfile::new(cfg.max_sync_points),
            cfg,
            state: PlayerState::Stopped,
            tree: None,
            skeleton_mapper: None,
            sink: None,
            sink_skeleton: None,
            runtime: None,
            mapper_runtime: None,
            events: TriggeredEvents::default(),
            listeners: ListenerSet::default(),
            cached_pose: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    #[inline]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    // ---- setup ----

    /// Replaces the tree and re-provisions the event buffer for its event
    /// table. A running player is finished first.
    pub fn set_blend_tree(&mut self, tree: Arc<BlendTree>) {
        if self.state.is_running() {
            self.on_finished();
        }
        self.events.resize(tree.event_count());
        self.tree = Some(tree);
    }

    pub fn clear_blend_tree(&mut self) {
        if self.state.is_running() {
            self.on_finished();
        }
        self.events.resize(0);
        self.tree = None;
    }

    #[inline]
    pub fn blend_tree(&self) -> Option<&Arc<BlendTree>> {
        self.tree.as_ref()
    }

    pub fn set_skeleton_mapper(&mut self, mapper: Option<Arc<dyn SkeletonMapper>>) {
        self.skeleton_mapper = mapper;
        if self.state.is_running() {
            self.initialize_skeleton_mapper();
        }
    }

    pub fn attach_poses_sink(&mut self, sink: PosesSink) {
        self.sink = Some(sink);
        self.initialize_poses_sink_context();
    }

    pub fn detach_poses_sink(&mut self) -> Option<PosesSink> {
        if self.state.is_running() {
            self.on_finished();
        }
        self.sink_skeleton = None;
        self.mapper_runtime = None;
        self.sink.take()
    }

    /// Rebinds the player to the sink's current skeleton. A no-op when that
    /// skeleton is the one already bound.
    pub fn initialize_poses_sink_context(&mut self) {
        let skeleton = self.sink.as_ref().and_then(|s| s.skeleton().cloned());
        if let (Some(current), Some(incoming)) = (&self.sink_skeleton, &skeleton) {
            if Arc::ptr_eq(current, incoming) {
                return;
            }
        }
        self.sink_skeleton = skeleton;
        if self.state.is_running() {
            self.initialize_skeleton_mapper();
        }
    }

    #[inline]
    pub fn poses_sink(&self) -> Option<&PosesSink> {
        self.sink.as_ref()
    }

    /// Whether `on_started` would start the simulation.
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some() && self.tree.as_ref().is_some_and(|t| t.skeleton().is_some())
    }

    /// Retargeting is only wired when the mapper connects exactly the tree's
    /// skeleton to the sink's.
    fn initialize_skeleton_mapper(&mut self) {
        self.mapper_runtime = None;
        let Some(mapper) = &self.skeleton_mapper else {
            return;
        };
        let source = self.tree.as_ref().and_then(|t| t.skeleton());
        match (source, &self.sink_skeleton) {
            (Some(src), Some(dst)) if mapper.maps(src, dst) => {
                self.mapper_runtime = Some(mapper.create_runtime());
            }
            (src, dst) => warn!(
                "skeleton mapper ({} -> {}) does not match blend tree skeleton {:?} and sink skeleton {:?}; copying poses through",
                mapper.source_skeleton().name,
                mapper.target_skeleton().name,
                src.map(|s| s.name.as_str()),
                dst.as_ref().map(|s| s.name.as_str()),
            ),
        }
    }

    // ---- listeners ----

    /// Returns `false` when the listener was already attached.
    pub fn attach_listener(&mut self, listener: ListenerHandle) -> bool {
        self.listeners.attach(listener)
    }

    /// Returns `false` when the listener was not attached.
    pub fn detach_listener(&mut self, listener: &ListenerHandle) -> bool {
        self.listeners.detach(listener)
    }

    /// Replays the state of every node to one listener, in handle order.
    pub fn pull_structure(&self, listener: &ListenerHandle) {
        let Some(tree) = &self.tree else { return };
        let mut l = listener.borrow_mut();
        for (id, _) in tree.nodes() {
            l.on_node_state_changed(id, self.node_state(id));
        }
    }

    // ---- lifecycle ----

    fn with_ctx(&mut self, f: impl FnOnce(&mut Ctx<'_>, &mut TreeSyncProfile)) {
        let (Some(tree), Some(data)) = (self.tree.as_deref(), self.runtime.as_mut()) else {
            return;
        };
        let mut ctx = Ctx {
            tree,
            data,
            events: &mut self.events,
            listeners: &self.listeners,
            config: &self.cfg,
        };
        f(&mut ctx, &mut self.tree_profile);
    }

    pub fn on_started(&mut self) {
        if self.state.is_running() {
            debug!("player already running");
            return;
        }
        if !self.is_enabled() {
            warn!("player is disabled: it needs a blend tree with a skeleton and a poses sink");
            return;
        }
        let (Some(tree), Some(sink)) = (self.tree.clone(), self.sink.as_ref()) else {
            return;
        };

        self.cached_pose = sink.bone_local_mtx.clone();
        let bone_count = tree.skeleton().map_or(0, |s| s.bone_count());
        self.runtime = Some(RuntimeData::new(&tree, bone_count));
        self.initialize_skeleton_mapper();
        self.tree_profile = TreeSyncProfile::new(self.cfg.max_sync_points);
        self.state = PlayerState::Running;
        debug!(
            "blend tree layout built: {} nodes, {} events, {} bones",
            tree.node_count(),
            tree.event_count(),
            bone_count
        );

        self.listeners.notify(|l| l.on_simulation_started());

        let root = tree.root();
        self.with_ctx(|ctx, profile| {
            ctx.activate(root);
            profile.reset();
            ctx.generate_tree_sync_profile(root, profile);
            ctx.synchronize(root, profile);
        });
    }

    /// Publishes the events triggered during the previous tick. Call exactly
    /// once per tick, before any `trigger_event`/`was_event_triggered`.
    pub fn on_frame_start(&mut self) {
        self.events.swap();
    }

    pub fn sample_poses(&mut self, dt: f32) {
        if !self.state.is_running() {
            debug!("sample_poses ignored: player is stopped");
            return;
        }
        let Some(root) = self.tree.as_ref().map(|t| t.root()) else {
            return;
        };
        let dt = dt.max(0.0);
        self.with_ctx(|ctx, profile| {
            ctx.update_logic(root);
            profile.reset();
            ctx.generate_tree_sync_profile(root, profile);
            ctx.synchronize(root, profile);
            ctx.sample_pose(root, dt);
        });
        self.write_sink();
    }

    pub fn on_frame_end(&mut self) {}

    /// One full tick.
    pub fn update(&mut self, dt: f32) {
        self.on_frame_start();
        self.sample_poses(dt);
        self.on_frame_end();
    }

    pub fn on_finished(&mut self) {
        if !self.state.is_running() {
            return;
        }
        if let Some(root) = self.tree.as_ref().map(|t| t.root()) {
            self.with_ctx(|ctx, _| ctx.deactivate(root));
        }
        self.runtime = None;
        self.mapper_runtime = None;
        if let Some(sink) = &mut self.sink {
            if sink.bone_count() == self.cached_pose.len() {
                sink.bone_local_mtx.clone_from(&self.cached_pose);
            } else {
                sink.reset_to_t_pose();
            }
        }
        self.cached_pose.clear();
        self.events.clear();
        self.state = PlayerState::Stopped;
        debug!("blend tree layout torn down");

        self.listeners.notify(|l| l.on_simulation_finished());
    }

    /// Composes the root pose with the sink skeleton's bind pose. Pose
    /// transforms are offsets in each bone's local space.
    fn write_sink(&mut self) {
        let (Some(runtime), Some(tree), Some(sink)) = (&self.runtime, &self.tree, &mut self.sink)
        else {
            return;
        };
        let Some(root) = runtime.node(tree.root()) else {
            return;
        };
        let pose: &[Transform] = match self.mapper_runtime.as_mut() {
            Some(mapper) => mapper.translate_pose(root.pose()),
            None => root.pose(),
        };
        let bind = self
            .sink_skeleton
            .as_ref()
            .map(|s| s.bone_local_matrices.as_slice())
            .unwrap_or(&[]);

        for (i, dst) in sink.bone_local_mtx.iter_mut().enumerate() {
            match (pose.get(i), bind.get(i)) {
                (Some(t), Some(b)) => *dst = b * t.to_matrix(),
                (Some(t), None) => *dst = t.to_matrix(),
                (None, Some(b)) => *dst = *b,
                (None, None) => {}
            }
        }
    }

    // ---- events ----

    /// Marks `event` for the next tick and notifies listeners immediately.
    pub fn trigger_event(&mut self, event: EventId) {
        raise_event(&mut self.events, &self.listeners, event);
    }

    /// Whether `event` was triggered during the previous tick.
    pub fn was_event_triggered(&self, event: EventId) -> bool {
        self.events.was_triggered(event)
    }

    // ---- variables ----

    /// Sets a runtime variable. Only possible while running; the kind must
    /// match the declaration.
    pub fn set_variable(&mut self, id: VariableId, value: VariableValue) -> bool {
        match &mut self.runtime {
            Some(runtime) => runtime.set_variable(id, value),
            None => {
                debug!("set_variable({:?}) ignored: player is stopped", id);
                false
            }
        }
    }

    /// Runtime value while running, the declared default otherwise.
    pub fn variable(&self, id: VariableId) -> Option<VariableValue> {
        match &self.runtime {
            Some(runtime) => runtime.variable(id),
            None => self
                .tree
                .as_ref()
                .and_then(|t| t.variables().get(id.index()))
                .map(|v| v.default),
        }
    }

    // ---- introspection ----

    pub fn node_runtime(&self, id: NodeId) -> Option<&NodeRuntime> {
        self.runtime.as_ref().and_then(|r| r.node(id))
    }

    pub fn node_state(&self, id: NodeId) -> NodeState {
        self.node_runtime(id)
            .map(|n| n.state())
            .unwrap_or(NodeState::Inactive)
    }

    pub fn node_playback_speed(&self, id: NodeId) -> Option<f32> {
        self.node_runtime(id).map(|n| n.playback_speed())
    }

    /// Playhead of a clip node.
    pub fn track_time(&self, id: NodeId) -> Option<f32> {
        self.node_runtime(id)
            .and_then(|n| n.track())
            .map(|t| t.time())
    }

    pub fn node_sync_profile(&self, id: NodeId) -> Option<&NodeSyncProfile> {
        self.node_runtime(id).map(|n| n.sync_profile())
    }

    /// Tree profile built during the last tick.
    #[inline]
    pub fn tree_sync_profile(&self) -> &TreeSyncProfile {
        &self.tree_profile
    }

    /// Root pose of the last tick, before retargeting.
    pub fn generated_pose(&self) -> Option<&[Transform]> {
        let root = self.tree.as_ref()?.root();
        self.node_runtime(root).map(|n| n.pose())
    }
}
