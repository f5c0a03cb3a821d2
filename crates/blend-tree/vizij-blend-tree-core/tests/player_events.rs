use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use vizij_blend_tree_core::{
    AnimationNode, BlendTreeBuilder, EventId, ListenerHandle, NodeId, NodeState, Player,
    PlayerListener, PosesSink, Skeleton, SnapshotClip, Transform,
};

#[derive(Default)]
struct Recorder {
    log: Vec<String>,
}

impl PlayerListener for Recorder {
    fn on_simulation_started(&mut self) {
        self.log.push("started".into());
    }

    fn on_node_state_changed(&mut self, node: NodeId, state: NodeState) {
        self.log.push(format!("node {} {}", node.0, state.name()));
    }

    fn on_event_triggered(&mut self, event: EventId) {
        self.log.push(format!("event {}", event.0));
    }

    fn on_sync_point_reached(&mut self, node: NodeId, event: EventId) {
        self.log.push(format!("sync {} {}", node.0, event.0));
    }

    fn on_simulation_finished(&mut self) {
        self.log.push("finished".into());
    }
}

fn mk_recorder() -> (Rc<RefCell<Recorder>>, ListenerHandle) {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let handle: ListenerHandle = rec.clone();
    (rec, handle)
}

struct Fixture {
    player: Player,
    clip: NodeId,
    step: EventId,
    cue: EventId,
}

/// One looping 1s clip: sync point `step` at 0.5, clip event `cue` at 0.25.
fn mk_fixture() -> Fixture {
    let skeleton = Arc::new(Skeleton::with_identity_bones("rig", 1));
    let mut b = BlendTreeBuilder::new();
    b.skeleton(skeleton.clone());
    let step = b.add_event("step");
    let cue = b.add_event("cue");
    let clip = b.add_animation(
        "loop",
        AnimationNode::new(Arc::new(SnapshotClip::new("loop", 1.0).with_key(
            0,
            0.0,
            Transform::IDENTITY,
        )))
        .looped(true)
        .with_sync_point(step, 0.5)
        .with_event(cue, 0.25),
    );
    b.set_root(clip);

    let mut player = Player::default();
    player.set_blend_tree(Arc::new(b.build().expect("tree")));
    player.attach_poses_sink(PosesSink::new(Some(skeleton)));
    Fixture {
        player,
        clip,
        step,
        cue,
    }
}

#[test]
fn triggered_event_is_visible_for_exactly_the_next_tick() {
    let mut f = mk_fixture();
    f.player.on_started();

    f.player.on_frame_start();
    f.player.trigger_event(f.step);
    assert!(!f.player.was_event_triggered(f.step));

    f.player.on_frame_start();
    assert!(f.player.was_event_triggered(f.step));
    assert!(!f.player.was_event_triggered(f.cue));

    f.player.on_frame_start();
    assert!(!f.player.was_event_triggered(f.step));
}

#[test]
fn listener_hears_trigger_immediately() {
    let mut f = mk_fixture();
    let (rec, handle) = mk_recorder();
    f.player.attach_listener(handle);
    f.player.trigger_event(f.cue);
    assert_eq!(rec.borrow().log, vec!["event 1".to_string()]);
}

#[test]
fn start_notifies_before_root_activation_and_finish_last() {
    let mut f = mk_fixture();
    let (rec, handle) = mk_recorder();
    f.player.attach_listener(handle);

    f.player.on_started();
    f.player.on_finished();

    let log = rec.borrow().log.clone();
    assert_eq!(
        log,
        vec![
            "started",
            "node 0 to_synchronize",
            "node 0 active",
            "node 0 inactive",
            "finished",
        ]
    );
}

#[test]
fn duplicate_attach_notifies_once_and_detach_stops_notifications() {
    let mut f = mk_fixture();
    let (rec, handle) = mk_recorder();
    assert!(f.player.attach_listener(handle.clone()));
    assert!(!f.player.attach_listener(handle.clone()));

    f.player.trigger_event(f.step);
    assert_eq!(rec.borrow().log.len(), 1);

    assert!(f.player.detach_listener(&handle));
    assert!(!f.player.detach_listener(&handle));
    f.player.trigger_event(f.step);
    assert_eq!(rec.borrow().log.len(), 1);
}

#[test]
fn clip_events_raise_tree_events() {
    let mut f = mk_fixture();
    f.player.on_started();
    let (rec, handle) = mk_recorder();
    f.player.attach_listener(handle);

    f.player.update(0.2);
    assert!(rec.borrow().log.is_empty());

    f.player.update(0.1);
    assert_eq!(rec.borrow().log, vec!["event 1".to_string()]);
    assert!(!f.player.was_event_triggered(f.cue));

    f.player.on_frame_start();
    assert!(f.player.was_event_triggered(f.cue));
}

#[test]
fn sync_point_reached_is_reported_once_per_pass() {
    let mut f = mk_fixture();
    f.player.on_started();
    let (rec, handle) = mk_recorder();
    f.player.attach_listener(handle);

    f.player.update(0.3);
    f.player.update(0.3);
    f.player.update(0.3);

    let syncs: Vec<String> = rec
        .borrow()
        .log
        .iter()
        .filter(|l| l.starts_with("sync"))
        .cloned()
        .collect();
    assert_eq!(syncs, vec![format!("sync {} {}", f.clip.0, f.step.0)]);
}

#[test]
fn pull_structure_replays_node_states() {
    let mut f = mk_fixture();
    let (rec, handle) = mk_recorder();
    f.player.pull_structure(&handle);
    assert_eq!(rec.borrow().log, vec!["node 0 inactive".to_string()]);

    f.player.on_started();
    rec.borrow_mut().log.clear();
    f.player.pull_structure(&handle);
    assert_eq!(rec.borrow().log, vec!["node 0 active".to_string()]);
}

#[test]
fn clip_event_at_zero_fires_once_per_loop() {
    let skeleton = Arc::new(Skeleton::with_identity_bones("rig", 1));
    let mut b = BlendTreeBuilder::new();
    b.skeleton(skeleton.clone());
    let cue = b.add_event("cue");
    let clip = b.add_animation(
        "loop",
        AnimationNode::new(Arc::new(SnapshotClip::new("loop", 2.0)))
            .looped(true)
            .with_event(cue, 0.0),
    );
    b.set_root(clip);
    let mut player = Player::default();
    player.set_blend_tree(Arc::new(b.build().expect("tree")));
    player.attach_poses_sink(PosesSink::new(Some(skeleton)));
    player.on_started();

    let (rec, handle) = mk_recorder();
    player.attach_listener(handle);
    let mut fires = Vec::new();
    let mut visible = Vec::new();
    for _ in 0..9 {
        let before = rec.borrow().log.len();
        player.update(0.5);
        fires.push(rec.borrow().log.len() - before);
        visible.push(player.was_event_triggered(cue));
    }
    assert_eq!(fires, vec![1, 0, 0, 1, 0, 0, 0, 1, 0]);
    // update() swaps first, so a fire is readable during the following tick only
    assert_eq!(
        visible,
        vec![false, true, false, false, true, false, false, false, true]
    );
}
