use approx::assert_relative_eq;
use vizij_blend_tree_core::{
    EventId, NodeId, NodeSyncProfile, SyncPoint, TimelineTrack, TreeSyncProfile,
};

fn leaf(owner: u32, slot: usize, time_remaining: f32) -> NodeSyncProfile {
    let mut p = NodeSyncProfile::new(Some(NodeId(owner)));
    p.set_sync_point(slot, time_remaining);
    p.commit();
    p
}

#[test]
fn first_submission_wins() {
    let mut profile = TreeSyncProfile::default();
    profile.submit(EventId(0), 0.3);
    profile.submit(EventId(1), 0.6);
    profile.submit(EventId(0), 0.9);
    assert_eq!(profile.len(), 2);
    assert_eq!(profile.progress_of(EventId(0)), Some(0.3));
    let order: Vec<EventId> = profile.iter().map(|(e, _)| e).collect();
    assert_eq!(order, vec![EventId(0), EventId(1)]);
}

#[test]
fn merge_two_contributors_same_slot() {
    let mut merged = NodeSyncProfile::new(Some(NodeId(0)));
    merged.merge_with(&leaf(1, 0, 1.0), 0.5);
    merged.merge_with(&leaf(2, 0, 2.0), 0.5);
    merged.commit();

    assert_eq!(merged.nodes_count(), 1);
    assert_relative_eq!(merged.time_remaining(0).unwrap_or(0.0), 1.5, epsilon = 1e-6);
    let speeds: Vec<f32> = merged
        .contributions()
        .iter()
        .map(|c| c.playback_speed)
        .collect();
    assert_relative_eq!(speeds[0], 1.0 / 1.5, epsilon = 1e-4);
    assert_relative_eq!(speeds[1], 2.0 / 1.5, epsilon = 1e-4);
    assert_eq!(merged.contributions()[0].node, Some(NodeId(1)));
    assert_eq!(merged.contributions()[1].node, Some(NodeId(2)));
}

#[test]
fn merge_is_weighted_mean_and_scale_invariant() {
    let a = leaf(1, 3, 0.4);
    let b = leaf(2, 3, 1.2);

    let mut p = NodeSyncProfile::new(None);
    p.merge_with(&a, 0.25);
    p.merge_with(&b, 0.75);
    p.commit();
    let expected = (0.25 * 0.4 + 0.75 * 1.2) / (0.25 + 0.75);
    assert_relative_eq!(p.time_remaining(3).unwrap_or(0.0), expected, epsilon = 1e-6);

    let mut scaled = NodeSyncProfile::new(None);
    scaled.merge_with(&a, 2.5);
    scaled.merge_with(&b, 7.5);
    scaled.commit();
    assert_relative_eq!(
        scaled.time_remaining(3).unwrap_or(0.0),
        p.time_remaining(3).unwrap_or(0.0),
        epsilon = 1e-5
    );
}

#[test]
fn single_contributor_passes_through() {
    let mut p = NodeSyncProfile::new(None);
    p.merge_with(&leaf(1, 2, 0.8), 0.3);
    p.commit();
    assert_relative_eq!(p.time_remaining(2).unwrap_or(0.0), 0.8, epsilon = 1e-6);
    assert_relative_eq!(p.contributions()[0].playback_speed, 1.0, epsilon = 1e-6);
}

#[test]
fn different_slots_do_not_interact() {
    let mut p = NodeSyncProfile::new(None);
    p.merge_with(&leaf(1, 0, 1.0), 0.5);
    p.merge_with(&leaf(2, 1, 2.0), 0.5);
    p.commit();
    assert_eq!(p.nodes_count(), 2);
    assert_relative_eq!(p.time_remaining(0).unwrap_or(0.0), 1.0, epsilon = 1e-6);
    assert_relative_eq!(p.time_remaining(1).unwrap_or(0.0), 2.0, epsilon = 1e-6);
    for c in p.contributions() {
        assert_relative_eq!(c.playback_speed, 1.0, epsilon = 1e-6);
    }
}

#[test]
fn partially_overlapping_siblings_align_on_shared_event() {
    // first child knows events 0 and 1, second only event 1
    let mut a = NodeSyncProfile::new(Some(NodeId(1)));
    a.set_sync_point(1, 0.5);
    a.set_sync_point(0, 1.5);
    a.commit();
    let b = leaf(2, 1, 1.5);

    let mut p = NodeSyncProfile::new(None);
    p.merge_with(&a, 0.5);
    p.merge_with(&b, 0.5);
    p.commit();

    assert_relative_eq!(p.time_remaining(1).unwrap_or(0.0), 1.0, epsilon = 1e-6);
    assert_relative_eq!(p.time_remaining(0).unwrap_or(0.0), 1.5, epsilon = 1e-6);
    assert_eq!(p.contributions()[0].slot, Some(1));
    assert_relative_eq!(p.contributions()[0].playback_speed, 0.5, epsilon = 1e-6);
    assert_relative_eq!(p.contributions()[1].playback_speed, 1.5, epsilon = 1e-6);
}

#[test]
fn merged_profiles_nest() {
    let mut inner = NodeSyncProfile::new(Some(NodeId(3)));
    inner.merge_with(&leaf(1, 0, 1.0), 0.5);
    inner.merge_with(&leaf(2, 0, 3.0), 0.5);
    inner.commit();

    let mut outer = NodeSyncProfile::new(Some(NodeId(0)));
    outer.merge_with(&inner, 1.0);
    outer.merge_with(&leaf(4, 0, 4.0), 1.0);
    outer.commit();

    assert_relative_eq!(outer.time_remaining(0).unwrap_or(0.0), 3.0, epsilon = 1e-6);
    assert_eq!(outer.contributions()[0].node, Some(NodeId(3)));
    assert_relative_eq!(outer.contributions()[0].playback_speed, 2.0 / 3.0, epsilon = 1e-6);
}

#[test]
fn parked_non_looping_clip_does_not_rush_its_sibling() {
    let step = EventId(0);
    let mut parked = TimelineTrack::new(vec![SyncPoint::new(step, 1.0)], 1.0, false);
    parked.update(3.0);
    let mut live = TimelineTrack::new(vec![SyncPoint::new(step, 0.5)], 2.0, true);
    live.reset_to(0.0);

    let mut profile = TreeSyncProfile::default();
    profile.submit(step, 0.0);

    let mut a = NodeSyncProfile::new(Some(NodeId(1)));
    parked.synchronize_to(&profile, &mut a);
    a.commit();
    assert_eq!(a.time_remaining(0), Some(0.0));
    let mut b = NodeSyncProfile::new(Some(NodeId(2)));
    live.synchronize_to(&profile, &mut b);
    b.commit();

    let mut merged = NodeSyncProfile::new(Some(NodeId(0)));
    merged.merge_with(&a, 0.5);
    merged.merge_with(&b, 0.5);
    merged.commit();

    assert_relative_eq!(merged.time_remaining(0).unwrap_or(0.0), 1.0, epsilon = 1e-6);
    assert_eq!(merged.contributions()[0].slot, None);
    assert_relative_eq!(merged.contributions()[0].playback_speed, 1.0, epsilon = 1e-6);
    assert_relative_eq!(merged.contributions()[1].playback_speed, 1.0, epsilon = 1e-6);
}
