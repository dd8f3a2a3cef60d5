use palimpsest_types::{CommandKind, SortKey};

use super::*;
use crate::error::ProjectError;

#[test]
fn test_insert_between_neighbours() {
    let (mut project, _store) = memory_project(&alice());
    let a = project.insert_track(None, None).unwrap();
    let c = project.insert_track(None, None).unwrap();
    let b = project.insert_track(Some(a), Some(c)).unwrap();
    let first = project.insert_track(None, Some(a)).unwrap();
    let d = project.insert_track(Some(c), None).unwrap();
    assert_eq!(track_ids(&mut project), vec![first, a, b, c, d]);

    assert!(matches!(
        project.insert_track(Some(a), Some(d)),
        Err(ProjectError::InvalidArgument(_))
    ));
}

#[test]
fn test_repeated_insertion_keeps_prior_order() {
    let (mut project, _store) = memory_project(&alice());
    let head = project.insert_track(None, None).unwrap();
    let tail = project.insert_track(None, None).unwrap();

    // Always insert directly after `head`, so each new track lands first.
    let mut expected_middle = Vec::new();
    for _ in 0..40 {
        let id = project.insert_track(Some(head), None).unwrap();
        expected_middle.insert(0, id);
    }

    let mut expected = vec![head];
    expected.extend(expected_middle);
    expected.push(tail);
    assert_eq!(track_ids(&mut project), expected);
}

#[test]
fn test_exhausted_keys_are_renumbered_in_one_command() {
    let (mut project, _store) = memory_project(&alice());
    let head = project.insert_track(None, None).unwrap();
    let mut last = project.insert_track(None, None).unwrap();

    // Halving the gap below `last` runs out of digits well before 400 steps.
    let mut renumbering = None;
    for _ in 0..400 {
        let before_keys: Vec<(WideId, SortKey)> = project
            .tracks()
            .into_iter()
            .map(|t| (t.id, t.sort_key.clone()))
            .collect();
        last = project.insert_track(Some(head), Some(last)).unwrap();
        let cmd = project.commands().last().unwrap();
        if let CommandKind::AddTrack { renumbered, .. } = &cmd.kind {
            if !renumbered.is_empty() {
                renumbering = Some(before_keys);
                break;
            }
        }
    }
    let before_keys = renumbering.expect("sort keys never ran out");

    let tracks = project.tracks();
    assert!(tracks.windows(2).all(|w| w[0].sort_key < w[1].sort_key));
    assert!(tracks
        .iter()
        .all(|t| t.sort_key.digits().len() <= SortKey::MAX_DIGITS));
    assert_eq!(tracks[0].id, head);
    assert_eq!(tracks[1].id, last);

    // Undo restores both the previous keys and the previous membership.
    assert!(project.undo().unwrap());
    let restored: Vec<(WideId, SortKey)> = project
        .tracks()
        .into_iter()
        .map(|t| (t.id, t.sort_key.clone()))
        .collect();
    assert_eq!(restored, before_keys);
}
