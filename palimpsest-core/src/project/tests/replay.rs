use palimpsest_types::ChannelLayout;

use super::*;
use crate::store::SqliteStore;

/// Runs a mixed edit session and returns the ids it created.
fn edit_session(project: &mut Project, samples: &Path) -> Vec<WideId> {
    let drums = project.insert_track(None, None).unwrap();
    let bass = project.insert_track(None, None).unwrap();
    let keys = project.insert_track(Some(drums), Some(bass)).unwrap();

    let kick = write_sample(samples, "kick.wav", b"RIFF kick");
    let asset = project.add_audio_asset(&kick).unwrap();
    let clip = project.add_audio_clip(&asset, "kick").unwrap();
    let seg1 = project
        .add_audio_clip_segment(&clip, &drums, 0, 4_410, 0.0)
        .unwrap();
    let seg2 = project
        .add_audio_clip_segment(&clip, &drums, 100, 4_410, 1.5)
        .unwrap();

    project.set_sample_rate(48_000).unwrap();
    project
        .set_channel_layout(ChannelLayout::surround_5_1())
        .unwrap();
    project.undo().unwrap();
    project.undo().unwrap();
    project.redo().unwrap();
    project.delete_track(&keys).unwrap();
    project.delete_track(&drums).unwrap();
    project.undo().unwrap();

    vec![drums, bass, keys, asset, clip, seg1, seg2]
}

#[test]
fn test_replay_reproduces_state_and_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_project_path(&dir);

    let store = SqliteStore::create(&path).unwrap();
    let mut project = Project::create_in(
        Box::new(store),
        project_id(),
        &alice(),
        &ProjectSettings::default(),
        IdGenerator::seeded(11),
    )
    .unwrap();
    let ids = edit_session(&mut project, dir.path());

    let state = project.state().clone();
    let undo = project.undo_stack().clone();
    let commands: Vec<_> = project.commands().cloned().collect();
    project.close().unwrap();

    let mut reopened = Project::open_in(
        Box::new(SqliteStore::open(&path).unwrap()),
        &alice(),
        IdGenerator::seeded(12),
    )
    .unwrap();
    assert_eq!(reopened.state(), &state);
    assert_eq!(reopened.undo_stack(), &undo);
    assert_eq!(reopened.commands().cloned().collect::<Vec<_>>(), commands);

    // drums came back with both segments, ordered by position.
    let segments: Vec<WideId> = reopened
        .track_segments(&ids[0])
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(segments, vec![ids[5], ids[6]]);
    assert_eq!(reopened.sample_rate(), 48_000);
    assert_eq!(reopened.channel_layout(), &ChannelLayout::stereo());

    // The restored redo branch is still usable after reopening.
    assert!(reopened.redo().unwrap());
    assert!(reopened.track(&ids[0]).is_none());
    assert!(reopened.track_segments(&ids[0]).is_empty());
}

#[test]
fn test_path_api_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_project_path(&dir);

    let mut project = Project::create(&path, project_id(), &alice()).unwrap();
    let track = project.insert_track(None, None).unwrap();
    project.close().unwrap();

    let mut project = Project::open(&path, &alice()).unwrap();
    assert_eq!(project.id(), project_id());
    assert_eq!(track_ids(&mut project), vec![track]);
    assert!(project.can_undo());
    project.close().unwrap();
}

#[test]
fn test_failed_create_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_project_path(&dir);

    let broken = ProjectSettings {
        sample_rate: 0,
        ..ProjectSettings::default()
    };
    let result = Project::create_with_settings(&path, project_id(), &alice(), &broken);
    assert!(matches!(result, Err(crate::error::ProjectError::InvalidArgument(_))));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // The same path is usable right away.
    let project =
        Project::create_with_settings(&path, project_id(), &alice(), &ProjectSettings::default())
            .unwrap();
    project.close().unwrap();
    assert!(Project::open(&path, &alice()).is_ok());
}

#[test]
fn test_undo_stacks_are_per_user() {
    let (mut project, store) = memory_project(&alice());
    let a1 = project.insert_track(None, None).unwrap();
    project.close().unwrap();

    let mut project = reopen(&store, &bob(), 2);
    assert!(!project.can_undo(), "bob inherited alice's undo history");
    let b1 = project.insert_track(None, None).unwrap();
    let b2 = project.insert_track(None, None).unwrap();
    assert!(project.undo().unwrap());
    assert_eq!(track_ids(&mut project), vec![a1, b1]);
    project.close().unwrap();

    let mut project = reopen(&store, &alice(), 3);
    assert_eq!(project.undo_cursor(), 1);
    assert_eq!(project.undo_stack().entries().len(), 1);
    assert!(!project.can_redo());
    assert!(project.undo().unwrap());
    assert_eq!(track_ids(&mut project), vec![b1]);
    assert!(!project.can_undo());
    project.close().unwrap();

    let mut project = reopen(&store, &bob(), 4);
    assert_eq!(project.undo_cursor(), 1);
    assert!(project.redo().unwrap());
    assert_eq!(track_ids(&mut project), vec![b1, b2]);

    let names: Vec<String> = project.users().into_iter().map(|u| u.name.clone()).collect();
    assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
}

#[test]
fn test_undo_conflicting_with_other_user_is_rejected() {
    let (mut project, store) = memory_project(&alice());
    let track = project.insert_track(None, None).unwrap();
    project.close().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let sample = write_sample(dir.path(), "snare.wav", b"snare");
    let mut project = reopen(&store, &bob(), 2);
    let asset = project.add_audio_asset(&sample).unwrap();
    let clip = project.add_audio_clip(&asset, "snare").unwrap();
    project
        .add_audio_clip_segment(&clip, &track, 0, 10, 0.0)
        .unwrap();
    project.close().unwrap();

    // Undoing the track's creation would strand bob's segment.
    let mut project = reopen(&store, &alice(), 3);
    let before = project.state().clone();
    assert!(matches!(
        project.undo(),
        Err(crate::error::ProjectError::Conflict(_))
    ));
    assert_eq!(project.state(), &before);
    assert!(project.can_undo());
}
