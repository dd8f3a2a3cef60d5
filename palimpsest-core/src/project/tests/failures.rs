use palimpsest_types::codec::Encode;
use palimpsest_types::{Command, CommandKind};

use super::*;
use crate::error::ProjectError;
use crate::store::keys;

#[test]
fn test_failed_commit_changes_nothing() {
    let (mut project, store) = memory_project(&alice());
    let track = project.insert_track(None, None).unwrap();
    project.set_sample_rate(48_000).unwrap();

    let state = project.state().clone();
    let entries = store.snapshot();
    let revisions = project.last_revision();
    let cursor = project.undo_cursor();

    store.fail_next_commits(1);
    let err = project.delete_track(&track).unwrap_err();
    assert!(err.is_retryable());
    store.fail_next_commits(1);
    assert!(project.undo().is_err());
    store.fail_next_commits(1);
    assert!(project.insert_track(None, Some(track)).is_err());

    assert_eq!(project.state(), &state);
    assert_eq!(store.snapshot(), entries);
    assert_eq!(project.last_revision(), revisions);
    assert_eq!(project.undo_cursor(), cursor);
    assert_eq!(track_ids(&mut project), vec![track]);

    // The same operation succeeds once the store recovers.
    project.delete_track(&track).unwrap();
    assert!(project.tracks().is_empty());
    assert_eq!(project.last_revision(), revisions + 1);
}

#[test]
fn test_missing_header_is_invalid_format() {
    let store = MemoryStore::new();
    let result = Project::open_in(Box::new(store), &alice(), IdGenerator::seeded(1));
    assert!(matches!(result, Err(ProjectError::InvalidFormat(_))));
}

#[test]
fn test_create_refuses_existing_project() {
    let (project, store) = memory_project(&alice());
    project.close().unwrap();
    let result = Project::create_in(
        Box::new(store),
        project_id(),
        &alice(),
        &ProjectSettings::default(),
        IdGenerator::seeded(2),
    );
    assert!(matches!(result, Err(ProjectError::InvalidArgument(_))));
}

#[test]
fn test_unknown_command_tag_is_invalid_format() {
    let (mut project, store) = memory_project(&alice());
    project.insert_track(None, None).unwrap();
    let command = project.commands().next().unwrap().clone();
    project.close().unwrap();

    let key = keys::command(command.revision, &command.id);
    let mut bytes = command.to_bytes();
    bytes[0] = 0xee;
    store.poke(&key, bytes);

    let result = Project::open_in(Box::new(store), &alice(), IdGenerator::seeded(2));
    assert!(matches!(result, Err(ProjectError::InvalidFormat(msg)) if msg.contains("unknown command tag")));
}

#[test]
fn test_truncated_command_is_invalid_format() {
    let (mut project, store) = memory_project(&alice());
    project.set_sample_rate(48_000).unwrap();
    let command = project.commands().next().unwrap().clone();
    project.close().unwrap();

    let key = keys::command(command.revision, &command.id);
    let bytes = command.to_bytes();
    store.poke(&key, bytes[..bytes.len() - 3].to_vec());

    let result = Project::open_in(Box::new(store), &alice(), IdGenerator::seeded(2));
    assert!(matches!(result, Err(ProjectError::InvalidFormat(_))));
}

#[test]
fn test_records_disagreeing_with_history_are_rejected() {
    let (mut project, store) = memory_project(&alice());
    let track = project.insert_track(None, None).unwrap();
    project.close().unwrap();

    // Drop the materialized track record but keep its command.
    let key = keys::record::<palimpsest_types::Track>(&track);
    let mut entries = store.snapshot();
    entries.remove(&key);
    let tampered = MemoryStore::new();
    for (k, v) in entries {
        tampered.poke(&k, v);
    }

    let result = Project::open_in(Box::new(tampered), &alice(), IdGenerator::seeded(2));
    assert!(matches!(result, Err(ProjectError::InvalidFormat(msg)) if msg.contains("track")));
}

#[test]
fn test_command_that_does_not_apply_is_invalid_format() {
    let (project, store) = memory_project(&alice());
    project.close().unwrap();

    // An undo marker whose target was never logged.
    let orphan = Command {
        id: WideId::from_bytes([0x0d; 32]),
        user_id: alice().id,
        revision: 1,
        kind: CommandKind::Undo {
            other: WideId::from_bytes([0x0e; 32]),
        },
    };
    store.poke(&keys::command(1, &orphan.id), orphan.to_bytes());

    let result = Project::open_in(Box::new(store), &alice(), IdGenerator::seeded(2));
    assert!(matches!(result, Err(ProjectError::InvalidFormat(_))));
}
