//! Forward and inverse effects of each command variant.
//!
//! Both directions mutate the in-memory [`ProjectState`] and stage the
//! matching record writes in a [`WriteBatch`]. Entities are looked up by id
//! on every call. [`check_forward`] reports commands that would leave a
//! dangling reference or touch a missing entity; `apply_command` runs it
//! first, so reaching an inconsistent state inside `apply` means history and
//! state have diverged (a bug or a corrupt file), and it panics.

use palimpsest_types::{
    AudioClipSegment, Command, CommandKind, Encode, Entity, EntityTable, SortKey, Track, WideId,
};

use super::history::CommandLog;
use super::state::ProjectState;
use crate::store::keys::{self, Record};
use crate::store::WriteBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    fn flip(self) -> Self {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
        }
    }
}

pub(crate) fn apply_forward(
    kind: &CommandKind,
    state: &mut ProjectState,
    log: &CommandLog,
    batch: &mut WriteBatch,
) {
    apply(kind, Direction::Forward, state, log, batch);
}

pub(crate) fn apply_inverse(
    kind: &CommandKind,
    state: &mut ProjectState,
    log: &CommandLog,
    batch: &mut WriteBatch,
) {
    apply(kind, Direction::Inverse, state, log, batch);
}

fn apply(
    kind: &CommandKind,
    direction: Direction,
    state: &mut ProjectState,
    log: &CommandLog,
    batch: &mut WriteBatch,
) {
    use Direction::*;

    match (kind, direction) {
        (CommandKind::Undo { other }, _) => {
            let target = resolve(log, other);
            apply(&target.kind, direction.flip(), state, log, batch);
        }
        (CommandKind::Redo { other }, _) => {
            let target = resolve(log, other);
            apply(&target.kind, direction, state, log, batch);
        }

        (CommandKind::AddTrack { track, renumbered }, Forward) => {
            for change in renumbered {
                set_track_key(state, &change.id, &change.new, batch);
            }
            insert(&mut state.tracks, track.clone(), batch);
        }
        (CommandKind::AddTrack { track, renumbered }, Inverse) => {
            remove(&mut state.tracks, &track.id, batch);
            for change in renumbered.iter().rev() {
                set_track_key(state, &change.id, &change.old, batch);
            }
        }

        (CommandKind::DeleteTrack { track, segments }, Forward) => {
            for segment in segments {
                remove(&mut state.segments, &segment.id, batch);
            }
            remove(&mut state.tracks, &track.id, batch);
        }
        (CommandKind::DeleteTrack { track, segments }, Inverse) => {
            insert(&mut state.tracks, track.clone(), batch);
            for segment in segments {
                insert(&mut state.segments, segment.clone(), batch);
            }
        }

        (CommandKind::AddAudioAsset { asset }, Forward) => {
            insert(&mut state.audio_assets, asset.clone(), batch);
        }
        (CommandKind::AddAudioAsset { asset }, Inverse) => {
            remove(&mut state.audio_assets, &asset.id, batch);
        }

        (CommandKind::AddAudioClip { clip }, Forward) => {
            insert(&mut state.audio_clips, clip.clone(), batch);
        }
        (CommandKind::AddAudioClip { clip }, Inverse) => {
            remove(&mut state.audio_clips, &clip.id, batch);
        }

        (CommandKind::AddAudioClipSegment { segment }, Forward) => {
            insert(&mut state.segments, segment.clone(), batch);
        }
        (CommandKind::AddAudioClipSegment { segment }, Inverse) => {
            remove(&mut state.segments, &segment.id, batch);
        }

        (CommandKind::ChangeSampleRate { old, new }, _) => {
            state.settings.sample_rate = match direction {
                Forward => *new,
                Inverse => *old,
            };
            batch.put_record(keys::SETTINGS.to_vec(), &state.settings);
        }
        (CommandKind::ChangeChannelLayout { old, new }, _) => {
            state.settings.channel_layout = match direction {
                Forward => new.clone(),
                Inverse => old.clone(),
            };
            batch.put_record(keys::SETTINGS.to_vec(), &state.settings);
        }
        (CommandKind::ChangeMetadata { old, new }, _) => {
            state.settings.metadata = match direction {
                Forward => new.clone(),
                Inverse => old.clone(),
            };
            batch.put_record(keys::SETTINGS.to_vec(), &state.settings);
        }
    }
}

/// Whether `kind` can be applied to `state` without touching a missing
/// entity or leaving a reference dangling.
pub(crate) fn check_forward(
    kind: &CommandKind,
    state: &ProjectState,
    log: &CommandLog,
) -> Result<(), String> {
    check(kind, Direction::Forward, state, log)
}

fn check(
    kind: &CommandKind,
    direction: Direction,
    state: &ProjectState,
    log: &CommandLog,
) -> Result<(), String> {
    use Direction::*;

    match (kind, direction) {
        (CommandKind::Undo { other }, _) | (CommandKind::Redo { other }, _) => {
            let target = log
                .get(other)
                .ok_or_else(|| format!("command {} is not in history", other.short()))?;
            let direction = match kind {
                CommandKind::Undo { .. } => direction.flip(),
                _ => direction,
            };
            check(&target.kind, direction, state, log)
        }

        (CommandKind::AddTrack { track, renumbered }, Forward) => {
            absent(&state.tracks, &track.id)?;
            renumbered
                .iter()
                .try_for_each(|change| present(&state.tracks, &change.id))
        }
        (CommandKind::AddTrack { track, renumbered }, Inverse) => {
            present(&state.tracks, &track.id)?;
            track_unused(state, &track.id, &[])?;
            renumbered
                .iter()
                .try_for_each(|change| present(&state.tracks, &change.id))
        }

        (CommandKind::DeleteTrack { track, segments }, Forward) => {
            present(&state.tracks, &track.id)?;
            segments
                .iter()
                .try_for_each(|s| present(&state.segments, &s.id))?;
            track_unused(state, &track.id, segments)
        }
        (CommandKind::DeleteTrack { track, segments }, Inverse) => {
            absent(&state.tracks, &track.id)?;
            segments.iter().try_for_each(|s| {
                absent(&state.segments, &s.id)?;
                present(&state.audio_clips, &s.audio_clip_id)
            })
        }

        (CommandKind::AddAudioAsset { asset }, Forward) => absent(&state.audio_assets, &asset.id),
        (CommandKind::AddAudioAsset { asset }, Inverse) => {
            present(&state.audio_assets, &asset.id)?;
            match state.audio_clips.iter().find(|c| c.audio_asset_id == asset.id) {
                Some(clip) => Err(format!("audio asset is used by clip {:?}", clip.name)),
                None => Ok(()),
            }
        }

        (CommandKind::AddAudioClip { clip }, Forward) => {
            absent(&state.audio_clips, &clip.id)?;
            present(&state.audio_assets, &clip.audio_asset_id)
        }
        (CommandKind::AddAudioClip { clip }, Inverse) => {
            present(&state.audio_clips, &clip.id)?;
            match state.segments.iter().find(|s| s.audio_clip_id == clip.id) {
                Some(segment) => Err(format!(
                    "audio clip {:?} is placed as segment {}",
                    clip.name,
                    segment.id.short()
                )),
                None => Ok(()),
            }
        }

        (CommandKind::AddAudioClipSegment { segment }, Forward) => {
            absent(&state.segments, &segment.id)?;
            present(&state.audio_clips, &segment.audio_clip_id)?;
            present(&state.tracks, &segment.track_id)
        }
        (CommandKind::AddAudioClipSegment { segment }, Inverse) => {
            present(&state.segments, &segment.id)
        }

        (CommandKind::ChangeSampleRate { .. }, _)
        | (CommandKind::ChangeChannelLayout { .. }, _)
        | (CommandKind::ChangeMetadata { .. }, _) => Ok(()),
    }
}

fn present<T: Entity>(table: &EntityTable<T>, id: &WideId) -> Result<(), String> {
    if table.contains(id) {
        Ok(())
    } else {
        Err(format!("{} {} does not exist", T::KIND, id.short()))
    }
}

fn absent<T: Entity>(table: &EntityTable<T>, id: &WideId) -> Result<(), String> {
    if table.contains(id) {
        Err(format!("{} {} already exists", T::KIND, id.short()))
    } else {
        Ok(())
    }
}

/// No segment other than those in `leaving` is placed on `track`.
fn track_unused(
    state: &ProjectState,
    track: &WideId,
    leaving: &[AudioClipSegment],
) -> Result<(), String> {
    let other = state
        .segments
        .iter()
        .find(|s| s.track_id == *track && !leaving.iter().any(|l| l.id == s.id));
    match other {
        Some(segment) => Err(format!(
            "track {} holds segment {}",
            track.short(),
            segment.id.short()
        )),
        None => Ok(()),
    }
}

fn resolve<'a>(log: &'a CommandLog, id: &WideId) -> &'a Command {
    match log.get(id) {
        Some(cmd) => cmd,
        None => violated(format_args!("command {} is not in history", id)),
    }
}

fn insert<T>(table: &mut EntityTable<T>, value: T, batch: &mut WriteBatch)
where
    T: Record + Encode,
{
    let id = value.id();
    if table.contains(&id) {
        violated(format_args!("{} {} already exists", T::KIND, id));
    }
    batch.put_record(keys::record::<T>(&id), &value);
    table.insert(value);
}

fn remove<T: Record>(table: &mut EntityTable<T>, id: &WideId, batch: &mut WriteBatch) {
    if table.remove(id).is_none() {
        violated(format_args!("{} {} does not exist", T::KIND, id));
    }
    batch.delete(keys::record::<T>(id));
}

fn set_track_key(state: &mut ProjectState, id: &WideId, key: &SortKey, batch: &mut WriteBatch) {
    let Some(track) = state.tracks.get_mut(id) else {
        violated(format_args!("track {} does not exist", id));
    };
    track.sort_key = key.clone();
    batch.put_record(keys::record::<Track>(id), &*track);
}

fn violated(what: std::fmt::Arguments<'_>) -> ! {
    panic!("project history does not match state: {}", what)
}

#[cfg(test)]
mod tests {
    use palimpsest_types::{
        AudioAsset, AudioClip, AudioClipSegment, ChannelLayout, Command, ProjectMetadata,
        SortKeyChange, Track,
    };

    use super::*;
    use crate::project::state::Settings;
    use crate::store::WriteOp;

    fn id(n: u8) -> WideId {
        WideId::from_bytes([n; 32])
    }

    fn track(n: u8, key: SortKey) -> Track {
        Track {
            id: id(n),
            name: format!("Track {}", n),
            sort_key: key,
        }
    }

    fn segment(n: u8, track: u8) -> AudioClipSegment {
        AudioClipSegment {
            id: id(n),
            audio_clip_id: id(30),
            track_id: id(track),
            start: 0,
            end: 100,
            pos: n as f64,
        }
    }

    /// A state with two tracks, a clip, and two segments on track 1.
    fn populated() -> ProjectState {
        let mut state = ProjectState::new(Settings {
            sample_rate: 44_100,
            channel_layout: ChannelLayout::stereo(),
            metadata: ProjectMetadata::default(),
        });
        let keys = SortKey::evenly_spaced(2);
        state.tracks.insert(track(1, keys[0].clone()));
        state.tracks.insert(track(2, keys[1].clone()));
        state.audio_assets.insert(AudioAsset {
            id: id(20),
            path: "a.wav".into(),
            sha256: [1; 32],
        });
        state.audio_clips.insert(AudioClip {
            id: id(30),
            audio_asset_id: id(20),
            name: "a".into(),
        });
        state.segments.insert(segment(40, 1));
        state.segments.insert(segment(41, 1));
        state
    }

    fn every_variant(state: &ProjectState) -> Vec<CommandKind> {
        let keys = SortKey::evenly_spaced(3);
        vec![
            CommandKind::AddTrack {
                track: track(3, keys[1].clone()),
                renumbered: vec![
                    SortKeyChange {
                        id: id(1),
                        old: state.tracks.get(&id(1)).unwrap().sort_key.clone(),
                        new: keys[0].clone(),
                    },
                    SortKeyChange {
                        id: id(2),
                        old: state.tracks.get(&id(2)).unwrap().sort_key.clone(),
                        new: keys[2].clone(),
                    },
                ],
            },
            CommandKind::DeleteTrack {
                track: state.tracks.get(&id(1)).unwrap().clone(),
                segments: vec![segment(40, 1), segment(41, 1)],
            },
            CommandKind::AddAudioAsset {
                asset: AudioAsset {
                    id: id(21),
                    path: "b.wav".into(),
                    sha256: [2; 32],
                },
            },
            CommandKind::AddAudioClip {
                clip: AudioClip {
                    id: id(31),
                    audio_asset_id: id(20),
                    name: "b".into(),
                },
            },
            CommandKind::AddAudioClipSegment {
                segment: segment(42, 2),
            },
            CommandKind::ChangeSampleRate {
                old: 44_100,
                new: 96_000,
            },
            CommandKind::ChangeChannelLayout {
                old: ChannelLayout::stereo(),
                new: ChannelLayout::surround_7_1(),
            },
            CommandKind::ChangeMetadata {
                old: ProjectMetadata::default(),
                new: ProjectMetadata {
                    title: "Tides".to_string(),
                    artist: "Harbour Choir".to_string(),
                    year: Some(1998),
                    ..Default::default()
                },
            },
        ]
    }

    #[test]
    fn forward_inverse_forward_equals_forward() {
        let base = populated();
        let log = CommandLog::new();
        for kind in every_variant(&base) {
            let mut once = base.clone();
            apply_forward(&kind, &mut once, &log, &mut WriteBatch::new());
            assert_ne!(once, base, "{} changed nothing", kind.description());

            let mut thrice = base.clone();
            apply_forward(&kind, &mut thrice, &log, &mut WriteBatch::new());
            apply_inverse(&kind, &mut thrice, &log, &mut WriteBatch::new());
            assert_eq!(thrice, base, "inverse of {} did not restore", kind.description());
            apply_forward(&kind, &mut thrice, &log, &mut WriteBatch::new());
            assert_eq!(thrice, once, "{} is not repeatable", kind.description());
        }
    }

    #[test]
    fn undo_and_redo_markers_delegate() {
        let base = populated();
        let mut log = CommandLog::new();
        let add = CommandKind::AddAudioClipSegment {
            segment: segment(42, 2),
        };
        log.push(Command {
            id: id(90),
            user_id: id(99),
            revision: 1,
            kind: add.clone(),
        });

        let mut state = base.clone();
        apply_forward(&add, &mut state, &log, &mut WriteBatch::new());
        let added = state.clone();

        apply_forward(&CommandKind::Undo { other: id(90) }, &mut state, &log, &mut WriteBatch::new());
        assert_eq!(state, base);
        apply_forward(&CommandKind::Redo { other: id(90) }, &mut state, &log, &mut WriteBatch::new());
        assert_eq!(state, added);
        apply_inverse(&CommandKind::Redo { other: id(90) }, &mut state, &log, &mut WriteBatch::new());
        assert_eq!(state, base);
        apply_inverse(&CommandKind::Undo { other: id(90) }, &mut state, &log, &mut WriteBatch::new());
        assert_eq!(state, added);
    }

    #[test]
    fn delete_track_stages_every_removed_record() {
        let mut state = populated();
        let kind = CommandKind::DeleteTrack {
            track: state.tracks.get(&id(1)).unwrap().clone(),
            segments: vec![segment(40, 1), segment(41, 1)],
        };
        let mut batch = WriteBatch::new();
        apply_forward(&kind, &mut state, &CommandLog::new(), &mut batch);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.get(&keys::record::<Track>(&id(1))), Some(&WriteOp::Delete));
        assert_eq!(
            batch.get(&keys::record::<AudioClipSegment>(&id(41))),
            Some(&WriteOp::Delete)
        );
        assert!(state.segments.is_empty());
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn adding_existing_id_panics() {
        let mut state = populated();
        let kind = CommandKind::AddAudioClipSegment {
            segment: segment(40, 1),
        };
        apply_forward(&kind, &mut state, &CommandLog::new(), &mut WriteBatch::new());
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn removing_missing_id_panics() {
        let mut state = populated();
        let kind = CommandKind::AddAudioClip {
            clip: AudioClip {
                id: id(77),
                audio_asset_id: id(20),
                name: "ghost".into(),
            },
        };
        apply_inverse(&kind, &mut state, &CommandLog::new(), &mut WriteBatch::new());
    }

    #[test]
    fn check_accepts_every_variant_on_matching_state() {
        let state = populated();
        let log = CommandLog::new();
        for kind in every_variant(&state) {
            assert_eq!(check_forward(&kind, &state, &log), Ok(()), "{}", kind.description());
        }
    }

    #[test]
    fn check_rejects_dangling_references() {
        let state = populated();
        let log = CommandLog::new();

        // Track 1 holds segment 41, which the snapshot does not include.
        let partial_delete = CommandKind::DeleteTrack {
            track: state.tracks.get(&id(1)).unwrap().clone(),
            segments: vec![segment(40, 1)],
        };
        let err = check_forward(&partial_delete, &state, &log).unwrap_err();
        assert!(err.contains("holds segment"), "{}", err);

        let orphan = CommandKind::AddAudioClipSegment {
            segment: AudioClipSegment {
                track_id: id(9),
                ..segment(42, 2)
            },
        };
        assert!(check_forward(&orphan, &state, &log).is_err());

        // Undoing the clip's creation would strand segments 40 and 41.
        let mut log = CommandLog::new();
        log.push(Command {
            id: id(90),
            user_id: id(99),
            revision: 1,
            kind: CommandKind::AddAudioClip {
                clip: state.audio_clips.get(&id(30)).unwrap().clone(),
            },
        });
        let undo = CommandKind::Undo { other: id(90) };
        let err = check_forward(&undo, &state, &log).unwrap_err();
        assert!(err.contains("is placed as segment"), "{}", err);
    }
}
