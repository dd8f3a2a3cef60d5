//! Lazily rebuilt views over the canonical tables.
//!
//! Views hold ids, never references, so they cannot disagree with the
//! tables for longer than it takes to mark them dirty. A committed command
//! marks the views it touches; the next read rebuilds them.

use std::collections::BTreeMap;

use palimpsest_types::{CommandKind, CommandTag, ContentDigest, WideId};

use super::history::CommandLog;
use super::state::ProjectState;

#[derive(Debug)]
pub struct DerivedView<T> {
    value: T,
    dirty: bool,
}

impl<T: Default> Default for DerivedView<T> {
    fn default() -> Self {
        Self {
            value: T::default(),
            dirty: true,
        }
    }
}

impl<T> DerivedView<T> {
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuild with `compute` if dirty.
    pub fn refresh(&mut self, compute: impl FnOnce() -> T) {
        if self.dirty {
            self.value = compute();
            self.dirty = false;
        }
    }

    /// Current value; call [`refresh`](Self::refresh) first.
    pub fn value(&self) -> &T {
        &self.value
    }
}

#[derive(Debug, Default)]
pub struct Views {
    /// Track ids by sort key.
    pub tracks: DerivedView<Vec<WideId>>,
    /// Segment ids per track id, by timeline position.
    pub segments_by_track: DerivedView<BTreeMap<WideId, Vec<WideId>>>,
    /// User ids by name.
    pub users: DerivedView<Vec<WideId>>,
    /// Asset ids by path.
    pub audio_assets: DerivedView<Vec<WideId>>,
    pub assets_by_digest: DerivedView<BTreeMap<ContentDigest, WideId>>,
    /// Clip ids by name.
    pub audio_clips: DerivedView<Vec<WideId>>,
    /// Mixer line ids by sort key.
    pub mixer_lines: DerivedView<Vec<WideId>>,
    /// Effect ids per mixer line id, by sort key.
    pub effects_by_line: DerivedView<BTreeMap<WideId, Vec<WideId>>>,
}

impl Views {
    pub fn invalidate_all(&mut self) {
        self.tracks.invalidate();
        self.segments_by_track.invalidate();
        self.users.invalidate();
        self.audio_assets.invalidate();
        self.assets_by_digest.invalidate();
        self.audio_clips.invalidate();
        self.mixer_lines.invalidate();
        self.effects_by_line.invalidate();
    }

    /// Mark the views `kind` can change. Markers affect what their target does.
    pub fn invalidate_for(&mut self, kind: &CommandKind, log: &CommandLog) {
        let kind = match kind {
            CommandKind::Undo { other } | CommandKind::Redo { other } => match log.get(other) {
                Some(target) => &target.kind,
                None => {
                    self.invalidate_all();
                    return;
                }
            },
            kind => kind,
        };
        match kind.tag() {
            CommandTag::AddTrack => self.tracks.invalidate(),
            CommandTag::DeleteTrack => {
                self.tracks.invalidate();
                self.segments_by_track.invalidate();
            }
            CommandTag::AddAudioAsset => {
                self.audio_assets.invalidate();
                self.assets_by_digest.invalidate();
            }
            CommandTag::AddAudioClip => self.audio_clips.invalidate(),
            CommandTag::AddAudioClipSegment => self.segments_by_track.invalidate(),
            CommandTag::ChangeSampleRate
            | CommandTag::ChangeChannelLayout
            | CommandTag::ChangeMetadata => {}
            CommandTag::Undo | CommandTag::Redo => self.invalidate_all(),
        }
    }
}

pub(crate) fn ordered_tracks(state: &ProjectState) -> Vec<WideId> {
    let mut tracks: Vec<_> = state.tracks.iter().collect();
    tracks.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then(a.id.cmp(&b.id)));
    tracks.into_iter().map(|t| t.id).collect()
}

pub(crate) fn segments_by_track(state: &ProjectState) -> BTreeMap<WideId, Vec<WideId>> {
    let mut by_track: BTreeMap<WideId, Vec<_>> = BTreeMap::new();
    for segment in &state.segments {
        by_track.entry(segment.track_id).or_default().push(segment);
    }
    by_track
        .into_iter()
        .map(|(track, mut segments)| {
            segments.sort_by(|a, b| a.pos.total_cmp(&b.pos).then(a.id.cmp(&b.id)));
            (track, segments.into_iter().map(|s| s.id).collect())
        })
        .collect()
}

pub(crate) fn ordered_users(state: &ProjectState) -> Vec<WideId> {
    let mut users: Vec<_> = state.users.iter().collect();
    users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    users.into_iter().map(|u| u.id).collect()
}

pub(crate) fn ordered_assets(state: &ProjectState) -> Vec<WideId> {
    let mut assets: Vec<_> = state.audio_assets.iter().collect();
    assets.sort_by(|a, b| a.path.cmp(&b.path).then(a.id.cmp(&b.id)));
    assets.into_iter().map(|a| a.id).collect()
}

pub(crate) fn assets_by_digest(state: &ProjectState) -> BTreeMap<ContentDigest, WideId> {
    state
        .audio_assets
        .iter()
        .map(|asset| (asset.sha256, asset.id))
        .collect()
}

pub(crate) fn ordered_clips(state: &ProjectState) -> Vec<WideId> {
    let mut clips: Vec<_> = state.audio_clips.iter().collect();
    clips.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    clips.into_iter().map(|c| c.id).collect()
}

pub(crate) fn ordered_mixer_lines(state: &ProjectState) -> Vec<WideId> {
    let mut lines: Vec<_> = state.mixer_lines.iter().collect();
    lines.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then(a.id.cmp(&b.id)));
    lines.into_iter().map(|l| l.id).collect()
}

pub(crate) fn effects_by_line(state: &ProjectState) -> BTreeMap<WideId, Vec<WideId>> {
    let mut by_line: BTreeMap<WideId, Vec<_>> = BTreeMap::new();
    for effect in &state.effects {
        by_line.entry(effect.mixer_line_id).or_default().push(effect);
    }
    by_line
        .into_iter()
        .map(|(line, mut effects)| {
            effects.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then(a.id.cmp(&b.id)));
            (line, effects.into_iter().map(|e| e.id).collect())
        })
        .collect()
}
