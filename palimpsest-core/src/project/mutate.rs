//! Edit entry points. Each validates its arguments against the current
//! state, builds one command, and routes it through `apply_command`.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use palimpsest_types::codec::MAX_FIELD_LEN;
use palimpsest_types::{
    AudioAsset, AudioClip, AudioClipSegment, ChannelLayout, CommandKind, ContentDigest,
    ProjectMetadata, SortKey, SortKeyChange, Track, WideId,
};

use super::Project;
use crate::error::{ProjectError, Result};

impl Project {
    /// Insert a new track between `before` (the track it will follow) and
    /// `after` (the track it will precede). A missing neighbour is taken to
    /// be the adjacent track of the one given; with neither given the track
    /// is appended.
    pub fn insert_track(&mut self, before: Option<WideId>, after: Option<WideId>) -> Result<WideId> {
        let order: Vec<(WideId, SortKey)> = self
            .tracks()
            .into_iter()
            .map(|t| (t.id, t.sort_key.clone()))
            .collect();
        let position = |id: WideId| {
            order
                .iter()
                .position(|(t, _)| *t == id)
                .ok_or_else(|| ProjectError::missing::<Track>(id))
        };

        // Index the new track will occupy in `order`.
        let index = match (before, after) {
            (None, None) => order.len(),
            (Some(b), None) => position(b)? + 1,
            (None, Some(a)) => position(a)?,
            (Some(b), Some(a)) => {
                let (bi, ai) = (position(b)?, position(a)?);
                if ai != bi + 1 {
                    return Err(ProjectError::InvalidArgument(format!(
                        "tracks {} and {} are not adjacent",
                        b.short(),
                        a.short()
                    )));
                }
                ai
            }
        };

        let lo = index.checked_sub(1).map(|i| &order[i].1);
        let hi = order.get(index).map(|(_, key)| key);
        let key = match (lo, hi) {
            (None, None) => Some(SortKey::initial()),
            (Some(last), None) => SortKey::after_last(last),
            (None, Some(first)) => SortKey::before_first(first),
            (Some(_), Some(_)) => SortKey::between(lo, hi),
        };
        let (sort_key, renumbered) = match key {
            Some(key) => (key, Vec::new()),
            None => renumber(&order, index),
        };

        let track = Track {
            id: self.ids.next_id(),
            name: format!("Track {}", order.len() + 1),
            sort_key,
        };
        let id = track.id;
        if !renumbered.is_empty() {
            log::info!(
                target: "project",
                "sort keys exhausted, renumbering {} tracks",
                renumbered.len()
            );
        }
        self.apply_command(CommandKind::AddTrack { track, renumbered })?;
        Ok(id)
    }

    /// Delete `track` and every segment placed on it.
    pub fn delete_track(&mut self, track: &WideId) -> Result<()> {
        let snapshot = self
            .state
            .tracks
            .get(track)
            .cloned()
            .ok_or_else(|| ProjectError::missing::<Track>(*track))?;
        let segments: Vec<AudioClipSegment> = self
            .state
            .segments
            .iter()
            .filter(|s| s.track_id == *track)
            .cloned()
            .collect();
        self.apply_command(CommandKind::DeleteTrack {
            track: snapshot,
            segments,
        })?;
        Ok(())
    }

    /// Import the audio file at `path`. A file whose contents are already
    /// imported yields the existing asset and logs no command.
    pub fn add_audio_asset(&mut self, path: &Path) -> Result<WideId> {
        // Asset records store the path as UTF-8 text.
        if path.to_str().is_none() {
            return Err(ProjectError::InvalidArgument(format!(
                "audio file path {} is not valid UTF-8",
                path.display()
            )));
        }
        let sha256 = file_digest(path)?;
        if let Some(existing) = self.audio_asset_by_digest(&sha256) {
            log::debug!(
                target: "project",
                "{} matches imported asset {}",
                path.display(),
                existing.path.display()
            );
            return Ok(existing.id);
        }

        let asset = AudioAsset {
            id: self.ids.next_id(),
            path: path.to_path_buf(),
            sha256,
        };
        let id = asset.id;
        self.apply_command(CommandKind::AddAudioAsset { asset })?;
        Ok(id)
    }

    pub fn add_audio_clip(&mut self, asset: &WideId, name: &str) -> Result<WideId> {
        if !self.state.audio_assets.contains(asset) {
            return Err(ProjectError::missing::<AudioAsset>(*asset));
        }
        let clip = AudioClip {
            id: self.ids.next_id(),
            audio_asset_id: *asset,
            name: name.to_string(),
        };
        let id = clip.id;
        self.apply_command(CommandKind::AddAudioClip { clip })?;
        Ok(id)
    }

    /// Place frames `start..end` of `clip` on `track` at `pos` whole notes.
    pub fn add_audio_clip_segment(
        &mut self,
        clip: &WideId,
        track: &WideId,
        start: i64,
        end: i64,
        pos: f64,
    ) -> Result<WideId> {
        if !self.state.audio_clips.contains(clip) {
            return Err(ProjectError::missing::<AudioClip>(*clip));
        }
        if !self.state.tracks.contains(track) {
            return Err(ProjectError::missing::<Track>(*track));
        }
        if start < 0 || end <= start {
            return Err(ProjectError::InvalidArgument(format!(
                "invalid frame range {}..{}",
                start, end
            )));
        }
        if !pos.is_finite() || pos < 0.0 {
            return Err(ProjectError::InvalidArgument(format!(
                "invalid timeline position {}",
                pos
            )));
        }

        let segment = AudioClipSegment {
            id: self.ids.next_id(),
            audio_clip_id: *clip,
            track_id: *track,
            start,
            end,
            pos,
        };
        let id = segment.id;
        self.apply_command(CommandKind::AddAudioClipSegment { segment })?;
        Ok(id)
    }

    /// Returns the command id, or `None` if `rate` is already current.
    pub fn set_sample_rate(&mut self, rate: u32) -> Result<Option<WideId>> {
        if rate == 0 {
            return Err(ProjectError::InvalidArgument(
                "sample rate must be positive".to_string(),
            ));
        }
        let old = self.state.settings.sample_rate;
        if old == rate {
            return Ok(None);
        }
        self.apply_command(CommandKind::ChangeSampleRate { old, new: rate })
            .map(Some)
    }

    /// Returns the command id, or `None` if `layout` is already current.
    pub fn set_channel_layout(&mut self, layout: ChannelLayout) -> Result<Option<WideId>> {
        if layout.channels.is_empty() || layout.channels.len() > u8::MAX as usize {
            return Err(ProjectError::InvalidArgument(format!(
                "channel layout {} has {} channels",
                layout.name,
                layout.channels.len()
            )));
        }
        let old = self.state.settings.channel_layout.clone();
        if old == layout {
            return Ok(None);
        }
        self.apply_command(CommandKind::ChangeChannelLayout { old, new: layout })
            .map(Some)
    }

    /// Replace the release tags. Returns `None` if nothing changed.
    pub fn set_metadata(&mut self, metadata: ProjectMetadata) -> Result<Option<WideId>> {
        let tags = [
            ("title", &metadata.title),
            ("artist", &metadata.artist),
            ("album artist", &metadata.album_artist),
            ("album", &metadata.album),
        ];
        if let Some((name, _)) = tags.iter().find(|(_, tag)| tag.len() > MAX_FIELD_LEN) {
            return Err(ProjectError::InvalidArgument(format!("{} tag is too long", name)));
        }
        let old = self.state.settings.metadata.clone();
        if old == metadata {
            return Ok(None);
        }
        self.apply_command(CommandKind::ChangeMetadata { old, new: metadata })
            .map(Some)
    }
}

/// Fresh, evenly spaced keys for the whole run with a slot left at `index`.
fn renumber(order: &[(WideId, SortKey)], index: usize) -> (SortKey, Vec<SortKeyChange>) {
    let mut keys = SortKey::evenly_spaced(order.len() + 1);
    let new_key = keys.remove(index);
    let changes = order
        .iter()
        .zip(keys)
        .filter(|((_, old), new)| old != new)
        .map(|((id, old), new)| SortKeyChange {
            id: *id,
            old: old.clone(),
            new,
        })
        .collect();
    (new_key, changes)
}

fn file_digest(path: &Path) -> Result<ContentDigest> {
    let mut file = File::open(path).map_err(|e| ProjectError::from_io(e, path))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| ProjectError::from_io(e, path))?;
    Ok(hasher.finalize().into())
}
