//! Canonical project state and its header records.

use palimpsest_types::codec::{Decode, DecodeError, Encode, Reader, Writer};
use palimpsest_types::{
    AudioAsset, AudioClip, AudioClipSegment, ChannelLayout, Effect, EntityTable, MixerLine,
    ProjectMetadata, Track, User, WideId,
};

/// Entity tables and settings shared by every user of a project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectState {
    pub tracks: EntityTable<Track>,
    pub audio_assets: EntityTable<AudioAsset>,
    pub audio_clips: EntityTable<AudioClip>,
    pub segments: EntityTable<AudioClipSegment>,
    pub mixer_lines: EntityTable<MixerLine>,
    pub effects: EntityTable<Effect>,
    pub users: EntityTable<User>,
    pub settings: Settings,
}

impl ProjectState {
    pub fn new(settings: Settings) -> Self {
        Self {
            tracks: EntityTable::new(),
            audio_assets: EntityTable::new(),
            audio_clips: EntityTable::new(),
            segments: EntityTable::new(),
            mixer_lines: EntityTable::new(),
            effects: EntityTable::new(),
            users: EntityTable::new(),
            settings,
        }
    }
}

/// Mutable project-wide settings, persisted as `project/settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
    pub metadata: ProjectMetadata,
}

impl Encode for Settings {
    fn encode(&self, w: &mut Writer) {
        w.u32(self.sample_rate);
        self.channel_layout.encode(w);
        self.metadata.encode(w);
    }

    fn encoded_len(&self) -> usize {
        4 + self.channel_layout.encoded_len() + self.metadata.encoded_len()
    }
}

impl Decode for Settings {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            sample_rate: r.u32()?,
            channel_layout: ChannelLayout::decode(r)?,
            metadata: ProjectMetadata::decode(r)?,
        })
    }
}

/// Current header format.
pub const HEADER_FORMAT: u32 = 1;

/// Written once at creation, persisted as `project/header`. The settings it
/// carries are the ones the command log is replayed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHeader {
    pub format: u32,
    pub id: WideId,
    pub master_mixer_line_id: WideId,
    pub initial: Settings,
}

impl Encode for ProjectHeader {
    fn encode(&self, w: &mut Writer) {
        w.u32(self.format);
        w.id(&self.id);
        w.id(&self.master_mixer_line_id);
        self.initial.encode(w);
    }

    fn encoded_len(&self) -> usize {
        4 + 2 * WideId::LEN + self.initial.encoded_len()
    }
}

impl Decode for ProjectHeader {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            format: r.u32()?,
            id: r.id()?,
            master_mixer_line_id: r.id()?,
            initial: Settings::decode(r)?,
        })
    }
}
