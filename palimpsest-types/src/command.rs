//! Logged, reversible project edits.
//!
//! A [`Command`] is the unit of project history. The set of edits is closed:
//! [`CommandKind`] lists every variant, and the variant tag written in front
//! of each encoded command selects the decoder when the log is read back.
//! Commands carry ids and value snapshots only; they are applied against
//! whatever state the project holds when they run.

use crate::codec::{decode_seq, encode_seq, seq_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::{
    AudioAsset, AudioClip, AudioClipSegment, ChannelLayout, Entity, ProjectMetadata, SortKey,
    Track, WideId,
};

/// On-disk variant tags. Never renumber; 0 is reserved as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandTag {
    Undo = 1,
    Redo = 2,
    AddTrack = 3,
    DeleteTrack = 4,
    AddAudioClip = 5,
    AddAudioClipSegment = 6,
    ChangeSampleRate = 7,
    ChangeChannelLayout = 8,
    AddAudioAsset = 9,
    ChangeMetadata = 10,
}

impl TryFrom<u8> for CommandTag {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            1 => CommandTag::Undo,
            2 => CommandTag::Redo,
            3 => CommandTag::AddTrack,
            4 => CommandTag::DeleteTrack,
            5 => CommandTag::AddAudioClip,
            6 => CommandTag::AddAudioClipSegment,
            7 => CommandTag::ChangeSampleRate,
            8 => CommandTag::ChangeChannelLayout,
            9 => CommandTag::AddAudioAsset,
            10 => CommandTag::ChangeMetadata,
            _ => return Err(DecodeError::UnknownTag { what: "command", tag }),
        })
    }
}

/// A sibling whose sort key was rewritten to make room for an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKeyChange {
    pub id: WideId,
    pub old: SortKey,
    pub new: SortKey,
}

impl Encode for SortKeyChange {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        self.old.encode(w);
        self.new.encode(w);
    }

    fn encoded_len(&self) -> usize {
        WideId::LEN + self.old.encoded_len() + self.new.encoded_len()
    }
}

impl Decode for SortKeyChange {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: r.id()?,
            old: SortKey::decode(r)?,
            new: SortKey::decode(r)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Runs the inverse of another, already applied command.
    Undo { other: WideId },
    /// Runs the forward effect of another command again.
    Redo { other: WideId },
    AddTrack {
        track: Track,
        /// Keys rewritten in the same step because the gap was exhausted.
        renumbered: Vec<SortKeyChange>,
    },
    /// Snapshot of the track and every segment on it, taken when the
    /// command was built.
    DeleteTrack {
        track: Track,
        segments: Vec<AudioClipSegment>,
    },
    AddAudioAsset { asset: AudioAsset },
    AddAudioClip { clip: AudioClip },
    AddAudioClipSegment { segment: AudioClipSegment },
    ChangeSampleRate { old: u32, new: u32 },
    ChangeChannelLayout { old: ChannelLayout, new: ChannelLayout },
    /// Replaces every release tag at once.
    ChangeMetadata {
        old: ProjectMetadata,
        new: ProjectMetadata,
    },
}

impl CommandKind {
    pub fn tag(&self) -> CommandTag {
        match self {
            CommandKind::Undo { .. } => CommandTag::Undo,
            CommandKind::Redo { .. } => CommandTag::Redo,
            CommandKind::AddTrack { .. } => CommandTag::AddTrack,
            CommandKind::DeleteTrack { .. } => CommandTag::DeleteTrack,
            CommandKind::AddAudioAsset { .. } => CommandTag::AddAudioAsset,
            CommandKind::AddAudioClip { .. } => CommandTag::AddAudioClip,
            CommandKind::AddAudioClipSegment { .. } => CommandTag::AddAudioClipSegment,
            CommandKind::ChangeSampleRate { .. } => CommandTag::ChangeSampleRate,
            CommandKind::ChangeChannelLayout { .. } => CommandTag::ChangeChannelLayout,
            CommandKind::ChangeMetadata { .. } => CommandTag::ChangeMetadata,
        }
    }

    /// Undo and redo markers reference another command instead of
    /// mutating entities themselves.
    pub fn is_marker(&self) -> bool {
        matches!(self, CommandKind::Undo { .. } | CommandKind::Redo { .. })
    }

    pub fn description(&self) -> String {
        match self {
            CommandKind::Undo { .. } => "Undo".to_string(),
            CommandKind::Redo { .. } => "Redo".to_string(),
            CommandKind::AddTrack { .. } => "Insert Track".to_string(),
            CommandKind::DeleteTrack { .. } => "Delete Track".to_string(),
            CommandKind::AddAudioAsset { .. } => "Import Audio".to_string(),
            CommandKind::AddAudioClip { .. } => "Add Audio Clip".to_string(),
            CommandKind::AddAudioClipSegment { .. } => "Add Audio Clip Segment".to_string(),
            CommandKind::ChangeSampleRate { old, new } => {
                format!("Change Sample Rate from {} to {}", old, new)
            }
            CommandKind::ChangeChannelLayout { old, new } => {
                format!("Change Channel Layout from {} to {}", old.name, new.name)
            }
            CommandKind::ChangeMetadata { old, new } => {
                match old.changed_fields(new).as_slice() {
                    [field] => format!("Change Project {}", title_case(field)),
                    _ => "Change Project Metadata".to_string(),
                }
            }
        }
    }

    fn encode_fields(&self, w: &mut Writer) {
        match self {
            CommandKind::Undo { other } | CommandKind::Redo { other } => w.id(other),
            CommandKind::AddTrack { track, renumbered } => {
                track.encode(w);
                encode_seq(w, renumbered);
            }
            CommandKind::DeleteTrack { track, segments } => {
                track.encode(w);
                encode_seq(w, segments);
            }
            CommandKind::AddAudioAsset { asset } => asset.encode(w),
            CommandKind::AddAudioClip { clip } => clip.encode(w),
            CommandKind::AddAudioClipSegment { segment } => segment.encode(w),
            CommandKind::ChangeSampleRate { old, new } => {
                w.u32(*old);
                w.u32(*new);
            }
            CommandKind::ChangeChannelLayout { old, new } => {
                old.encode(w);
                new.encode(w);
            }
            CommandKind::ChangeMetadata { old, new } => {
                old.encode(w);
                new.encode(w);
            }
        }
    }

    fn fields_len(&self) -> usize {
        match self {
            CommandKind::Undo { .. } | CommandKind::Redo { .. } => WideId::LEN,
            CommandKind::AddTrack { track, renumbered } => {
                track.encoded_len() + seq_len(renumbered)
            }
            CommandKind::DeleteTrack { track, segments } => {
                track.encoded_len() + seq_len(segments)
            }
            CommandKind::AddAudioAsset { asset } => asset.encoded_len(),
            CommandKind::AddAudioClip { clip } => clip.encoded_len(),
            CommandKind::AddAudioClipSegment { segment } => segment.encoded_len(),
            CommandKind::ChangeSampleRate { .. } => 8,
            CommandKind::ChangeChannelLayout { old, new } => {
                old.encoded_len() + new.encoded_len()
            }
            CommandKind::ChangeMetadata { old, new } => old.encoded_len() + new.encoded_len(),
        }
    }

    fn decode_fields(tag: CommandTag, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(match tag {
            CommandTag::Undo => CommandKind::Undo { other: r.id()? },
            CommandTag::Redo => CommandKind::Redo { other: r.id()? },
            CommandTag::AddTrack => CommandKind::AddTrack {
                track: Track::decode(r)?,
                renumbered: decode_seq(r)?,
            },
            CommandTag::DeleteTrack => CommandKind::DeleteTrack {
                track: Track::decode(r)?,
                segments: decode_seq(r)?,
            },
            CommandTag::AddAudioAsset => CommandKind::AddAudioAsset {
                asset: AudioAsset::decode(r)?,
            },
            CommandTag::AddAudioClip => CommandKind::AddAudioClip {
                clip: AudioClip::decode(r)?,
            },
            CommandTag::AddAudioClipSegment => CommandKind::AddAudioClipSegment {
                segment: AudioClipSegment::decode(r)?,
            },
            CommandTag::ChangeSampleRate => CommandKind::ChangeSampleRate {
                old: r.u32()?,
                new: r.u32()?,
            },
            CommandTag::ChangeChannelLayout => CommandKind::ChangeChannelLayout {
                old: ChannelLayout::decode(r)?,
                new: ChannelLayout::decode(r)?,
            },
            CommandTag::ChangeMetadata => CommandKind::ChangeMetadata {
                old: ProjectMetadata::decode(r)?,
                new: ProjectMetadata::decode(r)?,
            },
        })
    }
}

fn title_case(field: &str) -> String {
    field
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub id: WideId,
    /// Author of the command.
    pub user_id: WideId,
    /// Position in the project-wide total order, starting at 1.
    pub revision: u64,
    pub kind: CommandKind,
}

/// Tag, id, user id, revision.
const HEADER_LEN: usize = 1 + 2 * WideId::LEN + 8;

impl Command {
    pub fn tag(&self) -> CommandTag {
        self.kind.tag()
    }

    pub fn description(&self) -> String {
        self.kind.description()
    }
}

impl Entity for Command {
    const KIND: &'static str = "command";

    fn id(&self) -> WideId {
        self.id
    }
}

impl Encode for Command {
    fn encode(&self, w: &mut Writer) {
        w.u8(self.tag() as u8);
        w.id(&self.id);
        w.id(&self.user_id);
        w.u64(self.revision);
        self.kind.encode_fields(w);
    }

    fn encoded_len(&self) -> usize {
        HEADER_LEN + self.kind.fields_len()
    }
}

impl Decode for Command {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let tag = CommandTag::try_from(r.u8()?)?;
        let id = r.id()?;
        let user_id = r.id()?;
        let revision = r.u64()?;
        let kind = CommandKind::decode_fields(tag, r)?;
        Ok(Self {
            id,
            user_id,
            revision,
            kind,
        })
    }
}
