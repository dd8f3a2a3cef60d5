//! Imported audio files, clips cut from them, and clip placements on tracks.

use std::path::PathBuf;

use crate::codec::{str_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::{Entity, WideId};

/// SHA-256 of an asset's file contents.
pub type ContentDigest = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub id: WideId,
    /// Stored as UTF-8 text; importers reject paths that are not valid UTF-8.
    pub path: PathBuf,
    pub sha256: ContentDigest,
}

impl AudioAsset {
    fn path_text(&self) -> std::borrow::Cow<'_, str> {
        self.path.to_string_lossy()
    }
}

impl Entity for AudioAsset {
    const KIND: &'static str = "audio asset";

    fn id(&self) -> WideId {
        self.id
    }
}

impl Encode for AudioAsset {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        w.str(&self.path_text());
        w.raw(&self.sha256);
    }

    fn encoded_len(&self) -> usize {
        WideId::LEN + str_len(&self.path_text()) + 32
    }
}

impl Decode for AudioAsset {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let id = r.id()?;
        let path = PathBuf::from(r.string()?);
        let mut sha256 = [0u8; 32];
        sha256.copy_from_slice(&r.raw(32)?);
        Ok(Self { id, path, sha256 })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub id: WideId,
    pub audio_asset_id: WideId,
    pub name: String,
}

impl Entity for AudioClip {
    const KIND: &'static str = "audio clip";

    fn id(&self) -> WideId {
        self.id
    }
}

impl Encode for AudioClip {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        w.id(&self.audio_asset_id);
        w.str(&self.name);
    }

    fn encoded_len(&self) -> usize {
        2 * WideId::LEN + str_len(&self.name)
    }
}

impl Decode for AudioClip {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: r.id()?,
            audio_asset_id: r.id()?,
            name: r.string()?,
        })
    }
}

/// A span of a clip placed on a track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClipSegment {
    pub id: WideId,
    pub audio_clip_id: WideId,
    pub track_id: WideId,
    /// First frame of the clip that plays.
    pub start: i64,
    /// Frame after the last one that plays.
    pub end: i64,
    /// Timeline position in whole notes.
    pub pos: f64,
}

impl AudioClipSegment {
    pub fn frame_count(&self) -> i64 {
        self.end - self.start
    }
}

impl Entity for AudioClipSegment {
    const KIND: &'static str = "audio clip segment";

    fn id(&self) -> WideId {
        self.id
    }
}

impl Encode for AudioClipSegment {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        w.id(&self.audio_clip_id);
        w.id(&self.track_id);
        w.i64(self.start);
        w.i64(self.end);
        w.f64(self.pos);
    }

    fn encoded_len(&self) -> usize {
        3 * WideId::LEN + 8 + 8 + 8
    }
}

impl Decode for AudioClipSegment {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: r.id()?,
            audio_clip_id: r.id()?,
            track_id: r.id()?,
            start: r.i64()?,
            end: r.i64()?,
            pos: r.f64()?,
        })
    }
}
