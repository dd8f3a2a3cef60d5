//! Speaker channel layouts.

use crate::codec::{str_len, Decode, DecodeError, Encode, Reader, Writer};

/// A speaker position. Discriminants are part of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelId {
    FrontLeft = 1,
    FrontRight = 2,
    FrontCenter = 3,
    Lfe = 4,
    BackLeft = 5,
    BackRight = 6,
    SideLeft = 7,
    SideRight = 8,
    BackCenter = 9,
}

impl ChannelId {
    fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            1 => ChannelId::FrontLeft,
            2 => ChannelId::FrontRight,
            3 => ChannelId::FrontCenter,
            4 => ChannelId::Lfe,
            5 => ChannelId::BackLeft,
            6 => ChannelId::BackRight,
            7 => ChannelId::SideLeft,
            8 => ChannelId::SideRight,
            9 => ChannelId::BackCenter,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    pub name: String,
    pub channels: Vec<ChannelId>,
}

impl ChannelLayout {
    pub fn new(name: impl Into<String>, channels: Vec<ChannelId>) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }

    pub fn mono() -> Self {
        Self::new("Mono", vec![ChannelId::FrontCenter])
    }

    pub fn stereo() -> Self {
        Self::new("Stereo", vec![ChannelId::FrontLeft, ChannelId::FrontRight])
    }

    pub fn surround_2_1() -> Self {
        Self::new(
            "2.1",
            vec![ChannelId::FrontLeft, ChannelId::FrontRight, ChannelId::Lfe],
        )
    }

    pub fn quad() -> Self {
        Self::new(
            "Quad",
            vec![
                ChannelId::FrontLeft,
                ChannelId::FrontRight,
                ChannelId::BackLeft,
                ChannelId::BackRight,
            ],
        )
    }

    pub fn surround_5_1() -> Self {
        Self::new(
            "5.1",
            vec![
                ChannelId::FrontLeft,
                ChannelId::FrontRight,
                ChannelId::FrontCenter,
                ChannelId::Lfe,
                ChannelId::SideLeft,
                ChannelId::SideRight,
            ],
        )
    }

    pub fn surround_7_1() -> Self {
        Self::new(
            "7.1",
            vec![
                ChannelId::FrontLeft,
                ChannelId::FrontRight,
                ChannelId::FrontCenter,
                ChannelId::Lfe,
                ChannelId::BackLeft,
                ChannelId::BackRight,
                ChannelId::SideLeft,
                ChannelId::SideRight,
            ],
        )
    }

    pub fn builtins() -> Vec<ChannelLayout> {
        vec![
            Self::mono(),
            Self::stereo(),
            Self::surround_2_1(),
            Self::quad(),
            Self::surround_5_1(),
            Self::surround_7_1(),
        ]
    }

    /// Case-insensitive lookup of a builtin layout.
    pub fn builtin_by_name(name: &str) -> Option<ChannelLayout> {
        Self::builtins()
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::stereo()
    }
}

impl Encode for ChannelLayout {
    fn encode(&self, w: &mut Writer) {
        w.str(&self.name);
        w.u8(self.channels.len() as u8);
        for ch in &self.channels {
            w.u8(*ch as u8);
        }
    }

    fn encoded_len(&self) -> usize {
        str_len(&self.name) + 1 + self.channels.len()
    }
}

impl Decode for ChannelLayout {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let name = r.string()?;
        let count = r.u8()? as usize;
        let mut channels = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = r.u8()?;
            let ch = ChannelId::from_u8(tag).ok_or(DecodeError::UnknownTag {
                what: "channel",
                tag,
            })?;
            channels.push(ch);
        }
        Ok(Self { name, channels })
    }
}
