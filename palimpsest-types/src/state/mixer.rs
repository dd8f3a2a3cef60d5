//! Mixer lines and the effects chained on them.

use crate::codec::{str_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::{Entity, SortKey, WideId};

#[derive(Debug, Clone, PartialEq)]
pub struct MixerLine {
    pub id: WideId,
    pub name: String,
    pub sort_key: SortKey,
    pub solo: bool,
    pub volume: f32,
}

impl Entity for MixerLine {
    const KIND: &'static str = "mixer line";

    fn id(&self) -> WideId {
        self.id
    }
}

impl Encode for MixerLine {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        w.str(&self.name);
        self.sort_key.encode(w);
        w.bool(self.solo);
        w.f32(self.volume);
    }

    fn encoded_len(&self) -> usize {
        WideId::LEN + str_len(&self.name) + self.sort_key.encoded_len() + 1 + 4
    }
}

impl Decode for MixerLine {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: r.id()?,
            name: r.string()?,
            sort_key: SortKey::decode(r)?,
            solo: r.bool()?,
            volume: r.f32()?,
        })
    }
}

/// Output devices a send can target. Discriminants are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceId {
    MainOut = 0,
}

impl DeviceId {
    pub fn name(self) -> &'static str {
        match self {
            DeviceId::MainOut => "Main Out",
        }
    }

    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(DeviceId::MainOut),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SendTarget {
    Device(DeviceId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSend {
    pub gain: f32,
    pub target: SendTarget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    Send(EffectSend),
}

impl EffectKind {
    pub fn description(&self) -> String {
        match self {
            EffectKind::Send(send) => match send.target {
                SendTarget::Device(device) => format!("Send to {}", device.name()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub id: WideId,
    pub mixer_line_id: WideId,
    pub sort_key: SortKey,
    pub kind: EffectKind,
}

impl Entity for Effect {
    const KIND: &'static str = "effect";

    fn id(&self) -> WideId {
        self.id
    }
}

const EFFECT_SEND: u8 = 0;
const SEND_TARGET_DEVICE: u8 = 0;

impl Encode for Effect {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        w.id(&self.mixer_line_id);
        self.sort_key.encode(w);
        match &self.kind {
            EffectKind::Send(send) => {
                w.u8(EFFECT_SEND);
                w.f32(send.gain);
                match send.target {
                    SendTarget::Device(device) => {
                        w.u8(SEND_TARGET_DEVICE);
                        w.u32(device as u32);
                    }
                }
            }
        }
    }

    fn encoded_len(&self) -> usize {
        let kind_len = match &self.kind {
            EffectKind::Send(_) => 1 + 4 + 1 + 4,
        };
        2 * WideId::LEN + self.sort_key.encoded_len() + kind_len
    }
}

impl Decode for Effect {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let id = r.id()?;
        let mixer_line_id = r.id()?;
        let sort_key = SortKey::decode(r)?;
        let kind = match r.u8()? {
            EFFECT_SEND => {
                let gain = r.f32()?;
                let target = match r.u8()? {
                    SEND_TARGET_DEVICE => {
                        let raw = r.u32()?;
                        let device = DeviceId::from_u32(raw)
                            .ok_or(DecodeError::InvalidValue("device id"))?;
                        SendTarget::Device(device)
                    }
                    tag => {
                        return Err(DecodeError::UnknownTag {
                            what: "send target",
                            tag,
                        })
                    }
                };
                EffectKind::Send(EffectSend { gain, target })
            }
            tag => return Err(DecodeError::UnknownTag { what: "effect", tag }),
        };
        Ok(Self {
            id,
            mixer_line_id,
            sort_key,
            kind,
        })
    }
}
