//! Store key layout.
//!
//! ```text
//! project/header
//! project/settings
//! command/<revision: u64 big-endian><command id>
//! track/<id>   asset/<id>   clip/<id>   segment/<id>
//! mixer_line/<id>   effect/<id>   user/<id>
//! ```
//!
//! Revisions are big-endian so command keys sort in revision order.

use palimpsest_types::{
    AudioAsset, AudioClip, AudioClipSegment, Effect, Entity, MixerLine, Track, User, WideId,
};

pub const HEADER: &[u8] = b"project/header";
pub const SETTINGS: &[u8] = b"project/settings";
pub const COMMAND_PREFIX: &[u8] = b"command/";

/// Entities materialized as one record per id under a fixed prefix.
pub trait Record: Entity {
    const PREFIX: &'static [u8];
}

impl Record for Track {
    const PREFIX: &'static [u8] = b"track/";
}

impl Record for AudioAsset {
    const PREFIX: &'static [u8] = b"asset/";
}

impl Record for AudioClip {
    const PREFIX: &'static [u8] = b"clip/";
}

impl Record for AudioClipSegment {
    const PREFIX: &'static [u8] = b"segment/";
}

impl Record for MixerLine {
    const PREFIX: &'static [u8] = b"mixer_line/";
}

impl Record for Effect {
    const PREFIX: &'static [u8] = b"effect/";
}

impl Record for User {
    const PREFIX: &'static [u8] = b"user/";
}

pub fn record<T: Record>(id: &WideId) -> Vec<u8> {
    let mut key = Vec::with_capacity(T::PREFIX.len() + WideId::LEN);
    key.extend_from_slice(T::PREFIX);
    key.extend_from_slice(id.as_bytes());
    key
}

pub fn command(revision: u64, id: &WideId) -> Vec<u8> {
    let mut key = Vec::with_capacity(COMMAND_PREFIX.len() + 8 + WideId::LEN);
    key.extend_from_slice(COMMAND_PREFIX);
    key.extend_from_slice(&revision.to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// Split a command key back into revision and id.
pub fn parse_command(key: &[u8]) -> Option<(u64, WideId)> {
    let rest = key.strip_prefix(COMMAND_PREFIX)?;
    if rest.len() != 8 + WideId::LEN {
        return None;
    }
    let (rev, id) = rest.split_at(8);
    let revision = u64::from_be_bytes(rev.try_into().ok()?);
    Some((revision, WideId::from_bytes(id.try_into().ok()?)))
}
