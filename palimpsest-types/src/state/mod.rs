//! Canonical entity records.
//!
//! Every entity carries its own `WideId` and refers to other entities only
//! by id. Each type has a binary record encoding used for the materialized
//! entity rows in the project store.

mod audio;
mod metadata;
mod mixer;
mod track;
mod user;

pub use audio::{AudioAsset, AudioClip, AudioClipSegment, ContentDigest};
pub use metadata::ProjectMetadata;
pub use mixer::{DeviceId, Effect, EffectKind, EffectSend, MixerLine, SendTarget};
pub use track::Track;
pub use user::User;
