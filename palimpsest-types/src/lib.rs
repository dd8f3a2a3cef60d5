//! # palimpsest-types
//!
//! Plain data shared by the Palimpsest project engine and its front ends:
//! identifiers, sibling sort keys, entity records, the logged command set,
//! and the binary record codec they are all persisted with.
//!
//! Nothing here touches storage or mutates a project; behaviour lives in
//! `palimpsest-core`.

pub mod codec;
mod channel_layout;
pub mod command;
mod id;
mod sort_key;
pub mod state;
mod table;

pub use channel_layout::{ChannelId, ChannelLayout};
pub use codec::{Decode, DecodeError, Encode};
pub use command::{Command, CommandKind, CommandTag, SortKeyChange};
pub use id::{ParseWideIdError, WideId};
pub use sort_key::SortKey;
pub use table::{Entity, EntityTable};

// Re-export all entity types at crate root for convenience
pub use state::*;
