//! Identifier allocation.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use palimpsest_types::WideId;

use crate::error::{ProjectError, Result};

/// Source of fresh [`WideId`]s. Owned by a project and passed explicitly to
/// anything that allocates ids; there is no process-wide generator.
pub struct IdGenerator {
    rng: StdRng,
}

impl IdGenerator {
    /// Generator seeded from the operating system's entropy source.
    pub fn from_entropy() -> Result<Self> {
        let rng = StdRng::from_rng(OsRng)
            .map_err(|e| ProjectError::SystemResources(format!("entropy source: {}", e)))?;
        Ok(Self { rng })
    }

    /// Deterministic generator, for tests and reproducible tooling.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_id(&mut self) -> WideId {
        loop {
            let mut bytes = [0u8; WideId::LEN];
            self.rng.fill_bytes(&mut bytes);
            let id = WideId::from_bytes(bytes);
            if !id.is_nil() {
                return id;
            }
        }
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdGenerator")
    }
}
