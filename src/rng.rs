//! Seeded randomness for the systems. Each system draws from its own ChaCha
//! stream, keyed by system name and derived from the scenario seed, so a
//! rerun or a reset replays the same bathroom hours.

use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generator handed to `System::run`.
pub type SystemRng = ChaCha8Rng;

pub struct RngStreams {
    seed: u64,
    master: ChaCha8Rng,
    streams: HashMap<String, SystemRng>,
}

impl RngStreams {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Forgets every stream handed out so far; the next run starts over.
    pub fn rewind(&mut self) {
        *self = Self::new(self.seed);
    }

    /// Stream for `system`, created on first use in the order systems ask.
    pub fn for_system(&mut self, system: &str) -> &mut SystemRng {
        let master = &mut self.master;
        self.streams
            .entry(system.to_string())
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(master.next_u64()))
    }
}
