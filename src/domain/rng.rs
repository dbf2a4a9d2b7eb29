//! Seed derivation for independent simulation streams.
//!
//! Walk-forward windows each get their own RNG whose seed is a BLAKE3 hash of
//! the master seed and the window index, so a window's fills do not depend on
//! how many windows ran before it or on which thread it ran.

use rand::SeedableRng;
use rand::rngs::StdRng;

pub fn derive_seed(master_seed: u64, stream: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"stuntman/window");
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(&stream.to_le_bytes());
    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}

pub fn stream_rng(master_seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(master_seed, stream))
}
