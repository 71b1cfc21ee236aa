//! Seeded randomness shared by [`crate::seed`] and [`crate::evolution`].
//!
//! `rand`'s default `StdRng` is not guaranteed to be stable across crate
//! versions, which would make a recorded `RNG_SEED` irreproducible after a
//! dependency bump. `ChaCha8Rng` pins a concrete, versioned algorithm instead.

pub type Rng = rand_chacha::ChaCha8Rng;

pub use rand::SeedableRng;

/// Seeds from an explicit value (CLI `--seed` / `RNG_SEED`), or from entropy
/// when the caller has none to offer.
pub fn from_seed_or_entropy(seed: Option<u64>) -> Rng {
    match seed {
        Some(s) => Rng::seed_from_u64(s),
        None => Rng::from_entropy(),
    }
}
