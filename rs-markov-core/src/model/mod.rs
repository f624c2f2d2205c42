//! Top-level module for the Markov chain sequence model.
//!
//! This module ties together the statistical core:
//! - Key encoding and reserved sentinel tokens (`key`)
//! - Validated model parameters (`ModelParams`)
//! - The key-value store contract and its in-memory backend (`Store`, `MemoryStore`)
//! - The model handle with the sliding-window index builder (`Markov`)
//! - Weighted random sampling for generation (`generator`)
//! - The fit scorer (`scorer`)

/// Model handle binding a store to fixed parameters.
///
/// Exposes ingestion, generation, scoring and flush on one owned handle.
pub mod markov;

/// Model parameters (`prefix`, `key_length`, `completion_length`),
/// validated at construction and embedded in snapshots.
pub mod params;

/// Key-value store contract and the `RwLock`-backed in-memory store with
/// postcard snapshot persistence.
pub mod store;

/// Key/completion encoding, reserved tokens and sliding-window pairing.
pub mod key;

/// Weighted sampler and seed selection.
///
/// Internal; generation is reached through `Markov::generate`.
mod generator;

/// Window-replay scorer.
///
/// Internal; scoring is reached through `Markov::score`.
mod scorer;
