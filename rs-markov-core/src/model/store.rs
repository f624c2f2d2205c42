use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use rand::RngCore;
use rand::prelude::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::model::key::SEPARATOR;
use crate::model::params::ModelParams;

/// Persistent associative store mapping n-gram keys to weighted completions.
///
/// This is the only component that talks to durable storage; the builder,
/// sampler and scorer interact solely through this contract, so any ordered
/// associative store with an atomic per-key increment can back a model.
///
/// # Responsibilities
/// - Atomic, increment-only weight accumulation per `(key, completion)`
/// - Ranked retrieval of completions (descending weight)
/// - Random and substring-filtered key selection under a namespace prefix
/// - Wholesale deletion of a namespace
///
/// # Notes
/// - All methods take `&self`: implementations use interior mutability so
///   concurrent ingestion, generation and scoring can share one handle.
/// - Readers may observe partially-updated weights from concurrent
///   ingestion; no isolation guarantee is required or provided.
pub trait Store: Send + Sync {
	/// Atomically adds `delta` to the weight of `completion` under `key`,
	/// creating both if absent. Returns the new weight.
	fn increment(&self, key: &str, completion: &str, delta: u64) -> Result<u64>;

	/// Returns all completions for `key` ordered by descending weight.
	/// Ties break on the completion string so the order is deterministic.
	/// Empty when the key is absent.
	fn top_completions(&self, key: &str) -> Result<Vec<(String, u64)>>;

	/// Maximum completion weight under `key`; 0 when the key is absent.
	fn max_weight(&self, key: &str) -> Result<u64>;

	/// Minimum completion weight under `key`; 0 when the key is absent.
	fn min_weight(&self, key: &str) -> Result<u64>;

	/// Weight of `completion` under `key`; 0 when either is absent.
	fn weight_of(&self, key: &str, completion: &str) -> Result<u64>;

	/// Returns one key uniformly at random among keys under `prefix`,
	/// drawn from the caller's randomness source so seeded callers stay
	/// reproducible.
	///
	/// # Errors
	/// `EmptyModel` when no key exists under the prefix.
	fn random_key(&self, prefix: &str, rng: &mut dyn RngCore) -> Result<String>;

	/// Returns all keys under `prefix` whose token part contains `substring`.
	fn keys_matching(&self, prefix: &str, substring: &str) -> Result<Vec<String>>;

	/// Removes all keys (and their weights) under `prefix`.
	/// Returns the number of deleted keys.
	fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}

/// Namespace selector for a prefix: every key of the model starts with
/// `prefix` followed by the separator.
fn namespace(prefix: &str) -> String {
	format!("{prefix}{SEPARATOR}")
}

type WeightMap = HashMap<String, HashMap<String, u64>>;

/// In-memory `Store` backed by a `RwLock`ed nested map.
///
/// Increment takes the write lock, which makes it atomic per key under
/// concurrent ingestion threads; all read operations share the read lock.
/// The content can be persisted as a compact `postcard` snapshot that
/// embeds the model parameters it was built with.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: RwLock<WeightMap>,
}

/// On-disk form of a `MemoryStore`, tagged with the build parameters so a
/// mismatched load fails loudly instead of silently missing every key.
#[derive(Serialize, Deserialize)]
struct Snapshot {
	params: ModelParams,
	entries: WeightMap,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, WeightMap>> {
		self.entries
			.read()
			.map_err(|_| MarkovError::StoreUnavailable("store lock poisoned".to_owned()))
	}

	fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, WeightMap>> {
		self.entries
			.write()
			.map_err(|_| MarkovError::StoreUnavailable("store lock poisoned".to_owned()))
	}

	/// Number of keys currently stored (all prefixes).
	pub fn len(&self) -> Result<usize> {
		Ok(self.read()?.len())
	}

	/// True when no key is stored.
	pub fn is_empty(&self) -> Result<bool> {
		Ok(self.read()?.is_empty())
	}

	/// Serializes the store with `postcard` and writes it to `path`,
	/// embedding `params` for the load-time mismatch check.
	pub fn snapshot_to<P: AsRef<Path>>(&self, path: P, params: &ModelParams) -> Result<()> {
		let entries = self.read()?.clone();
		let snapshot = Snapshot { params: params.clone(), entries };
		let bytes = postcard::to_stdvec(&snapshot)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Loads a snapshot written by `snapshot_to`.
	///
	/// # Errors
	/// - `ParameterMismatch` when `params` differ from the snapshot's
	///   embedded build parameters.
	/// - `Io` / `Codec` on file or decoding failures.
	pub fn load_snapshot<P: AsRef<Path>>(path: P, params: &ModelParams) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		let snapshot: Snapshot = postcard::from_bytes(&bytes)?;
		snapshot.params.ensure_matches(params)?;
		Ok(Self { entries: RwLock::new(snapshot.entries) })
	}
}

impl Store for MemoryStore {
	fn increment(&self, key: &str, completion: &str, delta: u64) -> Result<u64> {
		let mut entries = self.write()?;
		let weight = entries
			.entry(key.to_owned())
			.or_default()
			.entry(completion.to_owned())
			.or_insert(0);
		*weight += delta;
		Ok(*weight)
	}

	fn top_completions(&self, key: &str) -> Result<Vec<(String, u64)>> {
		let entries = self.read()?;
		let mut completions: Vec<(String, u64)> = match entries.get(key) {
			Some(weights) => weights.iter().map(|(c, w)| (c.clone(), *w)).collect(),
			None => return Ok(Vec::new()),
		};
		completions.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
		Ok(completions)
	}

	fn max_weight(&self, key: &str) -> Result<u64> {
		let entries = self.read()?;
		Ok(entries
			.get(key)
			.and_then(|weights| weights.values().max().copied())
			.unwrap_or(0))
	}

	fn min_weight(&self, key: &str) -> Result<u64> {
		let entries = self.read()?;
		Ok(entries
			.get(key)
			.and_then(|weights| weights.values().min().copied())
			.unwrap_or(0))
	}

	fn weight_of(&self, key: &str, completion: &str) -> Result<u64> {
		let entries = self.read()?;
		Ok(entries
			.get(key)
			.and_then(|weights| weights.get(completion).copied())
			.unwrap_or(0))
	}

	fn random_key(&self, prefix: &str, rng: &mut dyn RngCore) -> Result<String> {
		let entries = self.read()?;
		let namespace = namespace(prefix);
		// Sorted so the same rng stream always picks the same key,
		// independent of map iteration order
		let mut keys: Vec<&String> = entries
			.keys()
			.filter(|key| key.starts_with(&namespace))
			.collect();
		keys.sort();
		keys.choose(rng)
			.map(|key| (*key).clone())
			.ok_or_else(|| MarkovError::EmptyModel(prefix.to_owned()))
	}

	fn keys_matching(&self, prefix: &str, substring: &str) -> Result<Vec<String>> {
		let entries = self.read()?;
		let namespace = namespace(prefix);
		Ok(entries
			.keys()
			.filter(|key| {
				key.starts_with(&namespace) && key[namespace.len()..].contains(substring)
			})
			.cloned()
			.collect())
	}

	fn delete_prefix(&self, prefix: &str) -> Result<u64> {
		let mut entries = self.write()?;
		let namespace = namespace(prefix);
		let before = entries.len();
		entries.retain(|key, _| !key.starts_with(&namespace));
		Ok((before - entries.len()) as u64)
	}
}
