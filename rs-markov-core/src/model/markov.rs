use rand::Rng;

use crate::error::Result;
use crate::model::params::ModelParams;
use crate::model::store::Store;
use crate::model::{generator, key, scorer};

/// A Markov chain model bound to an explicit store handle.
///
/// Owns the model parameters, fixed at construction: build, generation and
/// scoring all go through the same handle, so the key/completion lengths
/// cannot drift between them within a process. Across processes the
/// parameters travel inside store snapshots (see `MemoryStore`).
///
/// # Responsibilities
/// - Index token sequences with a sliding window (build)
/// - Generate new sequences by weighted sampling (generate)
/// - Rate how well an existing sequence fits the index (score)
/// - Flush the whole namespace
///
/// # Invariants
/// - Weights in the store only grow; `flush` is the only way to remove them
/// - Windows containing the Stop Marker are never indexed
#[derive(Debug)]
pub struct Markov<S: Store> {
	store: S,
	params: ModelParams,
}

impl<S: Store> Markov<S> {
	/// Binds a model to a store handle with validated parameters.
	pub fn new(store: S, params: ModelParams) -> Result<Self> {
		// Re-validate: params may come from deserialized input
		let params = ModelParams::new(&params.prefix, params.key_length, params.completion_length)?;
		Ok(Self { store, params })
	}

	/// The underlying store handle.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// The model parameters.
	pub fn params(&self) -> &ModelParams {
		&self.params
	}

	/// Indexes one token sequence.
	///
	/// Slides a window of `key_length` tokens one position at a time; each
	/// valid window increments the weight of its observed completion by 1.
	/// Repeated windows within the same call increment repeatedly, which is
	/// what makes frequent continuations heavier. Sequences shorter than
	/// `key_length` are a no-op.
	pub fn ingest(&self, tokens: &[String]) -> Result<()> {
		for start in 0..tokens.len() {
			let rest = &tokens[start..];
			if rest.len() < self.params.key_length {
				break;
			}
			if let Some((window_key, completion)) = key::window_pair(&self.params, rest)? {
				self.store.increment(&window_key, &completion, 1)?;
			}
		}
		Ok(())
	}

	/// Scores how well `tokens` fit the index; see the scorer module.
	pub fn score(&self, tokens: &[String]) -> Result<f64> {
		scorer::score_line(&self.store, &self.params, tokens)
	}

	/// Generates a sequence using the thread-local randomness source.
	///
	/// See `generate_with` for the parameters and termination rules.
	pub fn generate(
		&self,
		seed: Option<&[String]>,
		max_tokens: usize,
		relevant_terms: &[String],
	) -> Result<Vec<String>> {
		self.generate_with(&mut rand::rng(), seed, max_tokens, relevant_terms)
	}

	/// Generates a sequence with an injected randomness source.
	///
	/// Seed selection draws from `rng` too, so a seeded rng reproduces
	/// the whole walk, custom seed or not.
	pub fn generate_with<R: Rng>(
		&self,
		rng: &mut R,
		seed: Option<&[String]>,
		max_tokens: usize,
		relevant_terms: &[String],
	) -> Result<Vec<String>> {
		generator::generate_with(&self.store, &self.params, rng, seed, max_tokens, relevant_terms)
	}

	/// Deletes every key under the model's prefix.
	/// Returns the number of deleted keys.
	pub fn flush(&self) -> Result<u64> {
		self.store.delete_prefix(&self.params.prefix)
	}
}
