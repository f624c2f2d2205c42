use rand::prelude::IndexedRandom;
use rand::{Rng, RngCore};

use crate::error::{MarkovError, Result};
use crate::model::key;
use crate::model::key::STOP_TOKEN;
use crate::model::params::ModelParams;
use crate::model::store::Store;

/// Number of attempts made to find a relevance-filtered seed key before
/// falling back to a fully random one.
const SEED_RETRY_BUDGET: usize = 10;

/// Draws one completion proportionally to its weight.
///
/// Draws a uniform value in `[0, total)` and scans the candidates in their
/// fixed ranked order, subtracting each weight, selecting the first
/// candidate where the remainder goes below its weight. Returns `None`
/// when there is no candidate (or all weights are zero, which the
/// increment-only store never produces).
pub(crate) fn draw_completion(
	completions: &[(String, u64)],
	rng: &mut dyn RngCore,
) -> Option<String> {
	let total: u64 = completions.iter().map(|(_, weight)| weight).sum();
	if total == 0 {
		return None;
	}

	let mut remainder = rng.random_range(0..total);
	let mut fallback = None;
	for (completion, weight) in completions {
		if remainder < *weight {
			return Some(completion.clone());
		}
		remainder -= weight;
		fallback = Some(completion.clone());
	}

	// Unreachable with consistent weights, kept for safety
	fallback
}

/// Searches for a seed key containing at least one of `relevant_terms`,
/// picking uniformly among matches.
///
/// # Errors
/// `NoRelevantKeyFound` once the retry budget is exhausted; the caller
/// falls back to `random_key`.
fn relevant_key<S>(store: &S, prefix: &str, relevant_terms: &[String], rng: &mut dyn RngCore) -> Result<String>
where
	S: Store + ?Sized,
{
	for _ in 0..SEED_RETRY_BUDGET {
		let mut matches = Vec::new();
		for term in relevant_terms {
			matches.extend(store.keys_matching(prefix, term)?);
		}
		matches.sort();
		matches.dedup();
		if let Some(found) = matches.choose(rng) {
			return Ok(found.clone());
		}
	}
	Err(MarkovError::NoRelevantKeyFound { tries: SEED_RETRY_BUDGET })
}

/// Selects a seed for generation and splits it back into tokens.
///
/// With relevant terms, tries the filtered search first and falls back to
/// a fully random key; without terms, picks a random key directly.
///
/// # Errors
/// `EmptyModel` when no key exists under the prefix.
fn random_seed<S>(store: &S, prefix: &str, relevant_terms: &[String], rng: &mut dyn RngCore) -> Result<Vec<String>>
where
	S: Store + ?Sized,
{
	let selected = if relevant_terms.is_empty() {
		store.random_key(prefix, rng)?
	} else {
		match relevant_key(store, prefix, relevant_terms, rng) {
			Ok(found) => found,
			Err(MarkovError::NoRelevantKeyFound { tries }) => {
				log::debug!("no relevant key after {tries} tries, falling back to a random seed");
				store.random_key(prefix, rng)?
			}
			Err(other) => return Err(other),
		}
	};
	Ok(key::split_key(prefix, &selected))
}

/// Removes one trailing Stop Marker, if present.
fn strip_trailing_stop(partial: &mut Vec<String>) {
	if partial.last().map(String::as_str) == Some(STOP_TOKEN) {
		partial.pop();
	}
}

/// Generates a token sequence by walking the store from a seed.
///
/// # Parameters
/// - `rng`: Randomness source; every draw, including the seed selection,
///   comes from it, so a seeded rng makes the whole walk reproducible.
/// - `seed`: Starting tokens; when `None` one is selected from the store.
/// - `max_tokens`: Hard ceiling on the returned sequence length. The loop
///   is bounded by this ceiling, so generation terminates even if the
///   model never yields a Stop Marker.
/// - `relevant_terms`: Optional terms biasing the seed selection.
///
/// # Behavior
/// Each step keys on the last `key_length` tokens and draws the next
/// completion by weight. A key with no completion ends the walk (this is
/// how a drawn Stop Marker terminates generation, since stop states are
/// never indexed). A completion is appended only while the total stays
/// within `max_tokens`; a trailing Stop Marker is stripped from the
/// result.
///
/// # Errors
/// `EmptyModel` when a seed is requested from a model with no keys.
pub(crate) fn generate_with<S>(
	store: &S,
	params: &ModelParams,
	rng: &mut dyn RngCore,
	seed: Option<&[String]>,
	max_tokens: usize,
	relevant_terms: &[String],
) -> Result<Vec<String>>
where
	S: Store + ?Sized,
{
	let mut partial: Vec<String> = match seed {
		Some(tokens) => tokens.to_vec(),
		None => random_seed(store, &params.prefix, relevant_terms, rng)?,
	};

	// Every iteration either appends at least one token or returns, so
	// max_tokens iterations are always enough.
	for _ in 0..max_tokens {
		let start = partial.len().saturating_sub(params.key_length);
		let current_key = key::encode_key(&params.prefix, &partial[start..])?;

		let completions = store.top_completions(&current_key)?;
		let Some(completion) = draw_completion(&completions, rng) else {
			strip_trailing_stop(&mut partial);
			return Ok(partial);
		};

		let completion_tokens = key::split_completion(&completion);
		let next_len = partial.len() + completion_tokens.len();
		if next_len < max_tokens {
			partial.extend(completion_tokens);
		} else if next_len == max_tokens {
			partial.extend(completion_tokens);
			strip_trailing_stop(&mut partial);
			return Ok(partial);
		} else {
			// Appending would exceed the ceiling
			return Ok(partial);
		}
	}

	strip_trailing_stop(&mut partial);
	Ok(partial)
}
