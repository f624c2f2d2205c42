use crate::error::Result;
use crate::model::key;
use crate::model::params::ModelParams;
use crate::model::store::Store;

/// Rates how well a token sequence fits the index.
///
/// Replays the builder's windowing over `tokens` without mutating the
/// store. Each valid window contributes
/// `weight_of(key, completion) / max(max_weight(key), 1) * 100`; the
/// result is the arithmetic mean over all evaluated windows, or `0.0`
/// when no window was evaluated (sequence shorter than the key length).
///
/// The scale is a 0-100 heuristic: 100 means every window's completion
/// was the single most frequent observed continuation, 0 means no
/// observed support at all.
///
/// Iterative on purpose: long sequences must not grow the stack.
pub(crate) fn score_line<S: Store + ?Sized>(
	store: &S,
	params: &ModelParams,
	tokens: &[String],
) -> Result<f64> {
	let mut total = 0.0;
	let mut windows = 0u64;

	for start in 0..tokens.len() {
		let rest = &tokens[start..];
		if rest.len() < params.key_length {
			break;
		}
		let Some((window_key, completion)) = key::window_pair(params, rest)? else {
			continue;
		};

		let weight = store.weight_of(&window_key, &completion)? as f64;
		let maximum = store.max_weight(&window_key)?.max(1) as f64;
		total += weight / maximum * 100.0;
		windows += 1;
	}

	if windows == 0 {
		Ok(0.0)
	} else {
		Ok(total / windows as f64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::markov::Markov;
	use crate::model::store::MemoryStore;

	fn toks(words: &[&str]) -> Vec<String> {
		words.iter().map(|w| (*w).to_owned()).collect()
	}

	fn model(key_length: usize) -> Markov<MemoryStore> {
		let params = ModelParams::new("mkv", key_length, 1).unwrap();
		Markov::new(MemoryStore::new(), params).unwrap()
	}

	#[test]
	fn indexed_sequences_score_above_zero() {
		let markov = model(2);
		let line = toks(&["the", "cat", "sat", "down"]);
		markov.ingest(&line).unwrap();
		assert!(markov.score(&line).unwrap() > 0.0);
	}

	#[test]
	fn single_path_corpus_scores_one_hundred() {
		let markov = model(1);
		let line = toks(&["a", "b", "c"]);
		markov.ingest(&line).unwrap();
		// Every completion is the single most frequent one for its key
		assert_eq!(markov.score(&line).unwrap(), 100.0);
	}

	#[test]
	fn unsupported_sequences_score_zero() {
		let markov = model(1);
		markov.ingest(&toks(&["a", "b", "c"])).unwrap();
		assert_eq!(markov.score(&toks(&["x", "y", "z"])).unwrap(), 0.0);
	}

	#[test]
	fn sequences_shorter_than_the_key_score_zero() {
		let markov = model(3);
		markov.ingest(&toks(&["a", "b", "c", "d"])).unwrap();
		assert_eq!(markov.score(&toks(&["a", "b"])).unwrap(), 0.0);
	}

	#[test]
	fn less_frequent_completions_lower_the_score() {
		let markov = model(1);
		markov.ingest(&toks(&["the", "cat"])).unwrap();
		markov.ingest(&toks(&["the", "cat"])).unwrap();
		markov.ingest(&toks(&["the", "dog"])).unwrap();

		let cat = markov.score(&toks(&["the", "cat"])).unwrap();
		let dog = markov.score(&toks(&["the", "dog"])).unwrap();
		assert!(cat > dog, "cat={cat} dog={dog}");
	}
}
