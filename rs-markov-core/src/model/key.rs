use crate::error::{MarkovError, Result};
use crate::model::params::ModelParams;

/// Separator used between the prefix and the tokens of an encoded key.
///
/// No token may contain this character; encoding rejects offenders with
/// `InvalidToken` so that a key can always be split back into its tokens.
pub const SEPARATOR: char = '§';

/// Reserved padding token representing the sequence-initial state.
pub const START_TOKEN: &str = "°";

/// Reserved sentinel token meaning "end of sequence".
pub const STOP_TOKEN: &str = "\u{0002}";

/// Default namespace prefix for model keys.
pub const DEFAULT_PREFIX: &str = "markov";

/// Encodes a window of tokens into a namespaced n-gram key.
///
/// The key is `prefix § t1 § t2 § ... § tn`. Two identical token windows
/// always encode to the same key.
///
/// # Errors
/// Returns `InvalidToken` if any token contains the separator.
pub(crate) fn encode_key(prefix: &str, tokens: &[String]) -> Result<String> {
	let mut key = String::from(prefix);
	for token in tokens {
		if token.contains(SEPARATOR) {
			return Err(MarkovError::InvalidToken(token.clone()));
		}
		key.push(SEPARATOR);
		key.push_str(token);
	}
	Ok(key)
}

/// Encodes a completion tuple; single tokens are stored as-is, longer
/// tuples are joined with the separator (same encoding as keys, without
/// the namespace prefix).
pub(crate) fn encode_completion(tokens: &[String]) -> Result<String> {
	for token in tokens {
		if token.contains(SEPARATOR) {
			return Err(MarkovError::InvalidToken(token.clone()));
		}
	}
	Ok(tokens.join(&SEPARATOR.to_string()))
}

/// Splits an encoded key back into its constituent tokens.
///
/// The leading prefix segment is dropped, so the result is a usable
/// generation seed.
pub(crate) fn split_key(prefix: &str, key: &str) -> Vec<String> {
	let tokens = key.strip_prefix(prefix).unwrap_or(key);
	tokens
		.split(SEPARATOR)
		.filter(|segment| !segment.is_empty())
		.map(str::to_owned)
		.collect()
}

/// Splits an encoded completion into tokens.
pub(crate) fn split_completion(completion: &str) -> Vec<String> {
	completion.split(SEPARATOR).map(str::to_owned).collect()
}

/// Computes the `(key, completion)` pair for the window starting at the
/// beginning of `tokens`, or `None` when the window yields no pair.
///
/// # Behavior
/// - Fewer than `key_length` tokens: no pair.
/// - A Stop Marker inside the key window: no pair (stop states are never
///   indexed, which is what terminates generation).
/// - `completion_length == 1` and no token follows the window: the
///   completion is the Stop Marker.
/// - `completion_length > 1`: the completion is the next available tokens
///   (up to `completion_length`); zero remaining tokens yield no pair.
pub(crate) fn window_pair(params: &ModelParams, tokens: &[String]) -> Result<Option<(String, String)>> {
	let key_length = params.key_length;
	if tokens.len() < key_length {
		return Ok(None);
	}

	let window = &tokens[..key_length];
	if window.iter().any(|token| token == STOP_TOKEN) {
		return Ok(None);
	}

	let key = encode_key(&params.prefix, window)?;
	let completion = if params.completion_length == 1 {
		match tokens.get(key_length) {
			Some(next) => encode_completion(std::slice::from_ref(next))?,
			None => STOP_TOKEN.to_owned(),
		}
	} else {
		let end = (key_length + params.completion_length).min(tokens.len());
		let rest = &tokens[key_length..end];
		if rest.is_empty() {
			return Ok(None);
		}
		encode_completion(rest)?
	};

	Ok(Some((key, completion)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn toks(words: &[&str]) -> Vec<String> {
		words.iter().map(|w| (*w).to_owned()).collect()
	}

	fn params(key_length: usize, completion_length: usize) -> ModelParams {
		ModelParams::new("mkv", key_length, completion_length).unwrap()
	}

	#[test]
	fn key_encoding_is_deterministic_and_reversible() {
		let key = encode_key("mkv", &toks(&["the", "cat"])).unwrap();
		assert_eq!(key, "mkv§the§cat");
		assert_eq!(split_key("mkv", &key), toks(&["the", "cat"]));
	}

	#[test]
	fn tokens_with_separator_are_rejected() {
		let result = encode_key("mkv", &toks(&["a§b"]));
		assert!(matches!(result, Err(MarkovError::InvalidToken(_))));
		let result = encode_completion(&toks(&["a§b"]));
		assert!(matches!(result, Err(MarkovError::InvalidToken(_))));
	}

	#[test]
	fn short_window_yields_no_pair() {
		let pair = window_pair(&params(3, 1), &toks(&["a", "b"])).unwrap();
		assert!(pair.is_none());
	}

	#[test]
	fn stop_marker_in_window_yields_no_pair() {
		let tokens = vec!["a".to_owned(), STOP_TOKEN.to_owned(), "b".to_owned()];
		let pair = window_pair(&params(2, 1), &tokens).unwrap();
		assert!(pair.is_none());
	}

	#[test]
	fn end_of_sequence_completes_with_stop_marker() {
		let pair = window_pair(&params(2, 1), &toks(&["a", "b"])).unwrap();
		let (key, completion) = pair.unwrap();
		assert_eq!(key, "mkv§a§b");
		assert_eq!(completion, STOP_TOKEN);
	}

	#[test]
	fn multi_token_completion_is_joined() {
		let pair = window_pair(&params(1, 2), &toks(&["a", "b", "c"])).unwrap();
		let (key, completion) = pair.unwrap();
		assert_eq!(key, "mkv§a");
		assert_eq!(completion, "b§c");
		assert_eq!(split_completion(&completion), toks(&["b", "c"]));
	}

	#[test]
	fn multi_token_completion_truncates_at_end_of_sequence() {
		// Only one token remains after the window
		let pair = window_pair(&params(1, 2), &toks(&["a", "b"])).unwrap();
		assert_eq!(pair.unwrap().1, "b");
		// Nothing remains: the window yields no pair
		let pair = window_pair(&params(1, 2), &toks(&["a"])).unwrap();
		assert!(pair.is_none());
	}
}
