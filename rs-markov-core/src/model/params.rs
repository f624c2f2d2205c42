use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::model::key::{DEFAULT_PREFIX, SEPARATOR, START_TOKEN};

/// Parameters of a model instance, fixed at construction time.
///
/// The same values must be used at build, generation and scoring time;
/// they are embedded in persisted snapshots so that a mismatch is detected
/// on load instead of silently producing key misses.
///
/// # Invariants
/// - `key_length >= 1` and `completion_length >= 1`
/// - `prefix` is non-empty and does not contain the key separator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelParams {
	/// Namespace prefix distinguishing this model's keys within a shared store.
	pub prefix: String,

	/// Number of consecutive tokens forming an n-gram key.
	pub key_length: usize,

	/// Number of tokens per completion (1 for single-token completions).
	pub completion_length: usize,
}

impl ModelParams {
	/// Creates validated model parameters.
	///
	/// # Errors
	/// Returns `InvalidParameters` if either length is zero or the prefix
	/// is empty or contains the reserved separator.
	pub fn new(prefix: &str, key_length: usize, completion_length: usize) -> Result<Self> {
		if key_length == 0 {
			return Err(MarkovError::InvalidParameters("key_length must be >= 1".to_owned()));
		}
		if completion_length == 0 {
			return Err(MarkovError::InvalidParameters("completion_length must be >= 1".to_owned()));
		}
		if prefix.is_empty() {
			return Err(MarkovError::InvalidParameters("prefix must not be empty".to_owned()));
		}
		if prefix.contains(SEPARATOR) {
			return Err(MarkovError::InvalidParameters(format!(
				"prefix {prefix:?} contains the reserved separator"
			)));
		}
		Ok(Self { prefix: prefix.to_owned(), key_length, completion_length })
	}

	/// Returns the start sequence for this model: `key_length` Start Markers,
	/// prepended to every ingested line so that sentence-initial states are
	/// represented in the index.
	pub fn start_sequence(&self) -> Vec<String> {
		vec![START_TOKEN.to_owned(); self.key_length]
	}

	/// Checks another set of parameters against this one.
	///
	/// # Errors
	/// Returns `ParameterMismatch` when the lengths differ. Prefixes are not
	/// compared: distinct prefixes address distinct models by design.
	pub fn ensure_matches(&self, requested: &ModelParams) -> Result<()> {
		if self.key_length != requested.key_length
			|| self.completion_length != requested.completion_length
		{
			return Err(MarkovError::ParameterMismatch {
				stored_key_length: self.key_length,
				stored_completion_length: self.completion_length,
				requested_key_length: requested.key_length,
				requested_completion_length: requested.completion_length,
			});
		}
		Ok(())
	}
}

impl Default for ModelParams {
	/// Bigram keys with single-token completions under the default prefix.
	fn default() -> Self {
		Self { prefix: DEFAULT_PREFIX.to_owned(), key_length: 2, completion_length: 1 }
	}
}
