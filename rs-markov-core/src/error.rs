use thiserror::Error;

/// Error type covering model, store and ingestion failures.
///
/// # Recovery policy
/// - `MalformedRecord` and `InvalidToken` are per-record errors: the ingestion
///   driver logs them, counts them and continues with the next record.
/// - `NoRelevantKeyFound` is recovered internally by falling back to a fully
///   random seed key.
/// - `StoreUnavailable` and `ParameterMismatch` are fatal for the whole run;
///   no retry is attempted, the caller must abort.
#[derive(Debug, Error)]
pub enum MarkovError {
	/// No keys exist under the configured prefix; raised when a random
	/// seed is requested from a model that was never built (or was flushed).
	#[error("no keys under prefix '{0}': the model is empty")]
	EmptyModel(String),

	/// The relevance-filtered seed search exhausted its retry budget.
	/// Never surfaced to callers of `generate`; the sampler falls back
	/// to a fully random key instead.
	#[error("no key matching the relevant terms after {tries} tries")]
	NoRelevantKeyFound { tries: usize },

	/// An ingestion record is unusable (e.g. empty text).
	#[error("malformed record: {0}")]
	MalformedRecord(String),

	/// A token contains the reserved key separator and cannot be encoded.
	#[error("token {0:?} contains the reserved separator")]
	InvalidToken(String),

	/// The underlying store failed (lock poisoned, connection lost).
	/// Partial writes under a failed store risk inconsistent weights,
	/// so this always aborts the run.
	#[error("store unavailable: {0}")]
	StoreUnavailable(String),

	/// The model parameters supplied at generate/score time differ from
	/// the ones used at build time.
	#[error(
		"parameter mismatch: stored model was built with key_length={stored_key_length}, \
		completion_length={stored_completion_length}, requested key_length={requested_key_length}, \
		completion_length={requested_completion_length}"
	)]
	ParameterMismatch {
		stored_key_length: usize,
		stored_completion_length: usize,
		requested_key_length: usize,
		requested_completion_length: usize,
	},

	/// The model parameters are invalid on their own (zero lengths,
	/// separator inside the prefix, ...).
	#[error("invalid parameters: {0}")]
	InvalidParameters(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// Snapshot serialization or deserialization failed.
	#[error("snapshot codec error: {0}")]
	Codec(#[from] postcard::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, MarkovError>;
