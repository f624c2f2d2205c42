use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::model::key::SEPARATOR;
use crate::model::markov::Markov;
use crate::model::store::Store;

/// One corpus record as consumed by the build operation.
///
/// Fields beyond these are ignored on deserialization; how records are
/// acquired (feeds, dumps, mailboxes) is a concern of the caller.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CorpusRecord {
	/// Raw text of the record, tokenized by the driver.
	pub text: String,

	/// Optional classification tags, used by the tag filter.
	#[serde(default)]
	pub tags: Option<HashSet<String>>,
}

impl CorpusRecord {
	/// Creates an untagged record.
	pub fn text(text: impl Into<String>) -> Self {
		Self { text: text.into(), tags: None }
	}

	/// Creates a tagged record.
	pub fn tagged<I, T>(text: impl Into<String>, tags: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Into<String>,
	{
		Self {
			text: text.into(),
			tags: Some(tags.into_iter().map(Into::into).collect()),
		}
	}
}

/// Maps text to an ordered token sequence and back.
///
/// The same pair must be used consistently across build, generation and
/// scoring for a given index; mixing tokenizers silently invalidates the
/// model.
pub trait Tokenizer {
	/// Splits text into tokens.
	fn tokenize(&self, text: &str) -> Vec<String>;

	/// Joins tokens back into text.
	fn join(&self, tokens: &[String]) -> String;
}

/// Word-level tokenizer splitting on whitespace.
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		text.split_whitespace().map(str::to_owned).collect()
	}

	fn join(&self, tokens: &[String]) -> String {
		tokens.join(" ")
	}
}

/// Character-level tokenizer (UTF-8 aware, one token per char).
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		text.chars().map(String::from).collect()
	}

	fn join(&self, tokens: &[String]) -> String {
		tokens.concat()
	}
}

/// Options for a build run.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
	/// Records are indexed only if they carry at least one of these tags.
	/// Empty set: no filtering.
	pub tag_filter: HashSet<String>,

	/// Number of leading records to ignore (used to resume a partial run).
	pub skip_to: usize,
}

/// Counters reported by a build run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
	pub records_seen: u64,
	pub records_indexed: u64,
	pub records_skipped: u64,
	pub records_malformed: u64,
	pub tokens: u64,
}

impl BuildStats {
	fn absorb(&mut self, other: &BuildStats) {
		self.records_seen += other.records_seen;
		self.records_indexed += other.records_indexed;
		self.records_skipped += other.records_skipped;
		self.records_malformed += other.records_malformed;
		self.tokens += other.tokens;
	}
}

/// Interval (in records) between throughput log lines.
const LOG_EVERY: u64 = 1000;

/// Validates and tokenizes one record, with the start sequence prepended.
///
/// Token validation happens here, before any store write: a record that
/// is rejected must contribute nothing to the index, and `Markov::ingest`
/// would already have incremented the windows preceding a bad token.
///
/// # Errors
/// - `MalformedRecord` when the record text is blank.
/// - `InvalidToken` when a token contains the reserved separator.
fn record_tokens<S, T>(markov: &Markov<S>, tokenizer: &T, record: &CorpusRecord) -> Result<Vec<String>>
where
	S: Store,
	T: Tokenizer + ?Sized,
{
	if record.text.trim().is_empty() {
		return Err(MarkovError::MalformedRecord("record has no text".to_owned()));
	}
	let mut tokens = markov.params().start_sequence();
	tokens.extend(tokenizer.tokenize(&record.text));
	if let Some(bad) = tokens.iter().find(|token| token.contains(SEPARATOR)) {
		return Err(MarkovError::InvalidToken(bad.clone()));
	}
	Ok(tokens)
}

/// True when the record passes the tag filter.
///
/// With a non-empty filter, a record with no tags is rejected, and a
/// tagged record needs at least one tag in common with the filter set.
fn passes_tag_filter(record: &CorpusRecord, tag_filter: &HashSet<String>) -> bool {
	if tag_filter.is_empty() {
		return true;
	}
	match &record.tags {
		None => false,
		Some(tags) => !tags.is_disjoint(tag_filter),
	}
}

/// Builds the index from an iterator of corpus records.
///
/// # Behavior
/// - Honors `skip_to`, then applies the tag filter.
/// - Blank records and records whose tokens contain the reserved
///   separator are counted as malformed, logged, and skipped; ingestion
///   continues with the next record.
/// - Every indexed record gets the start sequence prepended before the
///   sliding-window pass.
/// - Throughput is logged every 1000 records.
///
/// # Errors
/// Store failures (`StoreUnavailable`) abort the run; partial writes
/// under a failed store must not silently accumulate.
pub fn build_index<S, T, I>(
	markov: &Markov<S>,
	tokenizer: &T,
	records: I,
	options: &BuildOptions,
) -> Result<BuildStats>
where
	S: Store,
	T: Tokenizer + ?Sized,
	I: IntoIterator<Item = CorpusRecord>,
{
	let started = Instant::now();
	let mut stats = BuildStats::default();

	for record in records {
		stats.records_seen += 1;
		if stats.records_seen <= options.skip_to as u64 {
			stats.records_skipped += 1;
			continue;
		}
		if !passes_tag_filter(&record, &options.tag_filter) {
			stats.records_skipped += 1;
			continue;
		}

		let tokens = match record_tokens(markov, tokenizer, &record) {
			Ok(tokens) => tokens,
			Err(MarkovError::MalformedRecord(reason)) => {
				log::warn!("skipping malformed record {}: {reason}", stats.records_seen);
				stats.records_malformed += 1;
				continue;
			}
			Err(MarkovError::InvalidToken(token)) => {
				log::warn!(
					"skipping record {}: token {token:?} contains the reserved separator",
					stats.records_seen
				);
				stats.records_malformed += 1;
				continue;
			}
			Err(other) => return Err(other),
		};

		markov.ingest(&tokens)?;
		stats.records_indexed += 1;
		stats.tokens += tokens.len() as u64;
		if stats.records_indexed % LOG_EVERY == 0 {
			let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
			log::info!(
				"indexed {} records ({} tokens) in {elapsed:.1}s [{:.0} records/s]",
				stats.records_indexed,
				stats.tokens,
				stats.records_indexed as f64 / elapsed
			);
		}
	}

	let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
	log::info!(
		"build done: {} seen, {} indexed, {} skipped, {} malformed, {} tokens in {elapsed:.1}s",
		stats.records_seen,
		stats.records_indexed,
		stats.records_skipped,
		stats.records_malformed,
		stats.tokens
	);
	Ok(stats)
}

/// Builds the index from a record set using one thread per chunk.
///
/// Splits the records into `num_cpus * 8` chunks processed by scoped
/// threads sharing the same store handle; per-key atomic increments make
/// this safe without cross-key coordination. `skip_to` is applied before
/// chunking so resuming behaves exactly like the sequential build.
pub fn build_index_parallel<S, T>(
	markov: &Markov<S>,
	tokenizer: &T,
	records: Vec<CorpusRecord>,
	options: &BuildOptions,
) -> Result<BuildStats>
where
	S: Store,
	T: Tokenizer + Sync + ?Sized,
{
	let mut stats = BuildStats {
		records_seen: options.skip_to.min(records.len()) as u64,
		records_skipped: options.skip_to.min(records.len()) as u64,
		..BuildStats::default()
	};
	let remaining = &records[options.skip_to.min(records.len())..];
	if remaining.is_empty() {
		return Ok(stats);
	}

	let chunks = num_cpus::get() * 8;
	let chunk_size = remaining.len().div_ceil(chunks);
	let chunk_options = BuildOptions { tag_filter: options.tag_filter.clone(), skip_to: 0 };

	let partials: Vec<Result<BuildStats>> = std::thread::scope(|scope| {
		let handles: Vec<_> = remaining
			.chunks(chunk_size)
			.map(|chunk| {
				let chunk_options = &chunk_options;
				scope.spawn(move || {
					build_index(markov, tokenizer, chunk.iter().cloned(), chunk_options)
				})
			})
			.collect();
		handles.into_iter().map(|handle| handle.join().expect("ingestion thread panicked")).collect()
	});

	for partial in partials {
		stats.absorb(&partial?);
	}
	Ok(stats)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::params::ModelParams;
	use crate::model::store::{MemoryStore, Store};

	fn model(key_length: usize) -> Markov<MemoryStore> {
		let params = ModelParams::new("mkv", key_length, 1).unwrap();
		Markov::new(MemoryStore::new(), params).unwrap()
	}

	fn filter(tags: &[&str]) -> HashSet<String> {
		tags.iter().map(|t| (*t).to_owned()).collect()
	}

	#[test]
	fn tag_filter_keeps_only_intersecting_records() {
		let markov = model(1);
		let options = BuildOptions { tag_filter: filter(&["b"]), skip_to: 0 };
		let records = vec![
			CorpusRecord::tagged("x", ["a"]),
			CorpusRecord::tagged("x", ["a", "b"]),
			CorpusRecord::text("x"),
		];
		let stats = build_index(&markov, &WhitespaceTokenizer, records, &options).unwrap();
		assert_eq!(stats.records_seen, 3);
		assert_eq!(stats.records_indexed, 1);
		assert_eq!(stats.records_skipped, 2);
		// Only the {"a","b"} record reached the index
		assert_eq!(markov.store().weight_of("mkv§x", "\u{0002}").unwrap(), 1);
	}

	#[test]
	fn empty_filter_indexes_everything() {
		let markov = model(1);
		let records = vec![
			CorpusRecord::tagged("x y", ["a"]),
			CorpusRecord::text("y z"),
		];
		let stats =
			build_index(&markov, &WhitespaceTokenizer, records, &BuildOptions::default()).unwrap();
		assert_eq!(stats.records_indexed, 2);
	}

	#[test]
	fn skip_to_ignores_leading_records() {
		let markov = model(1);
		let options = BuildOptions { skip_to: 2, ..BuildOptions::default() };
		let records = vec![
			CorpusRecord::text("a b"),
			CorpusRecord::text("c d"),
			CorpusRecord::text("e f"),
		];
		let stats = build_index(&markov, &WhitespaceTokenizer, records, &options).unwrap();
		assert_eq!(stats.records_skipped, 2);
		assert_eq!(stats.records_indexed, 1);
		assert_eq!(markov.store().weight_of("mkv§e", "f").unwrap(), 1);
		assert_eq!(markov.store().weight_of("mkv§a", "b").unwrap(), 0);
	}

	#[test]
	fn malformed_records_are_counted_and_skipped() {
		let markov = model(1);
		let records = vec![
			CorpusRecord::text("   "),
			CorpusRecord::text("a§b c"),
			CorpusRecord::text("a b"),
		];
		let stats =
			build_index(&markov, &WhitespaceTokenizer, records, &BuildOptions::default()).unwrap();
		assert_eq!(stats.records_malformed, 2);
		assert_eq!(stats.records_indexed, 1);
	}

	#[test]
	fn separator_token_mid_line_leaves_no_partial_writes() {
		let markov = model(1);
		let records = vec![CorpusRecord::text("ok b§c d")];
		let stats =
			build_index(&markov, &WhitespaceTokenizer, records, &BuildOptions::default()).unwrap();
		assert_eq!(stats.records_malformed, 1);
		assert_eq!(stats.records_indexed, 0);
		assert_eq!(stats.tokens, 0);
		// The windows before the bad token must not have been indexed
		assert_eq!(markov.store().weight_of("mkv§°", "ok").unwrap(), 0);
		assert!(markov.store().is_empty().unwrap());
	}

	#[test]
	fn start_sequence_is_prepended() {
		let markov = model(2);
		let records = vec![CorpusRecord::text("hello")];
		build_index(&markov, &WhitespaceTokenizer, records, &BuildOptions::default()).unwrap();
		// The sentence-initial state ° ° -> hello is indexed
		assert_eq!(markov.store().weight_of("mkv§°§°", "hello").unwrap(), 1);
	}

	#[test]
	fn char_tokenizer_round_trips() {
		let text = "héllo";
		let tokens = CharTokenizer.tokenize(text);
		assert_eq!(tokens.len(), 5);
		assert_eq!(CharTokenizer.join(&tokens), text);
	}

	#[test]
	fn parallel_build_matches_sequential_totals() {
		let records: Vec<CorpusRecord> = (0..200)
			.map(|i| CorpusRecord::text(format!("a b c d {}", i % 7)))
			.collect();

		let sequential = model(1);
		let serial_stats = build_index(
			&sequential,
			&WhitespaceTokenizer,
			records.clone(),
			&BuildOptions::default(),
		)
		.unwrap();

		let parallel = model(1);
		let parallel_stats = build_index_parallel(
			&parallel,
			&WhitespaceTokenizer,
			records,
			&BuildOptions::default(),
		)
		.unwrap();

		assert_eq!(serial_stats, parallel_stats);
		assert_eq!(
			sequential.store().weight_of("mkv§a", "b").unwrap(),
			parallel.store().weight_of("mkv§a", "b").unwrap()
		);
		assert_eq!(
			sequential.store().weight_of("mkv§d", "0").unwrap(),
			parallel.store().weight_of("mkv§d", "0").unwrap()
		);
	}
}
