//! Markov chain sequence modeling library.
//!
//! This crate provides a word- or character-level n-gram index and its
//! surrounding machinery:
//! - A key-value store abstraction with an in-memory implementation
//! - A sliding-window index builder fed by tokenized corpus records
//! - A weighted random sampler generating new sequences from the index
//! - A scorer rating how well a sequence fits the index
//! - A thin ingestion driver with tag filtering and throughput logging
//!
//! Corpus acquisition (feeds, dumps, mailboxes) is a concern of the
//! caller; this crate consumes tokenized text records and emits generated
//! sequences or scores.

/// Core model: store abstraction, index builder, sampler and scorer.
pub mod model;

/// Ingestion driver: corpus records, tokenizer contract, build loop.
pub mod ingest;

/// Error kinds and the crate-wide `Result` alias.
pub mod error;

/// I/O utilities (file loading, path helpers).
pub mod io;
