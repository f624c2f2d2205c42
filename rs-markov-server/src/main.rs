use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, delete, get, put, web};

use serde::Deserialize;
use rs_markov_core::error::MarkovError;
use rs_markov_core::ingest::{BuildOptions, CorpusRecord, Tokenizer, WhitespaceTokenizer, build_index};
use rs_markov_core::model::key::START_TOKEN;
use rs_markov_core::model::markov::Markov;
use rs_markov_core::model::params::ModelParams;
use rs_markov_core::model::store::MemoryStore;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	seed: Option<String>,
	count: Option<usize>,
	max_length: Option<usize>,
	terms: Option<String>,
}

/// Struct representing query parameters for the `/v1/score` endpoint
#[derive(Deserialize)]
struct ScoreParams {
	text: String,
}

struct SharedData {
	markov: Markov<MemoryStore>,
}

/// Maps a core error to an HTTP response; an empty model is the caller's
/// problem, everything else is ours.
fn error_response(error: MarkovError) -> HttpResponse {
	match error {
		MarkovError::EmptyModel(_) => HttpResponse::NotFound().body(error.to_string()),
		MarkovError::InvalidParameters(_) | MarkovError::ParameterMismatch { .. } => {
			HttpResponse::BadRequest().body(error.to_string())
		}
		other => HttpResponse::InternalServerError().body(other.to_string()),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `count` sequences from the model, one per line of the
/// response body. A custom seed is tokenized and padded with the start
/// sequence; comma-separated `terms` bias the seed selection.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let count = query.count.unwrap_or(1);
	let max_length = query.max_length.unwrap_or(1000);
	let tokenizer = WhitespaceTokenizer;

	let terms: Vec<String> = query
		.terms
		.as_deref()
		.unwrap_or("")
		.split(',')
		.map(str::trim)
		.filter(|term| !term.is_empty())
		.map(str::to_owned)
		.collect();

	let seed = query.seed.as_deref().map(|text| {
		let mut tokens = data.markov.params().start_sequence();
		tokens.extend(tokenizer.tokenize(text));
		tokens
	});

	let mut lines = Vec::with_capacity(count);
	for _ in 0..count {
		let generated = match data.markov.generate(seed.as_deref(), max_length, &terms) {
			Ok(sequence) => sequence,
			Err(e) => return error_response(e),
		};
		// The padding is an artifact of indexing, not part of the text
		let visible: Vec<String> = generated
			.into_iter()
			.skip_while(|token| token == START_TOKEN)
			.collect();
		lines.push(tokenizer.join(&visible));
	}

	HttpResponse::Ok().body(lines.join("\n"))
}

/// HTTP GET endpoint `/v1/score`
///
/// Scores the given text against the model and returns the 0-100 value.
#[get("/v1/score")]
async fn get_score(data: web::Data<SharedData>, query: web::Query<ScoreParams>) -> impl Responder {
	let tokenizer = WhitespaceTokenizer;
	let mut tokens = data.markov.params().start_sequence();
	tokens.extend(tokenizer.tokenize(&query.text));

	match data.markov.score(&tokens) {
		Ok(score) => HttpResponse::Ok().body(format!("{score}")),
		Err(e) => error_response(e),
	}
}

/// HTTP PUT endpoint `/v1/ingest`
///
/// Indexes the request body as plain text, one record per line, and
/// returns the build counters.
#[put("/v1/ingest")]
async fn put_ingest(data: web::Data<SharedData>, body: String) -> impl Responder {
	let records: Vec<CorpusRecord> = body.lines().map(CorpusRecord::text).collect();

	match build_index(&data.markov, &WhitespaceTokenizer, records, &BuildOptions::default()) {
		Ok(stats) => HttpResponse::Ok().body(format!(
			"seen={} indexed={} skipped={} malformed={} tokens={}",
			stats.records_seen,
			stats.records_indexed,
			stats.records_skipped,
			stats.records_malformed,
			stats.tokens
		)),
		Err(e) => error_response(e),
	}
}

/// HTTP DELETE endpoint `/v1/flush`
///
/// Deletes every key under the configured prefix.
#[delete("/v1/flush")]
async fn delete_flush(data: web::Data<SharedData>) -> impl Responder {
	match data.markov.flush() {
		Ok(deleted) => HttpResponse::Ok().body(format!("deleted {deleted} keys")),
		Err(e) => error_response(e),
	}
}

/// Main entry point for the server.
///
/// Builds an empty in-memory model and starts an Actix-web HTTP server;
/// the model is filled through `/v1/ingest`. The store uses interior
/// mutability, so ingestion, generation and scoring run concurrently
/// without an outer lock.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Model parameters are currently fixed at startup.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let params = ModelParams::default();
	let markov = match Markov::new(MemoryStore::new(), params) {
		Ok(markov) => markov,
		Err(e) => return Err(std::io::Error::other(e.to_string())),
	};
	let shared_data = web::Data::new(SharedData { markov });

	log::info!("serving model '{}' on 127.0.0.1:5000", shared_data.markov.params().prefix);

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(get_score)
			.service(put_ingest)
			.service(delete_flush)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
