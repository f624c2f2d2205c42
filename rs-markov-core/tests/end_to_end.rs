use rand::SeedableRng;
use rand::rngs::StdRng;

use rs_markov_core::error::MarkovError;
use rs_markov_core::ingest::{BuildOptions, CorpusRecord, Tokenizer, WhitespaceTokenizer, build_index};
use rs_markov_core::model::markov::Markov;
use rs_markov_core::model::params::ModelParams;
use rs_markov_core::model::store::{MemoryStore, Store};

fn corpus() -> Vec<CorpusRecord> {
    [
        "the cat sat on the mat",
        "the cat ran over the mat",
        "the dog sat on the rug",
        "a dog ran over the rug",
        "the cat sat on the rug",
    ]
    .into_iter()
    .map(CorpusRecord::text)
    .collect()
}

fn build_model(key_length: usize) -> Markov<MemoryStore> {
    let params = ModelParams::new("mkv", key_length, 1).unwrap();
    let markov = Markov::new(MemoryStore::new(), params).unwrap();
    let stats = build_index(
        &markov,
        &WhitespaceTokenizer,
        corpus(),
        &BuildOptions::default(),
    )
    .unwrap();
    assert_eq!(stats.records_indexed, 5);
    markov
}

#[test]
fn built_model_generates_scorable_sequences() {
    let markov = build_model(2);
    let tokenizer = WhitespaceTokenizer;
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..25 {
        let sequence = markov.generate_with(&mut rng, None, 30, &[]).unwrap();
        assert!(!sequence.is_empty());
        assert!(sequence.len() <= 30);

        // Whatever came out of the model must have observed support
        let score = markov.score(&sequence).unwrap();
        assert!(score > 0.0, "score was {score} for {:?}", tokenizer.join(&sequence));
    }
}

#[test]
fn ingested_lines_score_their_own_windows() {
    let markov = build_model(2);
    let tokenizer = WhitespaceTokenizer;

    let mut line = markov.params().start_sequence();
    line.extend(tokenizer.tokenize("the cat sat on the mat"));
    assert!(markov.score(&line).unwrap() > 0.0);
}

#[test]
fn relevant_terms_steer_generation_when_possible() {
    let markov = build_model(2);
    let mut rng = StdRng::seed_from_u64(7);

    let terms = vec!["dog".to_owned()];
    let sequence = markov.generate_with(&mut rng, None, 30, &terms).unwrap();
    assert!(sequence.iter().any(|token| token.contains("dog")));
}

#[test]
fn flush_leaves_an_empty_model() {
    let markov = build_model(2);
    assert!(markov.flush().unwrap() > 0);
    let mut rng = StdRng::seed_from_u64(0);
    assert!(matches!(
        markov.store().random_key("mkv", &mut rng),
        Err(MarkovError::EmptyModel(_))
    ));
    assert!(matches!(
        markov.generate_with(&mut rng, None, 10, &[]),
        Err(MarkovError::EmptyModel(_))
    ));
}

#[test]
fn snapshot_survives_a_round_trip() {
    let markov = build_model(2);
    let params = markov.params().clone();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    markov.store().snapshot_to(&path, &params).unwrap();

    let reloaded = Markov::new(
        MemoryStore::load_snapshot(&path, &params).unwrap(),
        params.clone(),
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let sequence = reloaded.generate_with(&mut rng, None, 30, &[]).unwrap();
    assert!(markov.score(&sequence).unwrap() > 0.0);

    // A different key length must be rejected at load time
    let other = ModelParams::new("mkv", 3, 1).unwrap();
    assert!(matches!(
        MemoryStore::load_snapshot(&path, &other),
        Err(MarkovError::ParameterMismatch { .. })
    ));
}
