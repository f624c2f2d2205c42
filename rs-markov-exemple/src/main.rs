use rs_markov_core::ingest::{BuildOptions, CorpusRecord, Tokenizer, WhitespaceTokenizer, build_index};
use rs_markov_core::io::{build_output_path, get_filename, read_file};
use rs_markov_core::model::key::START_TOKEN;
use rs_markov_core::model::markov::Markov;
use rs_markov_core::model::params::ModelParams;
use rs_markov_core::model::store::MemoryStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Throughput logging from the ingestion driver goes through env_logger
    // (RUST_LOG=info to see it)
    env_logger::init();

    // Write a small corpus file; a real driver would point at an existing
    // dump instead
    let corpus_path = std::env::temp_dir().join("demo-corpus.txt");
    std::fs::write(
        &corpus_path,
        [
            "the cat sat on the mat",
            "the cat ran over the mat",
            "the dog sat on the rug",
            "a dog ran over the rug",
            "the cat sat on the rug",
        ]
        .join("\n"),
    )?;

    // A model handle binds a store to its parameters: 2-token keys,
    // 1-token completions, keys namespaced under the corpus file stem
    // ("demo-corpus")
    let prefix = get_filename(&corpus_path)?;
    let params = ModelParams::new(&prefix, 2, 1)?;
    let markov = Markov::new(MemoryStore::new(), params)?;

    // Load the corpus back line by line and index it
    let records: Vec<CorpusRecord> = read_file(&corpus_path)?
        .into_iter()
        .map(CorpusRecord::text)
        .collect();
    let tokenizer = WhitespaceTokenizer;
    let stats = build_index(&markov, &tokenizer, records, &BuildOptions::default())?;
    println!(
        "indexed {} of {} records ({} tokens)",
        stats.records_indexed, stats.records_seen, stats.tokens
    );

    // Generate a few sequences from random seeds; the start padding is
    // stripped before printing
    for i in 0..5 {
        let generated = markov.generate(None, 30, &[])?;
        let visible: Vec<String> = generated
            .into_iter()
            .skip_while(|token| token == START_TOKEN)
            .collect();
        println!("generated {}: {}", i + 1, tokenizer.join(&visible));
    }

    // Seed generation with relevant terms: the seed key will contain
    // "dog" if any key does
    let generated = markov.generate(None, 30, &["dog".to_owned()])?;
    println!("dog-seeded: {}", tokenizer.join(&generated));

    // Score a line against the model (0-100); the line must be padded the
    // same way the builder padded it
    let mut known_line = markov.params().start_sequence();
    known_line.extend(tokenizer.tokenize("the cat sat on the rug"));
    println!("score: {:.1}", markov.score(&known_line)?);

    // An unrelated line has no observed support
    let mut unrelated_line = markov.params().start_sequence();
    unrelated_line.extend(tokenizer.tokenize("quantum flux capacitors everywhere"));
    println!("unrelated score: {:.1}", markov.score(&unrelated_line)?);

    // Snapshot the store next to the corpus (demo-corpus.bin) and reload
    // it; loading with different parameters would fail loudly
    let snapshot_path = build_output_path(&corpus_path, "bin")?;
    markov.store().snapshot_to(&snapshot_path, markov.params())?;
    let reloaded = Markov::new(
        MemoryStore::load_snapshot(&snapshot_path, markov.params())?,
        markov.params().clone(),
    )?;
    println!("reloaded score: {:.1}", reloaded.score(&known_line)?);

    // Tag filtering: only records carrying a filtered tag are indexed,
    // so the untagged and the "finance" records are skipped here
    let tagged = Markov::new(MemoryStore::new(), ModelParams::new("tagged", 2, 1)?)?;
    let options = BuildOptions {
        tag_filter: ["animals".to_owned()].into(),
        skip_to: 0,
    };
    let records = vec![
        CorpusRecord::tagged("the cat sat on the mat", ["animals"]),
        CorpusRecord::tagged("the market sat still all day", ["finance"]),
        CorpusRecord::text("a dog ran over the rug"),
    ];
    let stats = build_index(&tagged, &tokenizer, records, &options)?;
    println!(
        "tag-filtered build: indexed {} of {}",
        stats.records_indexed, stats.records_seen
    );

    // Flush removes every key under the prefix; generating from an empty
    // model is an explicit error, not a hang
    markov.flush()?;
    match markov.generate(None, 30, &[]) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("after flush: {e}"),
    }

    Ok(())
}
