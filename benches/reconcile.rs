use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scribecheck::checker::dictionary::{Dictionary, WordListDictionary};
use scribecheck::checker::overrides::MemoryOverrideStore;
use scribecheck::checker::tokenizer::{tokenize, WordBoundary};
use scribecheck::document::{Document, DocumentHost};
use scribecheck::{Config, Engine};
use std::sync::Arc;
use std::time::Instant;

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "a", "spell", "checker",
    "reads", "every", "word", "in", "document", "and", "flags", "ones", "it", "does", "not",
    "know",
];

fn sample_text(paragraphs: usize) -> String {
    let paragraph = "The quick brown fox jumsp over the lazy dog. A spell checker reads every \
                     word in the documnet and flags the ones it does not know.\n";
    paragraph.repeat(paragraphs)
}

fn bench_tokenize(c: &mut Criterion) {
    let doc = Document::new(sample_text(200));
    let runs = doc.text_runs();

    c.bench_function("tokenize_ascii", |b| {
        b.iter(|| tokenize(black_box(&runs), WordBoundary::Ascii))
    });
    c.bench_function("tokenize_unicode", |b| {
        b.iter(|| tokenize(black_box(&runs), WordBoundary::Unicode))
    });
}

fn bench_check_now(c: &mut Criterion) {
    let dictionary: Arc<dyn Dictionary> =
        Arc::new(WordListDictionary::from_words(WORDS.iter().copied()).unwrap());
    let config = Config::default();

    c.bench_function("check_now_200_paragraphs", |b| {
        b.iter_batched(
            || {
                let mut engine = Engine::new("bench", &config, MemoryOverrideStore::new());
                engine.set_dictionary(Arc::clone(&dictionary), Instant::now());
                (engine, Document::new(sample_text(200)))
            },
            |(mut engine, mut doc)| engine.check_now(&mut doc).0,
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_tokenize, bench_check_now);
criterion_main!(benches);
