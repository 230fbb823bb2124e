// tests/classify_props.rs
use std::sync::Arc;

use news_sentiment_dashboard::classify::{Classifier, Sentiment};
use news_sentiment_dashboard::ingest::types::HeadlineRecord;
use news_sentiment_dashboard::sentiment::{LexiconScorer, PolarityScorer};
use news_sentiment_dashboard::store::BatchStore;

fn headline(url: &str, title: &str) -> HeadlineRecord {
    HeadlineRecord::new(
        Some(url.to_string()),
        Some("Wire".to_string()),
        Some(title.to_string()),
        Some("2024-01-02T10:00:00Z".to_string()),
    )
}

fn classifier_with(
    scorer: Arc<dyn PolarityScorer>,
    dir: &std::path::Path,
) -> (Classifier, Arc<BatchStore>) {
    let store = Arc::new(BatchStore::open(dir).unwrap());
    (Classifier::new(scorer, store.clone()), store)
}

#[test]
fn empty_titles_are_negative_with_zero_score() {
    let dir = tempfile::tempdir().unwrap();
    let (c, _) = classifier_with(Arc::new(LexiconScorer::new()), dir.path());

    let batch = c
        .classify(vec![headline("u1", ""), headline("u2", "   ")])
        .unwrap()
        .expect("non-empty input yields a batch");
    assert!(batch
        .records
        .iter()
        .all(|r| r.sentiment == Sentiment::Negative && r.prob_pos == 0.0));
}

#[test]
fn prob_pos_is_positive_polarity_clamped_to_unit_range() {
    let dir = tempfile::tempdir().unwrap();
    let scorer = |t: &str| match t {
        "soaring" => 1.5,
        "up" => 0.6,
        "slightly up" => 0.05,
        "flat" => 0.0,
        "down" => -0.4,
        _ => -1.0,
    };
    let (c, _) = classifier_with(Arc::new(scorer), dir.path());

    let batch = c
        .classify(vec![
            headline("z", "soaring"),
            headline("a", "up"),
            headline("b", "slightly up"),
            headline("c", "flat"),
            headline("d", "down"),
            headline("e", "crash"),
        ])
        .unwrap()
        .unwrap();

    let got: Vec<(Sentiment, f64)> = batch
        .records
        .iter()
        .map(|r| (r.sentiment, r.prob_pos))
        .collect();
    assert_eq!(
        got,
        vec![
            (Sentiment::Positive, 1.0),
            (Sentiment::Positive, 0.6),
            (Sentiment::Positive, 0.05),
            (Sentiment::Negative, 0.0),
            (Sentiment::Negative, 0.0),
            (Sentiment::Negative, 0.0),
        ]
    );
}

#[test]
fn empty_input_signals_no_input_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (c, store) = classifier_with(Arc::new(LexiconScorer::new()), dir.path());

    assert!(c.classify(Vec::new()).unwrap().is_none());
    assert!(store.recent_batches(50).unwrap().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn each_call_persists_exactly_one_batch_with_its_rows() {
    let dir = tempfile::tempdir().unwrap();
    let (c, store) = classifier_with(Arc::new(LexiconScorer::new()), dir.path());

    let first = c
        .classify(vec![
            headline("a", "Stocks surge on strong growth"),
            headline("b", "Deadly storm"),
        ])
        .unwrap()
        .unwrap();
    let second = c.classify(vec![headline("a", "Same url again")]).unwrap().unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(store.recent_batches(50).unwrap().len(), 2);
    assert_eq!(store.read_batch(&first.path).unwrap(), first.records);
    assert_eq!(first.records[0].sentiment, Sentiment::Positive);
    assert_eq!(first.records[1].sentiment, Sentiment::Negative);
}
