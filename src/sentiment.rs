//! Headline polarity scoring.
//!
//! The classifier only sees [`PolarityScorer`]; [`LexiconScorer`] is the
//! bundled implementation backed by `sentiment_lexicon.json`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

/// Maps text to a polarity in `[-1, 1]`.
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

impl<F> PolarityScorer for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn polarity(&self, text: &str) -> f64 {
        self(text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> Option<f64> {
        LEXICON.get(w).copied()
    }

    /// Average polarity of the lexicon words found in `text`.
    ///
    /// A negator in the previous 1..=3 tokens flips and halves the word
    /// (`* -0.5`); an intensifier directly before it scales the word.
    pub fn score_text(&self, text: &str) -> f64 {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut sum = 0.0;
        let mut hits = 0usize;

        for i in 0..tokens.len() {
            let Some(base) = self.word_score(tokens[i].as_str()) else {
                continue;
            };

            let mut adj = base;
            if i >= 1 {
                if let Some(m) = intensifier(tokens[i - 1].as_str()) {
                    adj = (adj * m).clamp(-1.0, 1.0);
                }
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            if negated {
                adj *= -0.5;
            }

            sum += adj;
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (sum / hits as f64).clamp(-1.0, 1.0)
    }
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        self.score_text(text)
    }
}

/// Lower-case alphanumeric tokens; apostrophes stay inside words ("isn't").
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|t| t.trim_matches(|c| c == '\'' || c == '\u{2019}'))
        .filter(|t| !t.is_empty())
        .map(|t| t.replace('\u{2019}', "'").to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
    )
}

fn intensifier(tok: &str) -> Option<f64> {
    match tok {
        "very" | "really" | "highly" => Some(1.3),
        "extremely" | "hugely" | "incredibly" => Some(1.5),
        "slightly" | "somewhat" => Some(0.6),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_unknown_text_is_zero() {
        let s = LexiconScorer::new();
        assert_eq!(s.polarity(""), 0.0);
        assert_eq!(s.polarity("Council meets on Tuesday"), 0.0);
    }

    #[test]
    fn positive_and_negative_words() {
        let s = LexiconScorer::new();
        assert!(s.polarity("Stocks surge to record high as economy shows strong growth") > 0.0);
        assert!(s.polarity("Deadly storm causes crisis and losses across the region") < 0.0);
    }

    #[test]
    fn negation_flips_and_damps() {
        let s = LexiconScorer::new();
        let plain = s.polarity("good");
        let negated = s.polarity("not good");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
        assert!((negated + plain * 0.5).abs() < 1e-9);
    }

    #[test]
    fn intensifier_scales_but_stays_in_range() {
        let s = LexiconScorer::new();
        let plain = s.polarity("good");
        let very = s.polarity("very good");
        assert!(very > plain);
        assert!(s.polarity("extremely excellent") <= 1.0);
    }

    #[test]
    fn closures_are_scorers() {
        let fixed = |_: &str| 0.25;
        assert_eq!(fixed.polarity("anything"), 0.25);
    }

    #[test]
    fn lexicon_values_are_in_range() {
        assert!(!LEXICON.is_empty());
        assert!(LEXICON.values().all(|v| (-1.0..=1.0).contains(v)));
    }
}
