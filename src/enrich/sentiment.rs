use anyhow::Result;
use unicode_segmentation::UnicodeSegmentation;

use super::SentimentScorer;
use crate::model::{Sentiment, SentimentLabel};

const POSITIVE: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "best", "fantastic", "positive",
    "success", "successful", "win", "wins", "won", "improve", "improved", "growth", "gain",
    "gains", "benefit", "strong", "record", "celebrate", "praised", "hope", "safe",
];

const NEGATIVE: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "worst", "negative", "poor", "fail", "failed",
    "failure", "loss", "losses", "decline", "crisis", "attack", "killed", "death", "dead",
    "injured", "war", "fear", "threat", "collapse", "weak", "warning",
];

/// Word-list polarity scorer.
///
/// Polarity is `(positive - negative) / (positive + negative)` over lexicon hits,
/// so it always lies in `[-1, 1]`; subjectivity is the share of words that hit
/// either lexicon.
#[derive(Debug, Clone, Default)]
pub struct LexiconSentimentScorer;

impl SentimentScorer for LexiconSentimentScorer {
    fn score(&self, text: &str) -> Result<Sentiment> {
        let mut total = 0usize;
        let mut positive = 0usize;
        let mut negative = 0usize;
        for word in text.unicode_words() {
            total += 1;
            let lower = word.to_lowercase();
            if POSITIVE.contains(&lower.as_str()) {
                positive += 1;
            } else if NEGATIVE.contains(&lower.as_str()) {
                negative += 1;
            }
        }

        let hits = positive + negative;
        let polarity = if hits > 0 {
            (positive as f64 - negative as f64) / hits as f64
        } else {
            0.0
        };
        let subjectivity = if total > 0 {
            (hits as f64 / total as f64).min(1.0)
        } else {
            0.0
        };

        Ok(Sentiment {
            polarity,
            subjectivity,
            label: SentimentLabel::from_polarity(polarity),
            positive_words: positive,
            negative_words: negative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_polarity_thresholds() {
        let scorer = LexiconSentimentScorer;
        assert_eq!(
            scorer.score("A great and successful day").unwrap().label,
            SentimentLabel::Positive
        );
        assert_eq!(
            scorer.score("A terrible crisis and a failed plan").unwrap().label,
            SentimentLabel::Negative
        );
        let neutral = scorer.score("Good news and bad news").unwrap();
        assert_eq!(neutral.polarity, 0.0);
        assert_eq!(neutral.label, SentimentLabel::Neutral);
    }

    #[test]
    fn polarity_is_bounded() {
        let s = LexiconSentimentScorer.score("best best best").unwrap();
        assert_eq!(s.polarity, 1.0);
        assert!(s.subjectivity <= 1.0);
        assert_eq!(LexiconSentimentScorer.score("").unwrap().polarity, 0.0);
    }

    #[test]
    fn label_boundaries_are_exclusive() {
        assert_eq!(SentimentLabel::from_polarity(0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_polarity(0.11), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_polarity(-0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_polarity(-0.11), SentimentLabel::Negative);
    }
}
