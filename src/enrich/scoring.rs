//! Numeric scores attached to an enriched article.

use unicode_segmentation::UnicodeSegmentation;

pub const WORDS_PER_MINUTE: f64 = 200.0;

/// Estimated reading time in whole minutes, never below one.
pub fn read_time(text: &str) -> u32 {
    let words = text.unicode_words().count() as f64;
    ((words / WORDS_PER_MINUTE).round() as u32).max(1)
}

/// Inputs to the 0-100 quality score.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityInputs {
    pub content_chars: usize,
    pub title_chars: usize,
    pub entity_count: usize,
    pub has_authors: bool,
    pub has_images: bool,
}

/// Editorial quality in `[0, 100]`: content length up to 30 points, title up to
/// 20, entity richness up to 30, and 10 each for bylines and images.
pub fn quality_score(inputs: QualityInputs) -> u8 {
    let content = match inputs.content_chars {
        n if n > 2000 => 30,
        n if n > 1000 => 25,
        n if n > 500 => 20,
        n if n > 200 => 10,
        _ => 0,
    };
    let title = match inputs.title_chars {
        n if n > 20 => 20,
        n if n > 10 => 15,
        _ => 0,
    };
    let entities = match inputs.entity_count {
        n if n > 10 => 30,
        n if n > 5 => 20,
        n if n > 2 => 10,
        _ => 0,
    };
    let authors = if inputs.has_authors { 10 } else { 0 };
    let images = if inputs.has_images { 10 } else { 0 };

    (content + title + entities + authors + images).min(100)
}

/// Lowers a quality score to the record validator's verdict when that
/// verdict found errors.
pub fn cap_quality(score: u8, validation_score: f64) -> u8 {
    let cap = (validation_score.clamp(0.0, 1.0) * 100.0).round() as u8;
    score.min(cap)
}

/// Confidence in the enrichment output.
///
/// This is a heuristic and not a calibrated probability: three bucketed
/// factors (content length, entity count, keyword count), each taking one of a
/// few fixed values, averaged and rounded to two decimals. The result is always
/// between 0.33 and 0.8.
pub fn confidence_score(content_chars: usize, entity_count: usize, keyword_count: usize) -> f64 {
    let content = match content_chars {
        n if n > 1000 => 0.9,
        n if n > 500 => 0.7,
        n if n > 100 => 0.5,
        _ => 0.3,
    };
    let entities = match entity_count {
        n if n > 5 => 0.8,
        n if n > 2 => 0.6,
        _ => 0.4,
    };
    let keywords = match keyword_count {
        n if n >= 5 => 0.7,
        n if n >= 2 => 0.5,
        _ => 0.3,
    };
    let avg: f64 = (content + entities + keywords) / 3.0;
    (avg * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_time_is_at_least_one_minute() {
        assert_eq!(read_time(""), 1);
        assert_eq!(read_time("a few words"), 1);
        assert_eq!(read_time(&"word ".repeat(500)), 3);
        assert_eq!(read_time(&"word ".repeat(1000)), 5);
    }

    #[test]
    fn quality_score_caps_at_hundred() {
        let full = QualityInputs {
            content_chars: 5000,
            title_chars: 60,
            entity_count: 40,
            has_authors: true,
            has_images: true,
        };
        assert_eq!(quality_score(full), 100);
        assert_eq!(quality_score(QualityInputs::default()), 0);
        assert_eq!(
            quality_score(QualityInputs {
                content_chars: 600,
                title_chars: 15,
                ..Default::default()
            }),
            35
        );
    }

    #[test]
    fn cap_quality_uses_validation_score() {
        assert_eq!(cap_quality(80, 0.42), 42);
        assert_eq!(cap_quality(30, 0.9), 30);
        assert_eq!(cap_quality(30, -1.0), 0);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        for content in [0, 150, 600, 5000] {
            for entities in [0, 3, 10] {
                for keywords in [0, 3, 15] {
                    let c = confidence_score(content, entities, keywords);
                    assert!((0.0..=1.0).contains(&c));
                }
            }
        }
        assert_eq!(confidence_score(5000, 10, 15), 0.8);
        assert_eq!(confidence_score(0, 0, 0), 0.33);
    }
}
