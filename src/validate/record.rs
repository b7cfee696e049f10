use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::model::CandidateArticle;

pub const MIN_TITLE_CHARS: usize = 10;
pub const MAX_TITLE_CHARS: usize = 200;
pub const MIN_CONTENT_CHARS: usize = 50;
pub const MAX_CONTENT_CHARS: usize = 50_000;
pub const MAX_URL_CHARS: usize = 2000;
pub const MAX_FUTURE_DAYS: i64 = 1;
pub const MAX_AGE_DAYS: i64 = 10 * 365;

/// Checks that can land in `passed_checks`.
pub const TOTAL_CHECKS: usize = 6;

const PLACEHOLDER_INDICATORS: &[&str] = &[
    "lorem ipsum",
    "placeholder text",
    "sample content",
    "coming soon",
    "under construction",
];

static AUTHOR_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z\s\.\-]+$").ok());

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordValidation {
    pub is_valid: bool,
    /// Heuristic in `[0, 1]`.
    pub quality_score: f64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub passed_checks: Vec<String>,
    /// False when required fields or the URL are unusable, in which case the
    /// article is not written anywhere.
    pub persistable: bool,
}

/// Parses a publish date in any of the formats pages commonly use. Dates
/// without an offset are taken as UTC.
pub fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(date) = DateTime::parse_from_str(raw, format) {
            return Some(date.with_timezone(&Utc));
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d/%m/%Y %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        }
    }
    None
}

/// Structural checks run on a crawled article before it is persisted.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    blocked_domains: Vec<String>,
}

impl Default for RecordValidator {
    fn default() -> Self {
        RecordValidator::new(vec!["spam.com".to_string(), "malicious.net".to_string()])
    }
}

impl RecordValidator {
    pub fn new(blocked_domains: Vec<String>) -> Self {
        RecordValidator {
            blocked_domains: blocked_domains
                .into_iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }

    pub fn validate(&self, article: &CandidateArticle) -> RecordValidation {
        self.validate_at(article, Utc::now())
    }

    /// Same as [`validate`](Self::validate) with an explicit clock.
    pub fn validate_at(&self, article: &CandidateArticle, now: DateTime<Utc>) -> RecordValidation {
        let mut result = RecordValidation {
            is_valid: true,
            persistable: true,
            ..Default::default()
        };

        if !self.check_required_fields(article, &mut result) {
            result.persistable = false;
        }
        if !self.check_url(&article.url, &mut result) {
            result.persistable = false;
        }
        check_title(&article.title, &mut result);
        check_content(&article.content, &mut result);
        check_publish_date(article.publish_date.as_deref(), now, &mut result);
        check_authors(&article.authors, &mut result);

        result.is_valid = result.errors.is_empty();
        result.quality_score = quality_score(&result);
        result
    }

    fn check_required_fields(&self, article: &CandidateArticle, result: &mut RecordValidation) -> bool {
        let missing: Vec<&str> = [
            ("title", &article.title),
            ("url", &article.url),
            ("domain", &article.domain),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            result.passed_checks.push("required_fields".to_string());
            true
        } else {
            result
                .errors
                .push(format!("Missing required fields: {}", missing.join(", ")));
            false
        }
    }

    fn check_url(&self, url: &str, result: &mut RecordValidation) -> bool {
        if url.trim().is_empty() {
            result.errors.push("URL is required".to_string());
            return false;
        }
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                result.errors.push(format!("URL parsing failed: {}", e));
                return false;
            }
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            result
                .errors
                .push(format!("Invalid URL scheme: {}", parsed.scheme()));
            return false;
        }
        let host = parsed.host_str().unwrap_or("").to_lowercase();
        if self.blocked_domains.iter().any(|b| host.contains(b.as_str())) {
            result.errors.push(format!("Blocked domain: {}", host));
            return false;
        }
        if url.chars().count() > MAX_URL_CHARS {
            result.warnings.push("URL is unusually long".to_string());
        }
        result.passed_checks.push("url_validation".to_string());
        true
    }
}

fn check_title(title: &str, result: &mut RecordValidation) {
    let len = title.trim().chars().count();
    if len < MIN_TITLE_CHARS {
        result.errors.push(format!(
            "Title too short: {} chars (min {})",
            len, MIN_TITLE_CHARS
        ));
    } else if len > MAX_TITLE_CHARS {
        result.warnings.push(format!("Title very long: {} chars", len));
    } else {
        result.passed_checks.push("title_length".to_string());
    }
}

fn check_content(content: &str, result: &mut RecordValidation) {
    let len = content.chars().count();
    if len < MIN_CONTENT_CHARS {
        result.warnings.push(format!("Content quite short: {} chars", len));
    } else if len > MAX_CONTENT_CHARS {
        result.warnings.push(format!("Content very long: {} chars", len));
    } else {
        result.passed_checks.push("content_length".to_string());
    }

    let lower = content.to_lowercase();
    if PLACEHOLDER_INDICATORS.iter().any(|p| lower.contains(p)) {
        result
            .warnings
            .push("Content appears to be placeholder text".to_string());
    }
}

fn check_publish_date(raw: Option<&str>, now: DateTime<Utc>, result: &mut RecordValidation) {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return;
    };
    match parse_publish_date(raw) {
        Some(date) if date > now + Duration::days(MAX_FUTURE_DAYS) => {
            result
                .warnings
                .push("Publish date is too far in the future".to_string());
        }
        Some(date) if date < now - Duration::days(MAX_AGE_DAYS) => {
            result.warnings.push("Publish date is very old".to_string());
        }
        Some(_) => result.passed_checks.push("date_validation".to_string()),
        None => result
            .warnings
            .push(format!("Invalid publish date format: {}", raw)),
    }
}

fn check_authors(authors: &[String], result: &mut RecordValidation) {
    if authors.is_empty() {
        result.warnings.push("No authors specified".to_string());
        return;
    }

    let mut any_valid = false;
    for author in authors {
        let name = author.trim();
        let len = name.chars().count();
        if name.is_empty() {
            result.warnings.push("Invalid author format: empty name".to_string());
        } else if len < 2 {
            result.warnings.push(format!("Author name too short: {}", name));
        } else if len > 100 {
            result
                .warnings
                .push(format!("Author name unusually long: {}", name));
        } else if AUTHOR_NAME.as_ref().is_some_and(|re| re.is_match(name)) {
            any_valid = true;
        } else {
            result
                .warnings
                .push(format!("Author name contains unusual characters: {}", name));
        }
    }
    if any_valid {
        result.passed_checks.push("author_validation".to_string());
    }
}

fn quality_score(result: &RecordValidation) -> f64 {
    let base = result.passed_checks.len() as f64 / TOTAL_CHECKS as f64;
    let penalty = 0.3 * result.errors.len() as f64 + 0.1 * result.warnings.len() as f64;
    (base - penalty).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article() -> CandidateArticle {
        CandidateArticle {
            title: "Council approves new park".to_string(),
            content: "The council approved the plan. ".repeat(10),
            authors: vec!["Jane Smith".to_string()],
            publish_date: Some("2024-03-01T10:00:00Z".to_string()),
            domain: "news.example".to_string(),
            url: "https://news.example/a".to_string(),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn clean_article_passes_every_check() {
        let result = RecordValidator::default().validate_at(&article(), now());
        assert!(result.is_valid);
        assert!(result.persistable);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.passed_checks.len(), TOTAL_CHECKS);
        assert!((result.quality_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn title_boundary_at_ten_chars() {
        let validator = RecordValidator::default();
        let mut a = article();
        a.title = "0123456789".to_string();
        let ok = validator.validate_at(&a, now());
        assert!(ok.is_valid);
        assert!(ok.passed_checks.contains(&"title_length".to_string()));

        a.title = "012345678".to_string();
        let bad = validator.validate_at(&a, now());
        assert!(!bad.is_valid);
        assert_eq!(bad.errors.len(), 1);
        assert!(bad.errors[0].starts_with("Title too short"));
        assert!(bad.persistable);
    }

    #[test]
    fn missing_required_fields_block_persistence() {
        let mut a = article();
        a.domain = String::new();
        let result = RecordValidator::default().validate_at(&a, now());
        assert!(!result.is_valid);
        assert!(!result.persistable);
        assert!(result.errors[0].contains("domain"));
    }

    #[test]
    fn bad_scheme_and_blocked_domains_block_persistence() {
        let validator = RecordValidator::default();
        let mut a = article();
        a.url = "ftp://news.example/a".to_string();
        assert!(!validator.validate_at(&a, now()).persistable);

        a.url = "https://www.spam.com/offer".to_string();
        let result = validator.validate_at(&a, now());
        assert!(!result.persistable);
        assert!(result.errors.iter().any(|e| e.starts_with("Blocked domain")));
    }

    #[test]
    fn naive_and_aware_dates_compare_the_same() {
        let validator = RecordValidator::default();
        let mut a = article();
        for date in ["2024-03-01T10:00:00", "2024-03-01T10:00:00+02:00", "2024-03-01"] {
            a.publish_date = Some(date.to_string());
            let result = validator.validate_at(&a, now());
            assert!(
                result.passed_checks.contains(&"date_validation".to_string()),
                "{}",
                date
            );
        }

        a.publish_date = Some("2024-03-05T00:00:00Z".to_string());
        let future = validator.validate_at(&a, now());
        assert!(future.warnings.iter().any(|w| w.contains("future")));
        assert!(future.is_valid);

        a.publish_date = Some("1999-01-01".to_string());
        assert!(validator
            .validate_at(&a, now())
            .warnings
            .iter()
            .any(|w| w.contains("very old")));

        a.publish_date = Some("last tuesday".to_string());
        assert!(validator
            .validate_at(&a, now())
            .warnings
            .iter()
            .any(|w| w.starts_with("Invalid publish date")));
    }

    #[test]
    fn author_sanity_checks_are_warnings() {
        let mut a = article();
        a.authors = vec!["J".to_string(), "R2-D2".to_string()];
        let result = RecordValidator::default().validate_at(&a, now());
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
        assert!(!result.passed_checks.contains(&"author_validation".to_string()));

        a.authors.clear();
        let result = RecordValidator::default().validate_at(&a, now());
        assert!(result.warnings.contains(&"No authors specified".to_string()));
    }

    #[test]
    fn quality_score_stays_in_unit_interval() {
        let validator = RecordValidator::default();
        let worst = CandidateArticle {
            content: "lorem ipsum".to_string(),
            authors: vec!["?".to_string(), "#".to_string()],
            publish_date: Some("nonsense".to_string()),
            ..Default::default()
        };
        let samples = [article(), worst, CandidateArticle::default()];
        for sample in samples.iter() {
            let score = validator.validate_at(sample, now()).quality_score;
            assert!((0.0..=1.0).contains(&score), "{}", score);
        }
    }
}
