use sha2::{Digest, Sha256};
use url::Url;
use urlnorm::UrlNormalizer;

fn sha256_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Stable identifier for an article. Re-crawling an unchanged page yields the same id.
pub fn article_id(url: &str, content: &str) -> String {
    let digest = sha256_hex(&[url, "\n", content]);
    format!("article_{}", &digest[..16])
}

/// Fingerprint over title, content and URL, used for duplicate detection.
pub fn content_hash(title: &str, content: &str, url: &str) -> String {
    sha256_hex(&[title, content, url])
}

/// Normalizes a URL the same way for every visited-set backend. Unparseable
/// input is used verbatim.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => UrlNormalizer::default().compute_normalization_string(&parsed),
        Err(_) => url.trim().to_string(),
    }
}

/// Content-addressed visited-set key for a URL.
pub fn visited_key(url: &str) -> String {
    sha256_hex(&[&normalize_url(url)])
}

/// Host of `url` with any leading `www.` removed.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
        .unwrap_or_default()
}

pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `max_chars` characters of `text`, cut back to a word boundary with an
/// ellipsis appended when anything was dropped.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head.as_str(),
    };
    format!("{}...", cut.trim_end())
}

/// First `max_chars` characters of `text`, char-boundary safe.
pub fn take_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_is_stable_for_same_input() {
        let a = article_id("https://news.example/a", "body text");
        let b = article_id("https://news.example/a", "body text");
        assert_eq!(a, b);
        assert!(a.starts_with("article_"));
        assert_eq!(a.len(), "article_".len() + 16);
    }

    #[test]
    fn article_id_changes_with_content() {
        let a = article_id("https://news.example/a", "body text");
        let b = article_id("https://news.example/a", "other text");
        assert_ne!(a, b);
    }

    #[test]
    fn content_hash_depends_on_url_and_content() {
        let base = content_hash("Title", "Body", "https://a.example/1");
        assert_eq!(base, content_hash("Title", "Body", "https://a.example/1"));
        assert_ne!(base, content_hash("Title", "Body", "https://b.example/1"));
        assert_ne!(base, content_hash("Title", "Body changed", "https://a.example/1"));
    }

    #[test]
    fn visited_key_is_content_addressed() {
        assert_eq!(
            visited_key("  https://news.example/a "),
            visited_key("https://news.example/a")
        );
        assert_eq!(visited_key("https://news.example/a").len(), 64);
        assert_ne!(
            visited_key("https://news.example/a"),
            visited_key("https://news.example/b")
        );
    }

    #[test]
    fn domain_strips_www() {
        assert_eq!(domain_of("https://www.bbc.co.uk/news/1"), "bbc.co.uk");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn truncate_cuts_at_word_boundary() {
        let text = "alpha beta gamma delta";
        assert_eq!(truncate_text(text, 100), text);
        assert_eq!(truncate_text(text, 13), "alpha beta...");
    }
}
