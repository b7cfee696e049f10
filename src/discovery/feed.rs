//! Feed parsing for RSS, Atom, and JSON formats.

use feed_rs::parser;
use std::io::Cursor;
use tracing::{debug, warn};
use url::Url;

use crate::error::DiscoveryError;
use crate::util::is_valid_url;
use crate::TARGET_WEB_REQUEST;

/// Basic information about a feed entry
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub url: String,
    pub title: Option<String>,
}

/// Clean up malformed XML
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').to_string();

    // Drop anything before the document element
    if let Some(start) = cleaned.find("<?xml") {
        cleaned = cleaned[start..].to_string();
    } else if let Some(start) = cleaned.find("<rss") {
        cleaned = cleaned[start..].to_string();
    } else if let Some(start) = cleaned.find("<feed") {
        cleaned = cleaned[start..].to_string();
    }

    // HTML entities that are not defined in XML
    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&hellip;", "&#8230;")
        .replace("&amp;amp;", "&amp;");

    cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | '\u{000A}' | '\u{000D}' |
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect()
}

fn entries_of(feed: feed_rs::model::Feed, base: Option<&Url>) -> Vec<FeedEntry> {
    let mut entries = Vec::new();
    for entry in feed.entries {
        let link = entry
            .links
            .first()
            .map(|link| link.href.clone())
            .or_else(|| Some(entry.id.clone()).filter(|id| is_valid_url(id)));
        let Some(link) = link else {
            continue;
        };
        let resolved = match base {
            Some(base) => base.join(link.trim()).map(|u| u.to_string()).ok(),
            None => Some(link.trim().to_string()),
        };
        match resolved {
            Some(url) if is_valid_url(&url) => entries.push(FeedEntry {
                url,
                title: entry.title.map(|t| t.content.trim().to_string()),
            }),
            _ => debug!(target: TARGET_WEB_REQUEST, "Skipping feed entry with unusable link: {}", link),
        }
    }
    entries
}

/// Parses a syndication document. Malformed XML gets one retry after cleanup.
pub fn parse_feed(body: &str, source_url: &str) -> Result<Vec<FeedEntry>, DiscoveryError> {
    let base = Url::parse(source_url).ok();

    match parser::parse(Cursor::new(body.as_bytes())) {
        Ok(feed) => Ok(entries_of(feed, base.as_ref())),
        Err(first_err) => {
            let cleaned = cleanup_xml(body);
            if !(cleaned.contains("<rss") || cleaned.contains("<feed") || cleaned.contains("<rdf")) {
                return Err(DiscoveryError::Feed {
                    url: source_url.to_string(),
                    reason: format!("not a feed document: {}", first_err),
                });
            }
            match parser::parse(Cursor::new(cleaned.as_bytes())) {
                Ok(feed) => {
                    warn!(target: TARGET_WEB_REQUEST, "Feed {} parsed only after XML cleanup", source_url);
                    Ok(entries_of(feed, base.as_ref()))
                }
                Err(second_err) => Err(DiscoveryError::Feed {
                    url: source_url.to_string(),
                    reason: format!(
                        "failed even after cleanup. First error: {}. Second error: {}",
                        first_err, second_err
                    ),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Example News</title><link>https://news.example/</link>
<description>d</description>
<item><title>First story</title><link>https://news.example/a</link><pubDate>Mon, 04 Mar 2024 10:00:00 GMT</pubDate></item>
<item><title>Relative story</title><link>/b</link></item>
<item><title>No link</title></item>
</channel></rss>"#;

    #[test]
    fn parses_rss_items() {
        let entries = parse_feed(RSS, "https://news.example/rss.xml").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://news.example/a");
        assert_eq!(entries[0].title.as_deref(), Some("First story"));
        assert_eq!(entries[1].url, "https://news.example/b");
    }

    #[test]
    fn parses_atom_entries() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Atom</title><id>urn:x</id><updated>2024-03-04T10:00:00Z</updated>
<entry><title>Atom story</title><id>urn:y</id><updated>2024-03-04T10:00:00Z</updated><link href="https://news.example/atom-1"/></entry>
</feed>"#;
        let entries = parse_feed(atom, "https://news.example/atom.xml").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://news.example/atom-1");
    }

    #[test]
    fn recovers_from_html_entities_and_leading_garbage() {
        let messy = format!("\u{FEFF}  junk {}", RSS.replace("First story", "First&nbsp;story"));
        let entries = parse_feed(&messy, "https://news.example/rss.xml").unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn rejects_non_feed_documents() {
        let err = parse_feed("<html><body>nope</body></html>", "https://news.example/").unwrap_err();
        assert!(matches!(err, DiscoveryError::Feed { .. }));
    }
}
