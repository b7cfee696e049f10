use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::util::{domain_of, take_chars};
use crate::TARGET_PIPELINE;

/// Combined text a selector strategy must exceed to win.
pub const MIN_COMBINED_CHARS: usize = 200;
/// Word cap for the last-resort body text.
pub const FALLBACK_WORD_LIMIT: usize = 1500;
/// Markup prefix handed to plain tag stripping when DOM extraction fails.
pub const BASIC_CLEAN_CHARS: usize = 5000;

const NOISE_TAGS: &str = "script, style, nav, header, footer, aside, meta, link, button, form, iframe, noscript, svg, path, img, audio, video, source";

const AD_INDICATORS: &[&str] = &[
    "advertisement",
    "ad-container",
    "banner-ad",
    "popup",
    "newsletter",
    "subscribe",
    "social-share",
    "comments",
    "share",
    "related",
    "recommended",
    "popular",
    "trending",
];

// never removed by class/id matching, whatever their attributes say
const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body", "article", "main"];

const GENERIC_SELECTORS: &[&str] = &[
    "article p",
    "main p",
    ".article-content p",
    ".post-content p",
    ".entry-content p",
    ".story-content p",
    ".article-body p",
    ".post-body p",
    "[role=\"main\"] p",
    ".content p",
    ".main-content p",
];

const ERROR_PAGE_INDICATORS: &[&str] = &[
    "page not found",
    "sorry, we couldn't find that page",
    "error 404",
    "404 not found",
    "this page doesn't exist",
];

static DOMAIN_SELECTORS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let bbc = vec![
        "[data-component=\"text-block\"]",
        ".ssrcss-1q0x1qg-Paragraph",
        ".story-body__inner",
        "[role=\"main\"]",
    ];
    HashMap::from([
        ("bbc.com", bbc.clone()),
        ("bbc.co.uk", bbc),
        (
            "npr.org",
            vec![
                ".storytext",
                ".transcript > p",
                "[data-story=\"true\"] p",
                ".storycontent p",
            ],
        ),
        (
            "reuters.com",
            vec![
                ".ArticleBody__container",
                ".StandardArticleBody_body",
                "article p",
            ],
        ),
        (
            "cnn.com",
            vec![".article__content", ".zn-body-text", "article p"],
        ),
    ])
});

static BOILERPLATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<!--.*?-->",
        r"ADVERTISEMENT",
        r"(?is)Sign up for.*?newsletter",
        r"(?i)Follow us on",
        r"(?i)Download Embed",
        r"(?i)Listen · \d+:\d+",
        r"(?i)Transcript",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static SCRIPT_STYLE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").ok());
static TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").ok());
static WHITESPACE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(target: TARGET_PIPELINE, "Skipping unparseable selector {}: {:?}", css, e);
            None
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(text, " ").trim().to_string(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn element_text(el: &scraper::ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Turns fetched article markup into plain text.
///
/// Noise elements are removed first, then selectors are tried from most to least
/// specific: known-domain selectors, generic article containers, and finally any
/// paragraph of plausible length. Extraction never fails; the worst case is a
/// plain tag-stripping pass over the start of the markup.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    fallback_word_limit: usize,
    basic_clean_chars: usize,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        ContentExtractor {
            fallback_word_limit: FALLBACK_WORD_LIMIT,
            basic_clean_chars: BASIC_CLEAN_CHARS,
        }
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&self, html: &str, url: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let domain = domain_of(url);

        let structured =
            panic::catch_unwind(AssertUnwindSafe(|| self.extract_structured(html, &domain)));
        let text = match structured {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(target: TARGET_PIPELINE, "No DOM text found for {}, stripping tags", url);
                self.basic_clean(html)
            }
            Err(_) => {
                warn!(target: TARGET_PIPELINE, "DOM extraction failed for {}, stripping tags", url);
                self.basic_clean(html)
            }
        };

        if looks_like_error_page(&text) {
            warn!(target: TARGET_PIPELINE, "Content of {} looks like an error page", url);
            return String::new();
        }
        text
    }

    fn extract_structured(&self, html: &str, domain: &str) -> Option<String> {
        let mut document = Html::parse_document(html);
        strip_noise(&mut document);

        if let Some(text) = domain_content(&document, domain) {
            debug!(target: TARGET_PIPELINE, "Domain selectors matched for {}", domain);
            return Some(normalize_text(&text));
        }
        if let Some(text) = generic_content(&document) {
            return Some(normalize_text(&text));
        }
        if let Some(text) = paragraph_content(&document) {
            return Some(normalize_text(&text));
        }

        let body = self.body_words(&document);
        if body.is_empty() {
            None
        } else {
            Some(normalize_text(&body))
        }
    }

    fn body_words(&self, document: &Html) -> String {
        let text = match selector("body").and_then(|sel| document.select(&sel).next()) {
            Some(body) => body.text().collect::<Vec<_>>().join(" "),
            None => document.root_element().text().collect::<Vec<_>>().join(" "),
        };
        text.split_whitespace()
            .take(self.fallback_word_limit)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Regex tag stripping with no DOM, used when structured extraction is unavailable.
    pub fn basic_clean(&self, html: &str) -> String {
        let head = take_chars(html, self.basic_clean_chars);
        let without_code = match SCRIPT_STYLE.as_ref() {
            Some(re) => re.replace_all(&head, " ").to_string(),
            None => head,
        };
        let without_tags = match TAG.as_ref() {
            Some(re) => re.replace_all(&without_code, " ").to_string(),
            None => without_code,
        };
        collapse_whitespace(&html_escape::decode_html_entities(&without_tags))
    }
}

/// Detaches noise tags and elements whose class or id matches an ad indicator.
fn strip_noise(document: &mut Html) {
    let mut doomed = Vec::new();

    if let Some(sel) = selector(NOISE_TAGS) {
        doomed.extend(document.select(&sel).map(|el| el.id()));
    }
    if let Some(sel) = selector("[class], [id]") {
        for el in document.select(&sel) {
            if STRUCTURAL_TAGS.contains(&el.value().name()) {
                continue;
            }
            let class = el.value().attr("class").unwrap_or("").to_lowercase();
            let id = el.value().attr("id").unwrap_or("").to_lowercase();
            if AD_INDICATORS
                .iter()
                .any(|ind| class.contains(ind) || id.contains(ind))
            {
                doomed.push(el.id());
            }
        }
    }

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn joined_text(document: &Html, css: &str, min_element_chars: usize) -> Option<String> {
    let sel = selector(css)?;
    let parts: Vec<String> = document
        .select(&sel)
        .map(|el| element_text(&el))
        .filter(|t| t.chars().count() > min_element_chars)
        .collect();
    let combined = parts.join(" ");
    if combined.chars().count() > MIN_COMBINED_CHARS {
        Some(combined)
    } else {
        None
    }
}

fn domain_content(document: &Html, domain: &str) -> Option<String> {
    DOMAIN_SELECTORS
        .get(domain)?
        .iter()
        .find_map(|css| joined_text(document, css, 50))
}

fn generic_content(document: &Html) -> Option<String> {
    GENERIC_SELECTORS
        .iter()
        .find_map(|css| joined_text(document, css, 20))
}

fn paragraph_content(document: &Html) -> Option<String> {
    let sel = selector("p")?;
    let parts: Vec<String> = document
        .select(&sel)
        .map(|el| element_text(&el))
        .filter(|t| {
            let len = t.chars().count();
            len > 50 && len < 1000
        })
        .collect();
    let combined = parts.join(" ");
    if combined.chars().count() > MIN_COMBINED_CHARS {
        Some(combined)
    } else {
        None
    }
}

/// Decodes entities, removes boilerplate phrases and collapses whitespace.
pub fn normalize_text(text: &str) -> String {
    let mut text = html_escape::decode_html_entities(text).to_string();
    for pattern in BOILERPLATE_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").to_string();
    }
    collapse_whitespace(&text)
}

fn looks_like_error_page(text: &str) -> bool {
    let head = take_chars(text, 500).to_lowercase();
    ERROR_PAGE_INDICATORS.iter().any(|ind| head.contains(ind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(n: usize) -> String {
        format!(
            "<p>Paragraph {} describes the council meeting where members debated the budget for several hours.</p>",
            n
        )
    }

    #[test]
    fn strips_noise_and_uses_article_paragraphs() {
        let html = format!(
            r#"<html><head><script>var x = 1;</script><style>p {{}}</style></head>
            <body><nav>Home News Sport</nav>
            <div class="newsletter-signup"><p>Get our newsletter delivered to your inbox every single morning for free.</p></div>
            <article>{}{}{}</article>
            <footer>Copyright</footer></body></html>"#,
            paragraph(1),
            paragraph(2),
            paragraph(3)
        );
        let text = ContentExtractor::new().extract(&html, "https://news.example/story");
        assert!(text.contains("Paragraph 1 describes"));
        assert!(text.contains("Paragraph 3 describes"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Home News Sport"));
        assert!(!text.contains("newsletter delivered"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn domain_selectors_win_for_known_domains() {
        let block = "Officials confirmed on Tuesday that the new bridge would open to traffic next spring after delays.";
        let html = format!(
            r#"<html><body>
            <div data-component="text-block">{block}</div>
            <div data-component="text-block">{block}</div>
            <div data-component="text-block">{block}</div>
            <article><p>Generic article paragraph that should not be chosen for this domain at all.</p></article>
            </body></html>"#
        );
        let text = ContentExtractor::new().extract(&html, "https://www.bbc.co.uk/news/1");
        assert!(text.starts_with("Officials confirmed"));
        assert!(!text.contains("Generic article paragraph"));
    }

    #[test]
    fn falls_back_to_loose_paragraphs() {
        let html = format!(
            "<html><body><div>{}{}{}</div></body></html>",
            paragraph(1),
            paragraph(2),
            paragraph(3)
        );
        let text = ContentExtractor::new().extract(&html, "https://unknown.example/x");
        assert!(text.contains("Paragraph 2 describes"));
    }

    #[test]
    fn short_pages_fall_back_to_body_text() {
        let html = "<html><body><div>Just a few words here.</div></body></html>";
        let text = ContentExtractor::new().extract(html, "https://unknown.example/x");
        assert_eq!(text, "Just a few words here.");
    }

    #[test]
    fn body_fallback_is_word_bounded() {
        let words = "word ".repeat(FALLBACK_WORD_LIMIT + 100);
        let html = format!("<html><body><div>{}</div></body></html>", words);
        let text = ContentExtractor::new().extract(&html, "https://unknown.example/x");
        assert_eq!(text.split_whitespace().count(), FALLBACK_WORD_LIMIT);
    }

    #[test]
    fn normalizes_entities_and_boilerplate() {
        let text = normalize_text(
            "Tom &amp; Jerry   ADVERTISEMENT went   home. Sign up for our daily newsletter today. Listen · 3:45",
        );
        assert_eq!(text, "Tom & Jerry went home. today.");
    }

    #[test]
    fn malformed_markup_never_panics() {
        let extractor = ContentExtractor::new();
        for input in ["<<<>>>", "<p>unclosed <b>tags", "</div></div>", "\u{0}\u{1}", "   "] {
            let _ = extractor.extract(input, "not a url");
        }
        assert_eq!(extractor.extract("", "https://a.example"), "");
    }

    #[test]
    fn error_pages_yield_no_text() {
        let html = "<html><body><h1>Page not found</h1><p>Sorry, we couldn't find that page. Try the homepage instead of this broken link.</p></body></html>";
        assert_eq!(
            ContentExtractor::new().extract(html, "https://news.example/missing"),
            ""
        );
    }

    #[test]
    fn basic_clean_strips_tags_and_scripts() {
        let cleaned = ContentExtractor::new()
            .basic_clean("<div><script>alert(1)</script><b>Bold</b> &lt;text&gt;</div>");
        assert_eq!(cleaned, "Bold <text>");
    }
}
