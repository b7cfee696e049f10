//! Article metadata read from page markup: title, bylines, dates, images, description, language.

use scraper::{Html, Selector};
use url::Url;

const AUTHOR_SELECTORS: &[&str] = &[
    ".author",
    ".byline",
    "[rel=\"author\"]",
    ".article-author",
    ".post-author",
];

const DATE_TEXT_SELECTORS: &[&str] = &[".publish-date", ".post-date", ".article-date"];

pub const MAX_IMAGES: usize = 5;
const DESCRIPTION_WORDS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub images: Vec<String>,
    pub description: Option<String>,
    pub language: Option<String>,
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    document
        .select(&sel)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
}

impl PageMetadata {
    pub fn from_html(html: &str, page_url: &str) -> Self {
        let document = Html::parse_document(html);
        Self::from_document(&document, page_url)
    }

    pub fn from_document(document: &Html, page_url: &str) -> Self {
        let base = Url::parse(page_url).ok();
        PageMetadata {
            title: title(document),
            authors: authors(document),
            publish_date: publish_date(document),
            images: images(document, base.as_ref()),
            description: description(document),
            language: language(document),
        }
    }
}

fn title(document: &Html) -> Option<String> {
    first_text(document, "title")
        .or_else(|| first_attr(document, "meta[property=\"og:title\"]", "content"))
        .or_else(|| first_text(document, "h1"))
}

fn authors(document: &Html) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |name: String| {
        let name = name
            .trim()
            .trim_start_matches("By ")
            .trim_start_matches("by ")
            .trim()
            .to_string();
        if !name.is_empty() && name.chars().count() < 100 && !found.contains(&name) {
            found.push(name);
        }
    };

    if let Some(meta) = first_attr(document, "meta[name=\"author\"]", "content") {
        push(meta);
    }
    for css in AUTHOR_SELECTORS {
        if let Ok(sel) = Selector::parse(css) {
            for el in document.select(&sel) {
                let text = el.text().collect::<Vec<_>>().join(" ");
                push(text.split_whitespace().collect::<Vec<_>>().join(" "));
            }
        }
    }
    found
}

fn publish_date(document: &Html) -> Option<String> {
    first_attr(document, "time[datetime]", "datetime")
        .or_else(|| {
            first_attr(
                document,
                "meta[property=\"article:published_time\"]",
                "content",
            )
        })
        .or_else(|| {
            DATE_TEXT_SELECTORS
                .iter()
                .find_map(|css| first_text(document, css))
        })
}

fn images(document: &Html, base: Option<&Url>) -> Vec<String> {
    let Ok(sel) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for src in document.select(&sel).filter_map(|el| el.value().attr("src")) {
        let resolved = match base {
            Some(base) => base.join(src.trim()).ok(),
            None => Url::parse(src.trim()).ok(),
        };
        if let Some(url) = resolved {
            if matches!(url.scheme(), "http" | "https") {
                let url = url.to_string();
                if !out.contains(&url) {
                    out.push(url);
                }
            }
        }
        if out.len() >= MAX_IMAGES {
            break;
        }
    }
    out
}

fn description(document: &Html) -> Option<String> {
    first_attr(document, "meta[name=\"description\"]", "content")
        .or_else(|| first_attr(document, "meta[property=\"og:description\"]", "content"))
        .or_else(|| {
            first_text(document, "p").map(|p| {
                p.split_whitespace()
                    .take(DESCRIPTION_WORDS)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
        })
}

fn language(document: &Html) -> Option<String> {
    let lang = first_attr(document, "html[lang]", "lang")?;
    let primary = lang.split(['-', '_']).next()?.to_lowercase();
    if primary.is_empty() {
        None
    } else {
        Some(primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html lang="en-GB"><head>
        <title> Council approves   new park </title>
        <meta name="description" content="The council voted on Monday.">
        <meta property="article:published_time" content="2024-03-01T10:00:00Z">
        </head><body>
        <span class="byline">By Jane Smith</span>
        <a rel="author" href="/staff/jane">Jane Smith</a>
        <div class="author">John O'Neil</div>
        <img src="/images/park.jpg"><img src="//cdn.example/a.png"><img src="data:image/png;base64,AAA">
        <p>First paragraph.</p>
        </body></html>"#;

    #[test]
    fn reads_page_metadata() {
        let meta = PageMetadata::from_html(PAGE, "https://news.example/story");
        assert_eq!(meta.title.as_deref(), Some("Council approves new park"));
        assert_eq!(meta.description.as_deref(), Some("The council voted on Monday."));
        assert_eq!(meta.publish_date.as_deref(), Some("2024-03-01T10:00:00Z"));
        assert_eq!(meta.authors, vec!["John O'Neil".to_string(), "Jane Smith".to_string()]);
        assert_eq!(
            meta.images,
            vec![
                "https://news.example/images/park.jpg".to_string(),
                "https://cdn.example/a.png".to_string()
            ]
        );
        assert_eq!(meta.language.as_deref(), Some("en"));
    }

    #[test]
    fn description_falls_back_to_first_paragraph() {
        let meta = PageMetadata::from_html(
            "<html><body><p>Only paragraph here.</p></body></html>",
            "https://news.example/x",
        );
        assert_eq!(meta.description.as_deref(), Some("Only paragraph here."));
        assert_eq!(meta.title, None);
        assert!(meta.authors.is_empty());
        assert_eq!(meta.language, None);
    }

    #[test]
    fn time_element_wins_over_text_dates() {
        let meta = PageMetadata::from_html(
            r#"<html><body><span class="post-date">yesterday</span><time datetime="2024-05-05">May 5</time></body></html>"#,
            "https://news.example/x",
        );
        assert_eq!(meta.publish_date.as_deref(), Some("2024-05-05"));
    }
}
