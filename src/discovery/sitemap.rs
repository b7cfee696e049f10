//! XML sitemap parsing.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::DiscoveryError;
use crate::util::is_valid_url;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<urlset>`: page locations.
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: locations of further sitemaps.
    Index(Vec<String>),
}

fn sitemap_error(url: &str, reason: impl Into<String>) -> DiscoveryError {
    DiscoveryError::Sitemap {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Parses a sitemap or sitemap index. Only elements in the standard sitemap
/// namespace are accepted; a document in any other namespace is an error.
pub fn parse_sitemap(xml: &str, source_url: &str) -> Result<SitemapDocument, DiscoveryError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<Vec<u8>> = None;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locations = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if root.is_none() {
                    let namespace = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"xmlns")
                        .map(|a| String::from_utf8_lossy(&a.value).trim().to_string());
                    if namespace.as_deref() != Some(SITEMAP_NAMESPACE) {
                        return Err(sitemap_error(
                            source_url,
                            format!("unexpected namespace {:?}", namespace),
                        ));
                    }
                    if name != b"urlset" && name != b"sitemapindex" {
                        return Err(sitemap_error(
                            source_url,
                            format!("unexpected root element <{}>", String::from_utf8_lossy(&name)),
                        ));
                    }
                    root = Some(name);
                } else if name == b"loc" {
                    in_loc = true;
                    current.clear();
                }
            }
            Ok(Event::Text(t)) if in_loc => {
                let text = t
                    .decode()
                    .map_err(|e| sitemap_error(source_url, e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(t)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::GeneralRef(r)) if in_loc => {
                let name = r
                    .decode()
                    .map_err(|e| sitemap_error(source_url, e.to_string()))?;
                current.push('&');
                current.push_str(&name);
                current.push(';');
            }
            Ok(Event::End(e)) if in_loc && e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = html_escape::decode_html_entities(current.trim()).to_string();
                if is_valid_url(&loc) {
                    locations.push(loc);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(sitemap_error(
                    source_url,
                    format!("error at position {}: {}", reader.error_position(), e),
                ))
            }
            _ => {}
        }
    }

    match root.as_deref() {
        Some(b"sitemapindex") => Ok(SitemapDocument::Index(locations)),
        Some(_) => Ok(SitemapDocument::UrlSet(locations)),
        None => Err(sitemap_error(source_url, "empty document")),
    }
}
