//! Markup to text: noise removal, selector-driven body extraction and page metadata.

mod cleaner;
mod metadata;

pub use self::cleaner::{normalize_text, ContentExtractor, FALLBACK_WORD_LIMIT, MIN_COMBINED_CHARS};
pub use self::metadata::{PageMetadata, MAX_IMAGES};
