//! Article validation.
//!
//! [`ContentValidator`] is the cheap gate used while choosing a crawl strategy.
//! [`RecordValidator`] runs once per article before persistence and produces
//! data-quality signals rather than a yes/no answer.

mod content;
mod record;

pub use self::content::{ContentValidator, NO_TITLE_PLACEHOLDER};
pub use self::record::{parse_publish_date, RecordValidation, RecordValidator, TOTAL_CHECKS};
