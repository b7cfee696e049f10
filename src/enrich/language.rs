use anyhow::Result;
use std::collections::HashSet;
use whatlang::{detect, Lang};

use super::LanguageDetector;
use super::keywords::tokens;

const ENGLISH_MARKERS: &[&str] = &["the", "and", "of", "to", "in", "is", "you", "that", "it", "for"];

/// Distinct marker words that must appear before text is called English.
pub const ENGLISH_THRESHOLD: usize = 5;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Two-letter ISO 639-1 code for a detected language, matching what pages
/// declare in `<html lang>`. Languages without one map to `None`.
pub fn iso_639_1(lang: Lang) -> Option<&'static str> {
    let code = match lang {
        Lang::Eng => "en",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Nld => "nl",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Pol => "pl",
        Lang::Ces => "cs",
        Lang::Slk => "sk",
        Lang::Ron => "ro",
        Lang::Hun => "hu",
        Lang::Ell => "el",
        Lang::Bul => "bg",
        Lang::Hrv => "hr",
        Lang::Srp => "sr",
        Lang::Slv => "sl",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Nob => "nb",
        Lang::Fin => "fi",
        Lang::Est => "et",
        Lang::Lav => "lv",
        Lang::Lit => "lt",
        Lang::Tur => "tr",
        Lang::Ara => "ar",
        Lang::Heb => "he",
        Lang::Pes => "fa",
        Lang::Hin => "hi",
        Lang::Urd => "ur",
        Lang::Ben => "bn",
        Lang::Cmn => "zh",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Vie => "vi",
        Lang::Tha => "th",
        Lang::Ind => "id",
        Lang::Cat => "ca",
        Lang::Afr => "af",
        Lang::Epo => "eo",
        Lang::Lat => "la",
        _ => return None,
    };
    Some(code)
}

/// English when enough common English function words occur; otherwise a
/// statistical guess when that guess is reliable, else `unknown`.
#[derive(Debug, Clone, Default)]
pub struct CommonWordLanguageDetector;

impl LanguageDetector for CommonWordLanguageDetector {
    fn detect_language(&self, text: &str) -> Result<String> {
        let words: HashSet<String> = text
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| w.len() >= 2)
            .map(|w| w.to_lowercase())
            .collect();
        let hits = ENGLISH_MARKERS
            .iter()
            .filter(|m| words.contains(**m))
            .count();
        if hits > ENGLISH_THRESHOLD {
            return Ok("en".to_string());
        }

        // short or marker-poor text: only trust a confident statistical guess
        if tokens(text).len() >= 20 {
            if let Some(info) = detect(text) {
                if info.is_reliable() {
                    if let Some(code) = iso_639_1(info.lang()) {
                        return Ok(code.to_string());
                    }
                }
            }
        }
        Ok(UNKNOWN_LANGUAGE.to_string())
    }
}
