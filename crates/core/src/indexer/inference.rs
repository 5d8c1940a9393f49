//! Best-effort quality and language tags from release titles.

use super::types::Quality;

const FOUR_K: &[&str] = &["2160p", "4k", "uhd"];
const TWO_K: &[&str] = &["1440p", "2k"];
const HD: &[&str] = &["1080p", "720p", "hdrip", "bluray"];
const SD: &[&str] = &["480p", "360p", "dvdrip", "webrip", "cam", "ts"];

const LANGUAGES: &[(&str, &str)] = &[("english", "en"), ("french", "fr"), ("spanish", "es")];

/// Infer a resolution tier from substrings of the lowercased title.
///
/// Tiers are checked from 4K down and the first hit wins. Short markers such
/// as `ts` also match inside words, so the result is a hint only.
pub fn infer_quality(title: &str) -> Quality {
    let lower = title.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(FOUR_K) {
        Quality::FourK
    } else if has(TWO_K) {
        Quality::TwoK
    } else if has(HD) {
        Quality::Hd
    } else if has(SD) {
        Quality::Sd
    } else {
        Quality::Unknown
    }
}

/// Infer a language code from spelled-out language names.
pub fn infer_language(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, code)| code.to_string())
}
