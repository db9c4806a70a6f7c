//! Targeting descriptor parsing.
//!
//! Campaign rows carry a single free-text descriptor like
//! `"Age 18-35, USA, sports, travel"`. This module extracts the structured
//! pieces: an optional age range, an optional country from a closed
//! vocabulary, and the remaining segments as interest tags. Parsing is pure
//! and never fails; unrecognized sub-fields degrade to absent values.

use once_cell::sync::Lazy;
use regex::Regex;

static AGE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Age (\d+)-(\d+)").unwrap());

/// The closed set of countries a descriptor may target.
#[derive(Debug, Clone)]
pub struct CountryVocabulary {
    countries: Vec<String>,
}

impl CountryVocabulary {
    pub fn new(countries: Vec<String>) -> Self {
        Self { countries }
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.countries.iter().any(|c| c == segment)
    }

    /// Countries from the vocabulary that appear as substrings of `text`.
    fn matches<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.countries
            .iter()
            .filter(|c| text.contains(c.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Structured attributes recovered from one descriptor string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targeting {
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub country: Option<String>,
    pub interests: Vec<String>,
}

/// Parses a targeting descriptor against the given country vocabulary.
///
/// The age range comes from an `Age <min>-<max>` token. A country is
/// recognized only when exactly one vocabulary entry matches; a descriptor
/// naming several countries yields no country constraint. Every remaining
/// comma-separated segment that is neither the age token nor a vocabulary
/// country becomes an interest tag.
pub fn parse(descriptor: &str, vocab: &CountryVocabulary) -> Targeting {
    let mut targeting = Targeting::default();

    if let Some(caps) = AGE_RANGE.captures(descriptor) {
        // Digit-only captures, so a parse failure means the number overflows
        // u32. Either bound overflowing makes the whole token malformed; the
        // range stays all-or-nothing.
        if let (Ok(min), Ok(max)) = (caps[1].parse(), caps[2].parse()) {
            targeting.age_min = Some(min);
            targeting.age_max = Some(max);
        }
    }

    let countries = vocab.matches(descriptor);
    if countries.len() == 1 {
        targeting.country = Some(countries[0].to_string());
    }

    for segment in descriptor.split(',') {
        let segment = segment.trim();
        if segment.is_empty() || segment.starts_with("Age") || vocab.contains(segment) {
            continue;
        }
        targeting.interests.push(segment.to_string());
    }

    targeting
}

/// Splits a user profile's comma-joined interest column into tags.
pub fn split_interest_list(interests: &str) -> Vec<String> {
    interests
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
