//! Prompt exclusion parser
//!
//! Pulls "don't give me artist X" constraints out of free text with a fixed,
//! ordered list of regular expressions. This is a best-effort heuristic, not
//! a language parser: phrasings it does not know are silently missed, and a
//! miss only means no filtering happens.
//!
//! Recognized phrasings (matched against the lower-cased prompt):
//! 1. `not|but not|except|excluding|avoid ... released under|by|from NAME name|as the artist`
//! 2. `produced by NAME but|and ... released by other artists`
//! 3. `no songs released under NAME as the artist`
//! 4. `songs produced by NAME ,|but ... released by other artists`
//! 5. `no|without|except|excluding|avoid [songs|tracks|music] [by|from] NAME [songs|tracks|music]`
//!    up to the next punctuation mark or conjunction; a candidate made only
//!    of genre or filler words ("no metal", "no pop ballads") is dropped

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Characters allowed inside a captured name
const NAME: &str = r"[a-z0-9][a-z0-9&.'’\- ]*?";

/// Longest candidate accepted from the catch-all phrasing, in words
const MAX_NAME_WORDS: usize = 5;

/// Words that mean the catch-all phrasing grabbed a clause, not a name
const CLAUSE_MARKERS: [&str; 3] = ["released", "produced", "as the artist"];

/// Words that never name an artist on their own
const NON_ARTIST_WORDS: [&str; 40] = [
    "pop", "rock", "metal", "rap", "country", "soul", "jazz", "blues", "folk", "punk",
    "funk", "disco", "techno", "house", "trap", "edm", "indie", "emo", "grunge", "reggae",
    "hip", "hop", "r&b", "rnb", "classical", "electronic", "dance", "ballads", "ballad",
    "covers", "remixes", "live", "explicit", "lyrics", "vocals", "instrumentals", "slow",
    "sad", "repeats", "duplicates",
];

struct ExclusionPattern {
    regex: Regex,
    /// Catch-all patterns get the clause/length sanity filter
    catch_all: bool,
}

static PATTERNS: Lazy<Vec<ExclusionPattern>> = Lazy::new(|| {
    let specific = [
        format!(
            r"\b(?:but not|not|except|excluding|avoid)\b[^.;!?\n]*?\b(?:released under|by|from)\s+(?P<name>{NAME})(?:'s|’s)?\s+(?:name|as the artist)\b"
        ),
        format!(
            r"\bproduced by\s+(?P<name>{NAME})\s*,?\s+(?:but|and)\b[^.;!?\n]*?\breleased by other artists\b"
        ),
        format!(r"\bno songs released under\s+(?P<name>{NAME})\s+as the artist\b"),
        format!(
            r"\bsongs produced by\s+(?P<name>{NAME})\s*(?:,|\bbut\b)[^.;!?\n]*?\breleased by other artists\b"
        ),
    ];
    let catch_all = format!(
        r"\b(?:no|without|except|excluding|avoid)\s+(?:(?:any|songs|song|tracks|track|music)\s+)*(?:(?:by|from)\s+)?(?P<name>{NAME})(?:\s+(?:songs|song|tracks|track|music))?\s*(?:[,;.!?\n()]|\b(?:and|or|but|please|in|on|with)\b|$)"
    );

    specific
        .iter()
        .map(|pattern| ExclusionPattern {
            // Patterns are compile-time constants
            regex: Regex::new(pattern).expect("invalid exclusion pattern"),
            catch_all: false,
        })
        .chain(std::iter::once(ExclusionPattern {
            regex: Regex::new(&catch_all).expect("invalid exclusion pattern"),
            catch_all: true,
        }))
        .collect()
});

/// Extract excluded artist names from a prompt
///
/// Names are lower-cased, trimmed, stripped of apostrophes and have
/// internal whitespace collapsed. Duplicates are suppressed; first-seen
/// order is kept.
pub fn parse_exclusions(prompt: &str) -> Vec<String> {
    let lowered = prompt.to_lowercase();
    let mut seen = HashSet::new();
    let mut exclusions = Vec::new();

    for pattern in PATTERNS.iter() {
        for captures in pattern.regex.captures_iter(&lowered) {
            let Some(raw) = captures.name("name") else {
                continue;
            };
            let name = normalize_name(raw.as_str());
            if name.is_empty() {
                continue;
            }
            if pattern.catch_all && !plausible_name(&name) {
                tracing::trace!(candidate = %name, "Ignoring clause-like exclusion candidate");
                continue;
            }
            if seen.insert(name.clone()) {
                exclusions.push(name);
            }
        }
    }

    if !exclusions.is_empty() {
        tracing::debug!(?exclusions, "Parsed artist exclusions from prompt");
    }

    exclusions
}

/// Lower-case, drop apostrophes and collapse whitespace
///
/// Applied to both excluded names and track artists before comparing them.
pub fn fold_name(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| *c != '\'' && *c != '’').collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_name(raw: &str) -> String {
    fold_name(raw)
        .trim_matches(|c: char| c == '.' || c == '-' || c == '&')
        .trim()
        .to_string()
}

fn plausible_name(name: &str) -> bool {
    let words: Vec<&str> = name.split_whitespace().collect();
    words.len() <= MAX_NAME_WORDS
        && !CLAUSE_MARKERS.iter().any(|marker| name.contains(marker))
        && !words.iter().all(|word| NON_ARTIST_WORDS.contains(word))
}
