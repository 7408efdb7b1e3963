//! Content moderation: profanity and link detection.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ModerationConfig;

/// Scheme, optional subdomain, domain and a 2-4 character TLD.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://([^.]+\.)?[^.]+\.[^/.]{2,4}/?").expect("URL pattern is valid")
});

/// Roots flagged wherever they appear inside a word.
const EMBEDDED_WORDS: &[&str] = &[
    "asshole",
    "bastard",
    "bitch",
    "bullshit",
    "cunt",
    "dildo",
    "fuck",
    "motherfuck",
    "shit",
    "whore",
];

/// Short words that only count as a whole word (or simple plural), since
/// they occur inside too many innocent words.
const WHOLE_WORDS: &[&str] = &[
    "arse", "ass", "bollocks", "cock", "crap", "dick", "douche", "piss", "prick", "pussy",
    "slut", "tits", "twat", "wank",
];

/// Innocent words that contain an embedded root.
const FALSE_POSITIVES: &[&str] = &["scunthorpe", "shitake", "shiitake"];

/// Decides whether a message is profane.
pub trait ProfanityMatcher: Send + Sync {
    fn is_profane(&self, text: &str) -> bool;
}

/// Word-list matcher with leetspeak normalization.
#[derive(Debug, Clone)]
pub struct WordListMatcher {
    embedded: Vec<String>,
    whole: Vec<String>,
    false_positives: Vec<String>,
}

impl Default for WordListMatcher {
    fn default() -> Self {
        Self {
            embedded: to_owned(EMBEDDED_WORDS),
            whole: to_owned(WHOLE_WORDS),
            false_positives: to_owned(FALSE_POSITIVES),
        }
    }
}

impl WordListMatcher {
    /// Built-in lists extended with the configured words. Extra words are
    /// matched anywhere inside a word.
    pub fn from_config(config: &ModerationConfig) -> Self {
        let mut matcher = Self::default();
        matcher
            .embedded
            .extend(config.extra_words.iter().map(|w| normalize_token(w)));
        matcher
            .false_positives
            .extend(config.allowed_words.iter().map(|w| normalize_token(w)));
        matcher.embedded.retain(|w| !w.is_empty());
        matcher.false_positives.retain(|w| !w.is_empty());
        matcher
    }

    fn token_is_profane(&self, token: &str) -> bool {
        if self
            .whole
            .iter()
            .any(|w| token == w || token.strip_suffix('s') == Some(w.as_str()))
        {
            return true;
        }

        let mut cleaned = token.to_string();
        for allowed in &self.false_positives {
            cleaned = cleaned.replace(allowed.as_str(), "");
        }
        self.embedded.iter().any(|w| cleaned.contains(w.as_str()))
    }
}

impl ProfanityMatcher for WordListMatcher {
    fn is_profane(&self, text: &str) -> bool {
        text.split_whitespace()
            .map(normalize_token)
            .filter(|token| !token.is_empty())
            .any(|token| self.token_is_profane(&token))
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Lowercase, undo common character substitutions and keep letters only.
fn normalize_token(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_ascii_punctuation() && c != '$' && c != '@')
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '0' => 'o',
            '1' | '!' => 'i',
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            '7' => 't',
            other => other,
        })
        .filter(|c| c.is_alphabetic())
        .collect()
}

/// Detects links in a message.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    pattern: Regex,
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self {
            pattern: URL_PATTERN.clone(),
        }
    }
}

impl UrlFilter {
    pub fn contains_url(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}
