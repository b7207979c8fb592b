use std::collections::HashSet;

use crate::error::{GameError, GameResult};
use crate::utils::text::normalize_text;

const TERMS_EN: &str = include_str!("../../resources/profanity_en.txt");
const TERMS_ES: &str = include_str!("../../resources/profanity_es.txt");

pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 20;
pub const GUESS_MAX_CHARS: usize = 30;

/// Terms at least this long are also matched inside longer tokens.
const EMBEDDED_MATCH_MIN_LEN: usize = 5;

/// Profanity and length rules for nicknames and guesses.
///
/// Built once at startup; every known target word in both languages is whitelisted so a
/// correct guess is never flagged.
#[derive(Debug, Clone)]
pub struct TextPolicy {
    terms: HashSet<String>,
    whitelist: HashSet<String>,
}

impl Default for TextPolicy {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl TextPolicy {
    pub fn new<I, S>(whitelist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = TERMS_EN
            .lines()
            .chain(TERMS_ES.lines())
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(normalize_text)
            .collect();
        let whitelist = whitelist
            .into_iter()
            .map(|w| normalize_text(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { terms, whitelist }
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }

    pub fn contains_profanity(&self, text: &str) -> bool {
        let normalized = deobfuscate(&normalize_text(text));
        if normalized.is_empty() || self.whitelist.contains(&normalized) {
            return false;
        }

        let tokens: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let flagged_token = tokens.iter().any(|token| {
            if self.whitelist.contains(*token) {
                return false;
            }
            self.terms.contains(*token)
                || self
                    .terms
                    .iter()
                    .any(|term| term.chars().count() >= EMBEDDED_MATCH_MIN_LEN && token.contains(term.as_str()))
        });
        if flagged_token {
            return true;
        }

        // "s h i t", "s.h.i.t"
        let compact: String = tokens.concat();
        tokens.len() > 1 && !self.whitelist.contains(&compact) && self.terms.contains(&compact)
    }

    /// Returns the trimmed nickname when acceptable.
    pub fn validate_nickname(&self, nickname: &str) -> GameResult<String> {
        let trimmed = nickname.trim();
        if trimmed.is_empty() {
            return Err(GameError::validation("Nickname cannot be empty"));
        }
        let len = trimmed.chars().count();
        if len < NICKNAME_MIN_CHARS {
            return Err(GameError::validation(format!(
                "Nickname must be at least {} characters long",
                NICKNAME_MIN_CHARS
            )));
        }
        if len > NICKNAME_MAX_CHARS {
            return Err(GameError::validation(format!(
                "Nickname must be at most {} characters long",
                NICKNAME_MAX_CHARS
            )));
        }
        if self.contains_profanity(trimmed) {
            return Err(GameError::validation("Nickname contains inappropriate language"));
        }
        Ok(trimmed.to_string())
    }

    /// Returns the trimmed guess when acceptable.
    pub fn validate_guess(&self, guess: &str) -> GameResult<String> {
        let trimmed = guess.trim();
        if trimmed.is_empty() {
            return Err(GameError::validation("Guess cannot be empty"));
        }
        if trimmed.chars().count() > GUESS_MAX_CHARS {
            return Err(GameError::validation(format!(
                "Guess must be at most {} characters long",
                GUESS_MAX_CHARS
            )));
        }
        if self.contains_profanity(trimmed) {
            return Err(GameError::validation("Guess contains inappropriate language"));
        }
        Ok(trimmed.to_string())
    }
}

fn deobfuscate(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '0' => 'o',
            '1' | '!' => 'i',
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            '7' => 't',
            other => other,
        })
        .collect()
}
