//! Pattern - Validation and extraction of free-text replies

use regex_lite::Regex;

use crate::application::errors::MachineError;

/// What a reply has to look like to be accepted
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Any non-blank text, kept as typed
    Any,
    /// Compiled from a mask, see [`Pattern::mask`]
    Mask(Regex),
    /// Case-insensitive regular expression
    Regex(Regex),
    /// A digit selecting one of the options, counting from 1
    Options(Vec<String>),
}

impl Pattern {
    /// Translate a mask into a pattern
    ///
    /// `A` matches any non-blank character, `9` a digit and `Z` anything but
    /// a digit. `+` repeats the symbol before it. Any other character has to
    /// match exactly, so `9999A` wants four digits then one more character.
    pub fn mask(mask: &str) -> Result<Self, MachineError> {
        if mask.is_empty() {
            return Err(MachineError::InvalidDefinition("mask is empty".to_string()));
        }

        let mut translated = String::new();
        for symbol in mask.chars() {
            match symbol {
                'A' => translated.push_str(r"\S"),
                '9' => translated.push_str(r"\d"),
                'Z' => translated.push_str("[^0-9]"),
                '+' => translated.push('+'),
                other => translated.push_str(&regex_lite::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }

        Regex::new(&translated)
            .map(Pattern::Mask)
            .map_err(|e| MachineError::InvalidDefinition(format!("mask '{}': {}", mask, e)))
    }

    pub fn regex(regex: &str) -> Result<Self, MachineError> {
        if regex.is_empty() {
            return Err(MachineError::InvalidDefinition("regex is empty".to_string()));
        }

        Regex::new(&format!("(?i){}", regex))
            .map(Pattern::Regex)
            .map_err(|e| MachineError::InvalidDefinition(format!("regex '{}': {}", regex, e)))
    }

    pub fn options(options: Vec<String>) -> Result<Self, MachineError> {
        if options.is_empty() {
            return Err(MachineError::InvalidDefinition("menu has no option".to_string()));
        }
        Ok(Pattern::Options(options))
    }

    /// Useful part of a reply, or `None` when it does not fit
    pub fn filter(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        match self {
            Pattern::Any => Some(text.to_string()),
            Pattern::Mask(re) | Pattern::Regex(re) => re
                .find(text)
                .map(|found| found.as_str().to_string())
                .filter(|found| !found.is_empty()),
            Pattern::Options(options) => text
                .parse::<usize>()
                .ok()
                .and_then(|digit| digit.checked_sub(1))
                .and_then(|index| options.get(index))
                .cloned(),
        }
    }
}
