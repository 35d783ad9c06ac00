//! Validated text primitives shared by the intake crates.
//!
//! - [`NonEmptyText`]: trimmed text guaranteed to hold at least one visible character.
//! - [`Slug`]: a lowercase machine identifier (section ids, field keys).
//! - [`sanitize_text`] / [`sanitize_multiline`]: normalisation applied to free-text answers
//!   and administrator-entered labels before they are persisted.

use std::borrow::Borrow;
use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input held no character that survives slug normalisation
    #[error("Slug cannot be empty")]
    EmptySlug,

    /// A stored slug contained characters outside `a-z`, `0-9`, `_` and `-`
    #[error("invalid slug '{0}' (only lowercase alphanumeric, '_' and '-' allowed)")]
    InvalidSlug(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, or `TextError::Empty` if nothing remains after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Sanitises free text (see [`sanitize_text`]) and wraps the result when it is non-empty.
    ///
    /// Returns `None` for input that is blank after sanitising. Useful for optional text
    /// columns where an empty answer is stored as null.
    pub fn sanitized(input: impl AsRef<str>) -> Option<Self> {
        Self::new(sanitize_text(input.as_ref())).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Lowercase machine identifier used for section ids and field keys.
///
/// A `Slug` only ever contains `a-z`, `0-9`, `_` and `-` and is never empty. Ordering is
/// plain string ordering, which is what schema sorting relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slug(String);

impl Slug {
    /// Normalises arbitrary input into a key: lowercased, every character outside
    /// `a-z 0-9 _ -` dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::EmptySlug`] when no character survives.
    pub fn normalise(input: &str) -> Result<Self, TextError> {
        let slug: String = input
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| is_slug_char(*c))
            .collect();

        if slug.is_empty() {
            return Err(TextError::EmptySlug);
        }
        Ok(Self(slug))
    }

    /// Derives a dashed key from a human title: whitespace becomes `-`, other characters
    /// outside the slug alphabet are dropped, and repeated or edge dashes are removed.
    ///
    /// Falls back to `fallback` when the title yields nothing.
    pub fn from_title(title: &str, fallback: &str) -> Self {
        let mut slug = String::with_capacity(title.len());
        for c in title.trim().chars().flat_map(char::to_lowercase) {
            let c = if c.is_whitespace() { '-' } else { c };
            if !is_slug_char(c) {
                continue;
            }
            if c == '-' && slug.ends_with('-') {
                continue;
            }
            slug.push(c);
        }

        let trimmed = slug.trim_matches('-');
        if trimmed.is_empty() {
            return Self::normalise(fallback).unwrap_or_else(|_| Self("field".to_owned()));
        }
        Self(trimmed.to_owned())
    }

    /// Validates a string that must already be a slug (no normalisation is applied).
    pub fn parse(input: &str) -> Result<Self, TextError> {
        if input.is_empty() {
            return Err(TextError::EmptySlug);
        }
        if !input.chars().all(is_slug_char) {
            return Err(TextError::InvalidSlug(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_slug_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-')
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Slug {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Slug {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Slug {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl serde::Serialize for Slug {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Slug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Slug::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Normalises single-line free text: control characters are dropped, whitespace runs
/// collapse to a single space, and the result is trimmed.
pub fn sanitize_text(input: &str) -> String {
    input
        .split(|c: char| c.is_whitespace())
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`sanitize_text`] but keeps line breaks, for textarea answers.
pub fn sanitize_multiline(input: &str) -> String {
    let normalised = input.replace("\r\n", "\n");
    let lines: Vec<String> = normalised.split('\n').map(sanitize_text).collect();
    lines.join("\n").trim_matches('\n').to_owned()
}
