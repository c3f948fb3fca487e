//! Answer validation for the survey dialogue.
//!
//! `Email` and `Rating` can only be constructed through the validators in
//! this module, so any value of those types has already been checked.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;

/// Lowest accepted satisfaction rating.
pub const MIN_RATING: u8 = 0;

/// Highest accepted satisfaction rating.
pub const MAX_RATING: u8 = 10;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Replies that mean "no comment".
const DECLINE_TOKENS: &[&str] = &["no", "não", "nao", "n"];

/// Replies that confirm the summary.
const AFFIRMATIVE_TOKENS: &[&str] = &["sim", "s", "yes", "y"];

/// Check that `s` looks like `local@domain.tld`.
///
/// The domain needs at least one dot and a suffix of two or more letters.
/// Nothing beyond that shape is checked.
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_PATTERN.is_match(s)
}

/// A validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Returns `None` when `s` fails [`is_valid_email`].
    pub fn parse(s: &str) -> Option<Self> {
        is_valid_email(s).then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_email(&value) {
            Ok(Self(value))
        } else {
            Err(format!("invalid email address: {:?}", value))
        }
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

/// Why a rating answer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingError {
    /// The answer is not an integer at all.
    NotANumber,
    /// The answer is an integer outside `MIN_RATING..=MAX_RATING`.
    OutOfRange,
}

impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => write!(f, "rating is not an integer"),
            Self::OutOfRange => write!(
                f,
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            ),
        }
    }
}

impl std::error::Error for RatingError {}

/// A satisfaction rating in `0..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, RatingError> {
        if (i64::from(MIN_RATING)..=i64::from(MAX_RATING)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RatingError::OutOfRange)
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

/// Parse a rating answer.
///
/// Surrounding whitespace is ignored. Integers too large for `i64` are
/// reported as out of range rather than as non-numeric.
pub fn parse_rating(s: &str) -> Result<Rating, RatingError> {
    match s.trim().parse::<i64>() {
        Ok(value) => Rating::new(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                Err(RatingError::OutOfRange)
            }
            _ => Err(RatingError::NotANumber),
        },
    }
}

fn matches_token(s: &str, tokens: &[&str]) -> bool {
    let normalized = s.trim().to_lowercase();
    tokens.contains(&normalized.as_str())
}

/// True when a comment answer means "no comment".
pub fn is_decline(s: &str) -> bool {
    matches_token(s, DECLINE_TOKENS)
}

/// True when a confirmation answer means "yes".
pub fn is_affirmative(s: &str) -> bool {
    matches_token(s, AFFIRMATIVE_TOKENS)
}
