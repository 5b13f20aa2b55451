//! Errors in field tag strings
use std::fmt::Display;

use itertools::Itertools;
use pest::RuleType;

use crate::field_tag::VALID_KEYS;

/// Type alias for a `Result` with [`TagError`] as the error type.
pub type TResult<T> = Result<T, TagError>;

/// The broad class a [`TagError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagErrorClass {
    /// A token could not be read at all (bad integer, malformed condition).
    Syntax,
    /// A token was read but its value is not allowed (too small, unknown literal).
    Range,
    /// Column or length were never given.
    MissingParameter,
}

/// An error in a field tag such as `"col=1,len=10"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// Indicates that a numeric parameter was not a valid integer.
    Syntax { param: &'static str, token: String },

    /// Indicates that a numeric parameter was below the smallest allowed value.
    Range { param: &'static str, value: i64, min: i64 },

    /// Indicates an override literal other than `byte` or `rune`.
    InvalidOverride(String),

    /// Indicates a named parameter whose key is not in the alias table.
    InvalidOption(String),

    /// Indicates a positional parameter past the last positional slot (override).
    UnexpectedPositional { index: usize, token: String },

    /// Indicates a condition that is not in the form `column-length-value`.
    MalformedCondition(String),

    /// Indicates that the tag had fewer than two parameters.
    MissingParameter { found: usize },

    /// Indicates that column or length was never set after all parameters were read.
    Unresolved(&'static str),

    /// Indicates that the tag did not match the tag grammar at all.
    Grammar(String),
}

impl TagError {
    pub(crate) fn from_pest<R: RuleType>(e: pest::error::Error<R>, tag: &str) -> Self {
        Self::Grammar(format!("'{tag}': {e}"))
    }

    /// Which class of failure this is.
    pub fn class(&self) -> TagErrorClass {
        match self {
            Self::Syntax { .. } | Self::MalformedCondition(_) | Self::Grammar(_) => TagErrorClass::Syntax,
            Self::Range { .. }
            | Self::InvalidOverride(_)
            | Self::InvalidOption(_)
            | Self::UnexpectedPositional { .. } => TagErrorClass::Range,
            Self::MissingParameter { .. } | Self::Unresolved(_) => TagErrorClass::MissingParameter,
        }
    }
}

impl Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax { param, token } => {
                write!(f, "Could not parse the {param} parameter '{token}' as an integer")
            },
            Self::Range { param, value, min } => {
                if param == &"column" {
                    write!(f, "The column parameter was {value} but cannot be less than {min} (columns are 1-indexed, not 0-indexed)")
                } else {
                    write!(f, "The {param} parameter was {value} but cannot be less than {min}")
                }
            },
            Self::InvalidOverride(s) => write!(f, "Invalid override '{s}', expected 'byte' or 'rune'"),
            Self::InvalidOption(key) => {
                write!(f, "Invalid tag option '{key}', valid options are: {}", VALID_KEYS.iter().join(", "))
            },
            Self::UnexpectedPositional { index, token } => {
                write!(f, "Positional parameter '{token}' at index {index} has no slot (positional order is column, length, occurs, override)")
            },
            Self::MalformedCondition(s) => {
                write!(f, "Invalid condition '{s}', conditions must be in the form column-length-value")
            },
            Self::MissingParameter { found } => {
                write!(f, "Not enough tag parameters ({found} found), column and length must be provided")
            },
            Self::Unresolved(param) => write!(f, "The {param} parameter was never given"),
            Self::Grammar(msg) => write!(f, "Tag does not match the tag grammar: {msg}"),
        }
    }
}

impl std::error::Error for TagError {}
