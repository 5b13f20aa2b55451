//! Represent field tags as Rust types.
//!
//! Every decoded field carries a tag string describing where it lives in the
//! record. The first step in using a tag is to parse it into a
//! [`FieldDescriptor`]:
//!
//! ```
//! # use flatfile::field_tag::{FieldDescriptor, Override};
//! let fd = FieldDescriptor::parse("col=1,len=1,override=byte").unwrap();
//! assert_eq!(fd.column(), 1);
//! assert_eq!(fd.length(), 1);
//! assert_eq!(fd.type_override(), Override::Byte);
//! ```
//!
//! Parameters are either positional or named. Positional parameters are read
//! by their index in the tag: column, length, occurs, then override. Named
//! parameters may appear in any order and use the following keys:
//!
//! | Key                     | Meaning                                       |
//! |-------------------------|-----------------------------------------------|
//! | `col`, `column`         | 1-indexed starting column                     |
//! | `len`, `length`         | width in bytes (per element for repetitions)  |
//! | `occ`, `occurs`         | number of repetitions, at least 2             |
//! | `ovr`, `override`       | `byte` or `rune`                              |
//! | `cond`, `condition`     | `column-length-value` guard on the record     |
//!
//! Both styles can be mixed, as long as each positional parameter sits in its
//! own slot: `"17,len=15"` is column 17, length 15, and `"len=2,col=32"` is
//! column 32, length 2.
use std::fmt::Display;
use std::str::FromStr;

use pest::Parser;

use crate::tag_error::{TResult, TagError};

#[derive(Parser)]
#[grammar = "tag.pest"]
pub(crate) struct TagParser;

/// Every key accepted in a named parameter.
pub(crate) const VALID_KEYS: &[&str] = &[
    "col", "column", "len", "length", "occ", "occurs", "ovr", "override", "cond", "condition",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Column,
    Length,
    Occurs,
    Override,
    Condition,
}

impl Key {
    fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "col" | "column" => Some(Self::Column),
            "len" | "length" => Some(Self::Length),
            "occ" | "occurs" => Some(Self::Occurs),
            "ovr" | "override" => Some(Self::Override),
            "cond" | "condition" => Some(Self::Condition),
            _ => None,
        }
    }

    fn from_slot(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Column),
            1 => Some(Self::Length),
            2 => Some(Self::Occurs),
            3 => Some(Self::Override),
            _ => None,
        }
    }
}

/// Forces a literal interpretation of a field instead of the default numeric one.
///
/// A `u8` field is normally read as a decimal number, so `"7"` becomes 7. With
/// `Byte` the first byte is stored as is, so `"7"` becomes 55. Likewise, `Rune`
/// makes an `i32`, `u32` or `char` field hold the code point of the leading
/// UTF-8 character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Override {
    #[default]
    None,
    Byte,
    Rune,
}

impl FromStr for Override {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "byte" => Ok(Self::Byte),
            "rune" => Ok(Self::Rune),
            _ => Err(TagError::InvalidOverride(s.to_string())),
        }
    }
}

impl Display for Override {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Override::None => "none",
            Override::Byte => "byte",
            Override::Rune => "rune",
        };

        write!(f, "{s}")
    }
}

/// A guard on a field: the field is only decoded if the record holds
/// `expected` at `column..column+length`.
///
/// Written in a tag as `cond=column-length-value`, e.g. `cond=1-4-CUST`. Only
/// the first two dashes separate components, so the expected value may contain
/// dashes itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Condition {
    column: usize,
    length: usize,
    expected: String,
}

impl Condition {
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// `true` if `record` holds the expected value at the condition's columns.
    ///
    /// A condition that reaches past the end of `record` does not match.
    pub fn matches(&self, record: &[u8]) -> bool {
        let start = self.column - 1;
        record
            .get(start..start.saturating_add(self.length))
            .map_or(false, |window| window == self.expected.as_bytes())
    }
}

impl FromStr for Condition {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (Some(column), Some(length), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TagError::MalformedCondition(s.to_string()));
        };

        Ok(Self {
            column: parse_bounded(column.trim(), "condition column", 1)?,
            length: parse_bounded(length.trim(), "condition length", 1)?,
            expected: expected.to_string(),
        })
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.column, self.length, self.expected)
    }
}

/// The parsed form of one field's tag.
///
/// A descriptor always has a column and length of at least 1, and either no
/// repetition (`occurs() == 0`) or at least two repetitions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldDescriptor {
    column: usize,
    length: usize,
    occurs: usize,
    type_override: Override,
    condition: Option<Condition>,
}

impl FieldDescriptor {
    /// Parse a tag string and return a `FieldDescriptor`.
    ///
    /// Leading and trailing whitespace around each key and value is ignored,
    /// except after the expected value of a condition.
    /// Returns an error if any parameter is invalid or if the column or length
    /// is missing; no partially filled descriptor is ever returned.
    pub fn parse(tag: &str) -> TResult<Self> {
        let tree = TagParser::parse(Rule::tag, tag)
            .map_err(|e| TagError::from_pest(e, tag))?
            .next()
            .ok_or_else(|| TagError::Grammar(tag.to_string()))?;

        let params: Vec<_> = tree.into_inner()
            .filter(|p| p.as_rule() == Rule::param)
            .collect();

        if params.len() < 2 {
            return Err(TagError::MissingParameter { found: params.len() });
        }

        let mut column = None;
        let mut length = None;
        let mut occurs = 0;
        let mut type_override = Override::None;
        let mut condition = None;

        for (index, param) in params.into_iter().enumerate() {
            let inner = param.into_inner()
                .next()
                .ok_or_else(|| TagError::Grammar(tag.to_string()))?;

            let (key, value) = match inner.as_rule() {
                Rule::named => {
                    let mut pair = inner.into_inner();
                    let alias = pair.next().map(|p| p.as_str().trim()).unwrap_or_default();
                    let value = pair.next().map(|p| p.as_str()).unwrap_or_default();
                    let key = Key::from_alias(alias)
                        .ok_or_else(|| TagError::InvalidOption(alias.to_string()))?;
                    (key, value)
                },
                Rule::positional => {
                    let value = inner.as_str().trim();
                    let key = Key::from_slot(index)
                        .ok_or_else(|| TagError::UnexpectedPositional { index, token: value.to_string() })?;
                    (key, value)
                },
                _ => return Err(TagError::Grammar(tag.to_string())),
            };

            // The expected literal of a condition keeps its padding
            match key {
                Key::Column => column = Some(parse_bounded(value.trim(), "column", 1)?),
                Key::Length => length = Some(parse_bounded(value.trim(), "length", 1)?),
                Key::Occurs => occurs = parse_bounded(value.trim(), "occurs", 2)?,
                Key::Override => type_override = value.trim().parse()?,
                Key::Condition => condition = Some(value.parse()?),
            }
        }

        let column = column.ok_or(TagError::Unresolved("column"))?;
        let length = length.ok_or(TagError::Unresolved("length"))?;

        Ok(Self { column, length, occurs, type_override, condition })
    }

    /// The 1-indexed starting column of the field.
    pub fn column(&self) -> usize {
        self.column
    }

    /// The width of the field, or of each element for repeated fields.
    pub fn length(&self) -> usize {
        self.length
    }

    /// The number of repetitions, 0 if the tag had no `occurs` parameter.
    pub fn occurs(&self) -> usize {
        self.occurs
    }

    pub fn type_override(&self) -> Override {
        self.type_override
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

impl Display for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "col={},len={}", self.column, self.length)?;
        if self.occurs > 0 {
            write!(f, ",occ={}", self.occurs)?;
        }
        if self.type_override != Override::None {
            write!(f, ",ovr={}", self.type_override)?;
        }
        if let Some(cond) = &self.condition {
            write!(f, ",cond={cond}")?;
        }
        Ok(())
    }
}

fn parse_bounded(token: &str, param: &'static str, min: i64) -> TResult<usize> {
    let value: i64 = token.parse()
        .map_err(|_| TagError::Syntax { param, token: token.to_string() })?;

    if value < min {
        return Err(TagError::Range { param, value, min });
    }

    usize::try_from(value).map_err(|_| TagError::Syntax { param, token: token.to_string() })
}
