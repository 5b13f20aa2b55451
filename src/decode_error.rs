//! Errors in converting and decoding flat file data
use std::fmt::Display;
use std::ops::Range;

use crate::field_tag::Override;
use crate::tag_error::TagError;

/// A type alias for `Result` with [`ConvertError`] as the error type.
pub type CResult<T> = Result<T, ConvertError>;

/// Errors converting one slice of a record into a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Indicates that the raw bytes are not a valid literal for the target type.
    Syntax { raw: String, target: &'static str },
    /// Indicates a valid literal that does not fit in the target type.
    Range { raw: String, target: &'static str },
    /// Indicates that the bytes did not start with a complete UTF-8 character.
    InvalidRune { raw: Vec<u8> },
    /// Indicates that there were no bytes to take a byte or rune from.
    Empty { target: &'static str },
    /// Indicates an override used on a field type it cannot apply to.
    UnsupportedOverride { type_override: Override, target: &'static str },
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax { raw, target } => write!(f, "Could not parse '{raw}' as a {target}"),
            Self::Range { raw, target } => write!(f, "The value '{raw}' is out of range for a {target}"),
            Self::InvalidRune { raw } => write!(f, "The bytes {raw:?} do not begin with a valid UTF-8 character"),
            Self::Empty { target } => write!(f, "No data to read a {target} from"),
            Self::UnsupportedOverride { type_override, target } => {
                write!(f, "The '{type_override}' override cannot be used on a {target} field")
            },
        }
    }
}

impl std::error::Error for ConvertError {}

/// A type alias for `Result` with [`DecodeError`] as the error type.
pub type DResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding a record.
#[derive(Debug)]
pub enum DecodeError {
    /// Indicates that a field's tag could not be parsed.
    Tag { field: &'static str, tag: String, source: TagError },
    /// Indicates that a slice could not be converted into the field's type.
    Conversion(ConvertError),
    /// Indicates a `Vec` field whose tag has no `occurs` parameter.
    MissingOccurs,
    /// Indicates a `Vec` field whose `occurs` is too large to allocate.
    TooManyElements(usize),
    /// Wraps an error raised while filling one field with the field's context.
    ///
    /// Nested records produce a chain of these, outermost field first.
    Field { field: &'static str, tag: String, span: Range<usize>, source: Box<DecodeError> },
    /// Indicates that there was an I/O error while reading a line of a flat file.
    Read(std::io::Error, usize),
}

impl DecodeError {
    /// Follow `Field` wrappers down to the error that started the failure.
    pub fn root_cause(&self) -> &DecodeError {
        let mut err = self;
        while let Self::Field { source, .. } = err {
            err = &**source;
        }
        err
    }

    /// The field names from the outermost record to the failing field.
    pub fn field_path(&self) -> Vec<&'static str> {
        let mut path = vec![];
        let mut err = self;
        loop {
            match err {
                Self::Field { field, source, .. } => {
                    path.push(*field);
                    err = &**source;
                },
                Self::Tag { field, .. } => {
                    path.push(*field);
                    return path;
                },
                _ => return path,
            }
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag { field, tag, source } => write!(f, "Failed to parse the tag \"{tag}\" of field '{field}': {source}"),
            Self::Conversion(e) => write!(f, "Error converting value: {e}"),
            Self::MissingOccurs => write!(f, "An occurs parameter must be provided for Vec fields, e.g. \"col,len,occurs\""),
            Self::TooManyElements(n) => write!(f, "Cannot allocate {n} elements for a Vec field"),
            Self::Field { field, tag, span, source } => {
                write!(f, "Failed to decode field '{field}' (tag \"{tag}\", bytes {}..{}): {source}", span.start, span.end)
            },
            Self::Read(e, line_num) => write!(f, "Error reading line {line_num} of the flat file: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tag { source, .. } => Some(source),
            Self::Conversion(e) => Some(e),
            Self::Field { source, .. } => Some(source.as_ref()),
            Self::Read(e, _) => Some(e),
            Self::MissingOccurs | Self::TooManyElements(_) => None,
        }
    }
}

impl From<ConvertError> for DecodeError {
    fn from(value: ConvertError) -> Self {
        Self::Conversion(value)
    }
}
