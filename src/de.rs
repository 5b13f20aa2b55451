//! Decode flat file records into Rust structures
//!
//! # Basic usage
//!
//! This module expects that you have a type implementing [`Record`] (usually
//! through `#[derive(FlatRecord)]`) and a buffer holding one record. Each
//! tagged field is cut out of the buffer at its declared columns and
//! converted to the field's type:
//!
//! ```
//! use flatfile::{Record, Schema};
//! use flatfile::de::from_bytes;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u8,
//!     weight: f32,
//! }
//!
//! impl Record for Person {
//!     fn schema() -> Schema<Self> {
//!         Schema::<Self>::builder()
//!             .field("name", "1,8", |p| &mut p.name)
//!             .field("age", "9,2", |p| &mut p.age)
//!             .field("weight", "11,5", |p| &mut p.weight)
//!             .build()
//!     }
//! }
//!
//! let p: Person = from_bytes(b"John Doe30180.5").unwrap();
//! assert_eq!(p, Person { name: "John Doe".to_string(), age: 30, weight: 180.5 });
//! ```
//!
//! Text is kept verbatim by default, including any padding. Use
//! [`DecodeSettings`] and the `_custom` functions to trim it.
//!
//! # Short records
//!
//! A field whose first column lies past the end of the buffer is skipped and
//! keeps whatever value it had; a field that starts inside the buffer but runs
//! past its end gets the truncated slice. This is not an error:
//!
//! ```
//! # use flatfile::{Record, Schema};
//! # use flatfile::de::from_bytes;
//! # #[derive(Debug, Default, PartialEq)]
//! # struct Person {
//! #     name: String,
//! #     age: u8,
//! #     weight: f32,
//! # }
//! # impl Record for Person {
//! #     fn schema() -> Schema<Self> {
//! #         Schema::<Self>::builder()
//! #             .field("name", "1,8", |p| &mut p.name)
//! #             .field("age", "9,2", |p| &mut p.age)
//! #             .field("weight", "11,5", |p| &mut p.weight)
//! #             .build()
//! #     }
//! # }
//! let p: Person = from_bytes(b"Jane Doe4").unwrap();
//! assert_eq!(p.age, 4);
//! assert_eq!(p.weight, 0.0);
//! ```
//!
//! # Decoding part of a record
//!
//! [`decode_range`] limits decoding to a range of field indices. With
//! [`FieldRange::continuation`] the buffer is treated as the continuation of a
//! record whose earlier fields were already decoded: the first field in the
//! range is placed at the start of the buffer. Combined with
//! [`estimate_decodable_fields`] this allows a record to be decoded as it
//! arrives in pieces (see [`ChunkedDecoder`](crate::reader::ChunkedDecoder)):
//!
//! ```
//! # use flatfile::{Record, Schema};
//! use flatfile::de::{decode_range, FieldRange};
//! # #[derive(Debug, Default, PartialEq)]
//! # struct Person {
//! #     name: String,
//! #     age: u8,
//! #     weight: f32,
//! # }
//! # impl Record for Person {
//! #     fn schema() -> Schema<Self> {
//! #         Schema::<Self>::builder()
//! #             .field("name", "1,8", |p| &mut p.name)
//! #             .field("age", "9,2", |p| &mut p.age)
//! #             .field("weight", "11,5", |p| &mut p.weight)
//! #             .build()
//! #     }
//! # }
//! let mut p = Person::default();
//! decode_range(b"John Doe", &mut p, FieldRange::all().take(1)).unwrap();
//! decode_range(b"30180.5", &mut p, FieldRange::starting_at(1).continuation(true)).unwrap();
//! assert_eq!(p, Person { name: "John Doe".to_string(), age: 30, weight: 180.5 });
//! ```
use tracing::{debug, trace};

use crate::decode_error::{DResult, DecodeError};
use crate::schema::Record;

/// Settings for decoding records
///
/// To use, instantiate the default version with `DecodeSettings::default()` and
/// modify the desired settings with the public methods:
///
/// ```
/// # use flatfile::de::DecodeSettings;
///
/// let settings = DecodeSettings::default().do_trim_text(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DecodeSettings {
    pub(crate) trim_text: bool,
    pub(crate) trim_numbers: bool,
}

impl DecodeSettings {
    /// Set whether to trim leading and trailing whitespace from text fields.
    ///
    /// Default is `false`, i.e. text is stored exactly as it appears in the record.
    pub fn do_trim_text(mut self, trim_text: bool) -> Self {
        self.trim_text = trim_text;
        self
    }

    /// Set whether to trim leading and trailing whitespace before parsing
    /// numeric and boolean fields.
    ///
    /// Default is `false`, so a space padded number such as `" 42"` is a
    /// conversion error.
    pub fn do_trim_numbers(mut self, trim_numbers: bool) -> Self {
        self.trim_numbers = trim_numbers;
        self
    }
}

/// Which fields of a record to decode.
///
/// Indices count every field in declaration order, including untagged ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldRange {
    start: usize,
    count: usize,
    continuation: bool,
}

impl FieldRange {
    /// Every field, with columns relative to the start of the record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every field from index `start` onward.
    pub fn starting_at(start: usize) -> Self {
        Self { start, ..Self::default() }
    }

    /// Decode at most `count` fields; 0 means no limit.
    pub fn take(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set whether the buffer continues a record that was partially decoded
    /// already. When `true` and the range does not start at field 0, the first
    /// tagged field in the range is taken to begin at the first byte of the
    /// buffer and every later column is shifted accordingly.
    pub fn continuation(mut self, continuation: bool) -> Self {
        self.continuation = continuation;
        self
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    fn end(&self, n_fields: usize) -> usize {
        if self.count > 0 {
            self.start.saturating_add(self.count).min(n_fields)
        } else {
            n_fields
        }
    }
}

/// Decode a complete record from bytes into a new value.
pub fn from_bytes<R: Record>(buf: &[u8]) -> DResult<R> {
    from_bytes_custom(buf, &DecodeSettings::default())
}

/// Decode a complete record from bytes into a new value with customized settings.
pub fn from_bytes_custom<R: Record>(buf: &[u8], settings: &DecodeSettings) -> DResult<R> {
    let mut record = R::default();
    decode_custom(buf, &mut record, FieldRange::all(), settings)?;
    Ok(record)
}

/// Decode a complete record from a string into a new value.
pub fn from_str<R: Record>(s: &str) -> DResult<R> {
    from_bytes(s.as_bytes())
}

/// Decode every field of `target` from `buf`.
///
/// Fields not covered by `buf` keep their current values.
pub fn decode<R: Record>(buf: &[u8], target: &mut R) -> DResult<()> {
    decode_custom(buf, target, FieldRange::all(), &DecodeSettings::default())
}

/// Decode the fields of `target` selected by `range` from `buf`.
pub fn decode_range<R: Record>(buf: &[u8], target: &mut R, range: FieldRange) -> DResult<()> {
    decode_custom(buf, target, range, &DecodeSettings::default())
}

/// Decode the fields of `target` selected by `range` from `buf` with customized settings.
///
/// Returns an error as soon as a tag cannot be parsed or a value cannot be
/// converted; fields decoded before that point keep their new values.
pub fn decode_custom<R: Record>(buf: &[u8], target: &mut R, range: FieldRange, settings: &DecodeSettings) -> DResult<()> {
    let schema = R::schema();
    let entries = schema.entries();
    let end = range.end(entries.len());

    let mut baseline = 0;
    let mut seen_tagged = false;

    for entry in entries.iter().take(end).skip(range.start) {
        let Some(desc) = entry.descriptor()? else {
            continue;
        };

        if !seen_tagged {
            seen_tagged = true;
            if range.continuation && range.start > 0 {
                baseline = desc.column() - 1;
                debug!("continuing record at field '{}', column baseline {baseline}", entry.name());
            }
        }

        if let Some(cond) = desc.condition() {
            if !cond.matches(buf) {
                trace!("skipping field '{}': condition {cond} not met", entry.name());
                continue;
            }
        }

        if desc.column() <= baseline {
            trace!("skipping field '{}': column {} precedes the continuation baseline", entry.name(), desc.column());
            continue;
        }

        let lower = desc.column() - 1 - baseline;
        if lower >= buf.len() {
            trace!("skipping field '{}': starts at byte {lower} of a {} byte record", entry.name(), buf.len());
            continue;
        }
        let upper = lower.saturating_add(entry.width(&desc)).min(buf.len());

        entry.assign(target, &buf[lower..upper], &desc, settings)
            .map_err(|e| DecodeError::Field {
                field: entry.name(),
                tag: entry.tag().unwrap_or_default().to_string(),
                span: lower..upper,
                source: Box::new(e),
            })?;
    }

    Ok(())
}

/// Decode a nested record from its slice of the parent record.
///
/// Columns in the nested record's tags are relative to the start of `raw`.
/// This is what `#[derive(FlatRecord)]` calls to implement
/// [`FieldValue`](crate::value::FieldValue) for a record type.
pub fn decode_nested<R: Record>(raw: &[u8], target: &mut R, settings: &DecodeSettings) -> DResult<()> {
    decode_custom(raw, target, FieldRange::all(), settings)
}

/// The result of [`estimate_decodable_fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decodable<'a> {
    /// How many fields, starting from the offset, fit in the buffer.
    pub count: usize,
    /// The bytes belonging to the first field that did not fit, or empty.
    pub remainder: &'a [u8],
}

/// Estimate how many fields of `R`, starting at index `field_offset`, a
/// buffer holds in full.
///
/// Field widths are summed in declaration order (untagged fields count as
/// zero wide) until the total exceeds `buf.len()`. The bytes from the start of
/// the field that did not fit are returned as the remainder, to be prepended
/// to the next piece of the record.
///
/// The estimate assumes fields are contiguous and do not overlap. Layouts with
/// overlapping fields, including condition guarded alternatives at the same
/// columns, are undercounted: for fields at columns 1-10, 11-20 and 1-20 a
/// 20 byte buffer gives a count of 2, not 3.
///
/// ```
/// # use flatfile::{Record, Schema};
/// use flatfile::de::estimate_decodable_fields;
/// # #[derive(Default)]
/// # struct Profile { name: String, age: u8 }
/// # impl Record for Profile {
/// #     fn schema() -> Schema<Self> {
/// #         Schema::<Self>::builder().field("name", "1,9", |p| &mut p.name).field("age", "10,2", |p| &mut p.age).build()
/// #     }
/// # }
/// let est = estimate_decodable_fields::<Profile>(b"1234567891", 0).unwrap();
/// assert_eq!(est.count, 1);
/// assert_eq!(est.remainder, b"1");
/// ```
pub fn estimate_decodable_fields<R: Record>(buf: &[u8], field_offset: usize) -> DResult<Decodable<'_>> {
    let schema = R::schema();
    let mut total: usize = 0;
    let mut count = 0;
    let mut remainder: &[u8] = &[];

    for entry in schema.entries().iter().skip(field_offset) {
        let Some(desc) = entry.descriptor()? else {
            count += 1;
            continue;
        };

        let start = total;
        total = total.saturating_add(entry.width(&desc));
        if total <= buf.len() {
            count += 1;
        } else {
            remainder = &buf[start..];
            break;
        }
    }

    trace!("{count} fields from index {field_offset} fit in {} bytes, {} bytes left over", buf.len(), remainder.len());
    Ok(Decodable { count, remainder })
}
