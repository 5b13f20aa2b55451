//! Describe the fields of a record type.
//!
//! A [`Schema`] is the ordered list of a record's fields: each one has a
//! name, an optional tag and a way to write a decoded value into the record.
//! Usually the schema is generated by `#[derive(FlatRecord)]`, but it can be
//! written by hand just as easily:
//!
//! ```
//! use flatfile::{Record, Schema};
//!
//! #[derive(Debug, Default)]
//! struct Customer {
//!     name: String,
//!     age: u8,
//!     cache_key: u64,
//! }
//!
//! impl Record for Customer {
//!     fn schema() -> Schema<Self> {
//!         Schema::<Self>::builder()
//!             .field("name", "1,9", |c| &mut c.name)
//!             .field("age", "col=10,len=2", |c| &mut c.age)
//!             .untagged("cache_key")
//!             .build()
//!     }
//! }
//!
//! let mut c = Customer::default();
//! flatfile::de::decode(b"Amy      42", &mut c).unwrap();
//! assert_eq!(c.name, "Amy      ");
//! assert_eq!(c.age, 42);
//! ```
//!
//! Untagged fields are never decoded, but they keep their place in the field
//! order so that the indices used by [`FieldRange`](crate::de::FieldRange)
//! match the order fields are declared in.
use std::fmt::Write;
use std::marker::PhantomData;

use crate::de::DecodeSettings;
use crate::decode_error::{DResult, DecodeError};
use crate::field_tag::FieldDescriptor;
use crate::value::{FieldValue, Kind};

/// A type whose fields can be decoded from a flat file record.
pub trait Record: Default + 'static {
    /// The record's fields, in declaration order.
    fn schema() -> Schema<Self>;
}

/// Type-erased write access to one field of a record.
pub(crate) trait Slot<R> {
    fn kind(&self) -> Kind;
    fn assign(&self, record: &mut R, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()>;
}

struct TypedSlot<F, T> {
    accessor: F,
    marker: PhantomData<fn() -> T>,
}

impl<R, T, F> Slot<R> for TypedSlot<F, T>
where T: FieldValue,
      F: Fn(&mut R) -> &mut T
{
    fn kind(&self) -> Kind {
        T::kind()
    }

    fn assign(&self, record: &mut R, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
        (self.accessor)(record).assign(raw, desc, settings)
    }
}

/// One field of a [`Schema`].
pub struct FieldEntry<R> {
    name: &'static str,
    tagged: Option<(String, Box<dyn Slot<R>>)>,
}

impl<R> FieldEntry<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The raw tag string, `None` for untagged fields.
    pub fn tag(&self) -> Option<&str> {
        self.tagged.as_ref().map(|(tag, _)| tag.as_str())
    }

    /// The declared kind of the field, `None` for untagged fields.
    pub fn kind(&self) -> Option<Kind> {
        self.tagged.as_ref().map(|(_, slot)| slot.kind())
    }

    /// Parse this field's tag, `Ok(None)` for untagged fields.
    pub fn descriptor(&self) -> DResult<Option<FieldDescriptor>> {
        let Some((tag, _)) = &self.tagged else {
            return Ok(None);
        };

        FieldDescriptor::parse(tag)
            .map(Some)
            .map_err(|source| DecodeError::Tag { field: self.name, tag: tag.clone(), source })
    }

    /// The number of bytes the field spans in a record, saturating at `usize::MAX`.
    pub fn width(&self, desc: &FieldDescriptor) -> usize {
        let multiplicity = self.kind().map_or(1, |k| k.multiplicity(desc));
        desc.length().saturating_mul(multiplicity)
    }

    pub(crate) fn assign(&self, record: &mut R, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
        match &self.tagged {
            Some((_, slot)) => slot.assign(record, raw, desc, settings),
            None => Ok(()),
        }
    }
}

/// The ordered fields of a record type `R`.
pub struct Schema<R> {
    entries: Vec<FieldEntry<R>>,
}

impl<R: 'static> Schema<R> {
    pub fn builder() -> SchemaBuilder<R> {
        SchemaBuilder { entries: vec![] }
    }

    /// Number of fields, tagged or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FieldEntry<R>] {
        &self.entries
    }

    /// Describe where every field lives in a record.
    ///
    /// Returns an error if any tag cannot be parsed.
    pub fn layout(&self) -> DResult<Vec<FieldLayout>> {
        self.entries.iter()
            .enumerate()
            .map(|(index, entry)| {
                let descriptor = entry.descriptor()?;
                let span = descriptor.as_ref().map(|d| {
                    let start = d.column() - 1;
                    (start, start.saturating_add(entry.width(d)))
                });

                Ok(FieldLayout {
                    index,
                    name: entry.name(),
                    kind: entry.kind(),
                    descriptor,
                    span,
                })
            }).collect()
    }
}

/// Builds a [`Schema`] one field at a time, in declaration order.
pub struct SchemaBuilder<R> {
    entries: Vec<FieldEntry<R>>,
}

impl<R: 'static> SchemaBuilder<R> {
    /// Add a tagged field. `accessor` must return the field in the record
    /// it is given.
    pub fn field<T, F>(mut self, name: &'static str, tag: impl Into<String>, accessor: F) -> Self
    where T: FieldValue + 'static,
          F: Fn(&mut R) -> &mut T + 'static
    {
        let slot: Box<dyn Slot<R>> = Box::new(TypedSlot { accessor, marker: PhantomData });
        self.entries.push(FieldEntry { name, tagged: Some((tag.into(), slot)) });
        self
    }

    /// Add a field that is not decoded but still occupies an index.
    pub fn untagged(mut self, name: &'static str) -> Self {
        self.entries.push(FieldEntry { name, tagged: None });
        self
    }

    pub fn build(self) -> Schema<R> {
        Schema { entries: self.entries }
    }
}

/// Where one field lives in a record, as reported by [`Schema::layout`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldLayout {
    pub index: usize,
    pub name: &'static str,
    pub kind: Option<Kind>,
    pub descriptor: Option<FieldDescriptor>,
    /// 0-indexed, end exclusive byte range of the whole field.
    pub span: Option<(usize, usize)>,
}

/// Render a human readable description of a record type's fields.
///
/// ```
/// # use flatfile::{Record, Schema};
/// # #[derive(Default)]
/// # struct Pair { a: u8, b: [u8; 2] }
/// # impl Record for Pair {
/// #     fn schema() -> Schema<Self> {
/// #         Schema::<Self>::builder().field("a", "1,1", |p| &mut p.a).field("b", "2,1", |p| &mut p.b).build()
/// #     }
/// # }
/// let text = flatfile::schema::examine::<Pair>().unwrap();
/// assert!(text.contains("b: [u8; 2] at col=2,len=1 (bytes 1..3)"));
/// ```
pub fn examine<R: Record>() -> DResult<String> {
    let layout = R::schema().layout()?;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "{} ({} fields)", std::any::type_name::<R>(), layout.len());
    for field in layout {
        match (&field.kind, &field.descriptor, field.span) {
            (Some(kind), Some(desc), Some((start, end))) => {
                let _ = writeln!(out, "\t{}. {}: {} at {} (bytes {}..{})", field.index, field.name, kind, desc, start, end);
            },
            _ => {
                let _ = writeln!(out, "\t{}. {}: untagged", field.index, field.name);
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ScalarKind;

    #[derive(Debug, Default)]
    struct Sample {
        code: String,
        counts: [u16; 3],
        scratch: i32,
        tail: Vec<char>,
    }

    impl Record for Sample {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .field("code", "1,4", |s| &mut s.code)
                .field("counts", "col=5,len=2", |s| &mut s.counts)
                .untagged("scratch")
                .field("tail", "11,1,4", |s| &mut s.tail)
                .build()
        }
    }

    #[test]
    fn test_entries_keep_order() {
        let schema = Sample::schema();
        let names: Vec<_> = schema.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["code", "counts", "scratch", "tail"]);
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.entries()[2].tag(), None);
        assert_eq!(schema.entries()[0].kind(), Some(Kind::Scalar(ScalarKind::Text)));
    }

    #[test]
    fn test_layout() -> DResult<()> {
        let layout = Sample::schema().layout()?;
        let spans: Vec<_> = layout.iter().map(|f| f.span).collect();
        assert_eq!(spans, [Some((0, 4)), Some((4, 10)), None, Some((10, 14))]);
        assert!(layout[2].descriptor.is_none());
        Ok(())
    }

    #[test]
    fn test_layout_bad_tag() {
        #[derive(Default)]
        struct Broken {
            x: u8,
        }

        impl Record for Broken {
            fn schema() -> Schema<Self> {
                Schema::<Self>::builder().field("x", "col=1", |b| &mut b.x).build()
            }
        }

        let e = Broken::schema().layout().unwrap_err();
        assert!(matches!(e, DecodeError::Tag { field: "x", .. }), "Got {e:?}");
        assert!(examine::<Broken>().is_err());
    }

    #[test]
    fn test_record_bound_is_enough() -> DResult<()> {
        fn spans<R: Record>() -> DResult<Vec<Option<(usize, usize)>>> {
            Ok(R::schema().layout()?.into_iter().map(|f| f.span).collect())
        }

        assert_eq!(spans::<Sample>()?.len(), examine::<Sample>()?.lines().count() - 1);
        Ok(())
    }

    #[test]
    fn test_examine() -> DResult<()> {
        let text = examine::<Sample>()?;
        assert!(text.contains("(4 fields)"), "{text}");
        assert!(text.contains("0. code: String at col=1,len=4 (bytes 0..4)"), "{text}");
        assert!(text.contains("1. counts: [u16; 3] at col=5,len=2 (bytes 4..10)"), "{text}");
        assert!(text.contains("2. scratch: untagged"), "{text}");
        assert!(text.contains("3. tail: Vec<char> at col=11,len=1,occ=4 (bytes 10..14)"), "{text}");
        Ok(())
    }
}
