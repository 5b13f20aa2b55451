//! Types that can be the target of a tagged field.
//!
//! Every field in a [`Record`](crate::schema::Record) must implement
//! [`FieldValue`]. Implementations are provided for the scalar types that
//! [`convert`] understands, for fixed size arrays, `Vec`s, `Option`s and
//! `Box`es of other field values, and (through `#[derive(FlatRecord)]`) for
//! nested records.
use std::fmt::Display;

use crate::de::DecodeSettings;
use crate::decode_error::{ConvertError, DResult, DecodeError};
use crate::field_tag::FieldDescriptor;
use crate::parsing::{convert, ScalarKind, ScalarValue};

/// The declared shape of a field's type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Kind {
    Scalar(ScalarKind),
    /// A nested record, by type name.
    Record(&'static str),
    Array(Box<Kind>, usize),
    Slice(Box<Kind>),
    /// `Option<T>`, decoded as its inner value.
    Optional(Box<Kind>),
    /// `Box<T>`, decoded as its inner value.
    Boxed(Box<Kind>),
}

impl Kind {
    /// The length of a fixed size array, looking through any `Option`/`Box` layers.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Kind::Array(_, n) => Some(*n),
            Kind::Optional(inner) | Kind::Boxed(inner) => inner.array_len(),
            _ => None,
        }
    }

    /// How many elements a field of this kind occupies in the record.
    ///
    /// This is the tag's `occurs` when present, otherwise the array length,
    /// otherwise 1.
    pub fn multiplicity(&self, desc: &FieldDescriptor) -> usize {
        if desc.occurs() > 0 {
            desc.occurs()
        } else {
            self.array_len().unwrap_or(1)
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Scalar(s) => write!(f, "{s}"),
            Kind::Record(name) => write!(f, "{name}"),
            Kind::Array(elem, n) => write!(f, "[{elem}; {n}]"),
            Kind::Slice(elem) => write!(f, "Vec<{elem}>"),
            Kind::Optional(inner) => write!(f, "Option<{inner}>"),
            Kind::Boxed(inner) => write!(f, "Box<{inner}>"),
        }
    }
}

/// A value that can be filled in from a slice of a record.
pub trait FieldValue {
    /// The shape of this type, used for layout and width calculations.
    fn kind() -> Kind where Self: Sized;

    /// Overwrite `self` with the value held in `raw`.
    ///
    /// `raw` is already the field's slice of the record (clamped to the
    /// available bytes), and `desc` is the field's parsed tag.
    fn assign(&mut self, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()>;
}

macro_rules! scalar_field {
    ($t:ty, $kind:ident) => {
        impl FieldValue for $t {
            fn kind() -> Kind {
                Kind::Scalar(ScalarKind::$kind)
            }

            fn assign(&mut self, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
                match convert(ScalarKind::$kind, raw, desc.type_override(), settings)? {
                    ScalarValue::$kind(v) => {
                        *self = v;
                        Ok(())
                    },
                    _ => Err(ConvertError::Syntax {
                        raw: String::from_utf8_lossy(raw).into_owned(),
                        target: ScalarKind::$kind.type_name(),
                    }.into()),
                }
            }
        }
    };
}

scalar_field!(bool, Bool);
scalar_field!(u8, U8);
scalar_field!(u16, U16);
scalar_field!(u32, U32);
scalar_field!(u64, U64);
scalar_field!(usize, Usize);
scalar_field!(i8, I8);
scalar_field!(i16, I16);
scalar_field!(i32, I32);
scalar_field!(i64, I64);
scalar_field!(isize, Isize);
scalar_field!(f32, F32);
scalar_field!(f64, F64);
scalar_field!(String, Text);
scalar_field!(char, Char);

/// Fill `elems` from consecutive `length` wide chunks of `raw`.
///
/// Elements whose chunk would start past the end of `raw` keep their current
/// value; a chunk that runs past the end is truncated.
fn assign_elements<T: FieldValue>(elems: &mut [T], raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
    let width = desc.length();
    for (i, elem) in elems.iter_mut().enumerate() {
        let lower = i.saturating_mul(width);
        if lower >= raw.len() {
            break;
        }
        let upper = lower.saturating_add(width).min(raw.len());
        elem.assign(&raw[lower..upper], desc, settings)?;
    }
    Ok(())
}

impl<T: FieldValue, const N: usize> FieldValue for [T; N] {
    fn kind() -> Kind {
        Kind::Array(Box::new(T::kind()), N)
    }

    fn assign(&mut self, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
        assign_elements(self.as_mut_slice(), raw, desc, settings)
    }
}

impl<T: FieldValue + Default> FieldValue for Vec<T> {
    fn kind() -> Kind {
        Kind::Slice(Box::new(T::kind()))
    }

    fn assign(&mut self, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
        if desc.occurs() < 2 {
            return Err(DecodeError::MissingOccurs);
        }

        let mut elems = Vec::new();
        elems.try_reserve_exact(desc.occurs())
            .map_err(|_| DecodeError::TooManyElements(desc.occurs()))?;
        elems.extend(std::iter::repeat_with(T::default).take(desc.occurs()));

        *self = elems;
        assign_elements(self.as_mut_slice(), raw, desc, settings)
    }
}

impl<T: FieldValue + Default> FieldValue for Option<T> {
    fn kind() -> Kind {
        Kind::Optional(Box::new(T::kind()))
    }

    fn assign(&mut self, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
        self.get_or_insert_with(T::default).assign(raw, desc, settings)
    }
}

impl<T: FieldValue> FieldValue for Box<T> {
    fn kind() -> Kind {
        Kind::Boxed(Box::new(T::kind()))
    }

    fn assign(&mut self, raw: &[u8], desc: &FieldDescriptor, settings: &DecodeSettings) -> DResult<()> {
        self.as_mut().assign(raw, desc, settings)
    }
}
