//! Convert raw slices of a record into scalar values.
//!
//! [`convert`] is the single dispatch point: given the declared scalar kind of
//! a field and its override, it picks the literal syntax to read. Composite
//! kinds (records, arrays, `Vec`s, `Option`s) are handled in [`crate::value`]
//! and eventually come back here for each of their scalar elements.
use std::fmt::Display;
use std::num::{IntErrorKind, ParseFloatError, ParseIntError};
use std::str::FromStr;

use crate::de::DecodeSettings;
use crate::decode_error::{CResult, ConvertError};
use crate::field_tag::Override;

/// The declared type of a non-composite field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ScalarKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    Usize,
    I8,
    I16,
    I32,
    I64,
    Isize,
    F32,
    F64,
    Text,
    Char,
}

impl ScalarKind {
    /// The Rust type name for this kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::Usize => "usize",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::Isize => "isize",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Text => "String",
            ScalarKind::Char => "char",
        }
    }
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A converted scalar, one variant per [`ScalarKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    F32(f32),
    F64(f64),
    Text(String),
    Char(char),
}

/// Convert `raw` into a value of the given kind.
///
/// `Override::Byte` only applies to `u8` fields and `Override::Rune` to `i32`,
/// `u32` and `char` fields; any other combination is an error. `char` fields
/// always hold a code point, with or without the override.
pub fn convert(kind: ScalarKind, raw: &[u8], type_override: Override, settings: &DecodeSettings) -> CResult<ScalarValue> {
    let target = kind.type_name();
    match (kind, type_override) {
        (ScalarKind::U8, Override::Byte) => parse_byte(raw).map(ScalarValue::U8),
        (ScalarKind::I32, Override::Rune) => parse_rune(raw).map(|c| ScalarValue::I32(c as i32)),
        (ScalarKind::U32, Override::Rune) => parse_rune(raw).map(|c| ScalarValue::U32(c as u32)),
        (ScalarKind::Char, Override::Rune | Override::None) => parse_rune(raw).map(ScalarValue::Char),
        (_, Override::Byte | Override::Rune) => Err(ConvertError::UnsupportedOverride { type_override, target }),

        (ScalarKind::Text, Override::None) => Ok(ScalarValue::Text(parse_text(raw, settings.trim_text))),
        (ScalarKind::Bool, Override::None) => parse_logical(numeric_str(raw, target, settings)?).map(ScalarValue::Bool),
        (ScalarKind::U8, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::U8),
        (ScalarKind::U16, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::U16),
        (ScalarKind::U32, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::U32),
        (ScalarKind::U64, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::U64),
        (ScalarKind::Usize, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::Usize),
        (ScalarKind::I8, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::I8),
        (ScalarKind::I16, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::I16),
        (ScalarKind::I32, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::I32),
        (ScalarKind::I64, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::I64),
        (ScalarKind::Isize, Override::None) => parse_integer(numeric_str(raw, target, settings)?, target).map(ScalarValue::Isize),
        (ScalarKind::F32, Override::None) => parse_real(numeric_str(raw, target, settings)?, target).map(ScalarValue::F32),
        (ScalarKind::F64, Override::None) => parse_real(numeric_str(raw, target, settings)?, target).map(ScalarValue::F64),
    }
}

fn numeric_str<'a>(raw: &'a [u8], target: &'static str, settings: &DecodeSettings) -> CResult<&'a str> {
    let s = std::str::from_utf8(raw)
        .map_err(|_| ConvertError::Syntax { raw: String::from_utf8_lossy(raw).into_owned(), target })?;
    if settings.trim_numbers {
        Ok(s.trim())
    } else {
        Ok(s)
    }
}

pub(crate) fn parse_text(raw: &[u8], trim: bool) -> String {
    let s = String::from_utf8_lossy(raw);
    if trim {
        s.trim().to_string()
    } else {
        s.into_owned()
    }
}

/// Parse a boolean: `1`, `t` or `true` and `0`, `f` or `false`, ignoring case.
pub(crate) fn parse_logical(s: &str) -> CResult<bool> {
    let truthy = ["1", "t", "true"];
    let falsy = ["0", "f", "false"];

    if truthy.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        Ok(true)
    } else if falsy.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        Ok(false)
    } else {
        Err(ConvertError::Syntax { raw: s.to_string(), target: "bool" })
    }
}

/// Parse a base 10 integer, reporting overflow of `T` as a range error.
pub(crate) fn parse_integer<T>(s: &str, target: &'static str) -> CResult<T>
where T: FromStr<Err = ParseIntError>
{
    s.parse().map_err(|e: ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ConvertError::Range { raw: s.to_string(), target },
        _ => ConvertError::Syntax { raw: s.to_string(), target },
    })
}

/// Parse a decimal or scientific float.
///
/// Rust rounds an overflowing literal to infinity; that is reported as a range
/// error unless the literal itself spelled out an infinity.
pub(crate) fn parse_real<T>(s: &str, target: &'static str) -> CResult<T>
where T: FromStr<Err = ParseFloatError> + Into<f64> + Copy
{
    let v: T = s.parse()
        .map_err(|_| ConvertError::Syntax { raw: s.to_string(), target })?;

    if v.into().is_infinite() && !is_infinity_literal(s) {
        return Err(ConvertError::Range { raw: s.to_string(), target });
    }
    Ok(v)
}

fn is_infinity_literal(s: &str) -> bool {
    let unsigned = s.trim_start_matches(&['+', '-'][..]);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

pub(crate) fn parse_byte(raw: &[u8]) -> CResult<u8> {
    raw.first().copied().ok_or(ConvertError::Empty { target: "byte" })
}

/// Decode the leading UTF-8 character of `raw`; trailing bytes are ignored.
pub(crate) fn parse_rune(raw: &[u8]) -> CResult<char> {
    if raw.is_empty() {
        return Err(ConvertError::Empty { target: "rune" });
    }

    let valid = match std::str::from_utf8(raw) {
        Ok(s) => s,
        Err(e) => std::str::from_utf8(&raw[..e.valid_up_to()])
            .map_err(|_| ConvertError::InvalidRune { raw: raw.to_vec() })?,
    };

    valid.chars().next().ok_or_else(|| ConvertError::InvalidRune { raw: raw.to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(kind: ScalarKind, raw: &str) -> CResult<ScalarValue> {
        convert(kind, raw.as_bytes(), Override::None, &DecodeSettings::default())
    }

    fn is_range(res: CResult<ScalarValue>) -> bool {
        matches!(res, Err(ConvertError::Range { .. }))
    }

    #[test]
    fn test_logical() -> CResult<()> {
        for s in ["1", "t", "T", "true", "True", "TRUE"] {
            assert_eq!(parse_logical(s)?, true, "'{s}' should parse as true");
        }
        for s in ["0", "f", "F", "false", "False", "FALSE"] {
            assert_eq!(parse_logical(s)?, false, "'{s}' should parse as false");
        }
        for s in ["3", "a", "B", "err", "Errr", "yes", ""] {
            assert!(parse_logical(s).is_err(), "'{s}' should not parse as a bool");
        }
        Ok(())
    }

    #[test]
    fn test_unsigned_bounds() -> CResult<()> {
        assert_eq!(conv(ScalarKind::U8, "255")?, ScalarValue::U8(255));
        assert!(is_range(conv(ScalarKind::U8, "256")), "256 should overflow a u8");
        assert_eq!(conv(ScalarKind::U16, "65535")?, ScalarValue::U16(65535));
        assert!(is_range(conv(ScalarKind::U16, "65536")));
        assert_eq!(conv(ScalarKind::U32, "4294967295")?, ScalarValue::U32(u32::MAX));
        assert!(is_range(conv(ScalarKind::U32, "4294967296")));
        assert_eq!(conv(ScalarKind::U64, "18446744073709551615")?, ScalarValue::U64(u64::MAX));
        assert!(is_range(conv(ScalarKind::U64, "18446744073709551616")));
        Ok(())
    }

    #[test]
    fn test_signed_bounds() -> CResult<()> {
        assert_eq!(conv(ScalarKind::I8, "-128")?, ScalarValue::I8(i8::MIN));
        assert_eq!(conv(ScalarKind::I8, "127")?, ScalarValue::I8(i8::MAX));
        assert!(is_range(conv(ScalarKind::I8, "-129")));
        assert!(is_range(conv(ScalarKind::I8, "128")));
        assert_eq!(conv(ScalarKind::I16, "-32768")?, ScalarValue::I16(i16::MIN));
        assert!(is_range(conv(ScalarKind::I16, "32768")));
        assert_eq!(conv(ScalarKind::I32, "-2147483648")?, ScalarValue::I32(i32::MIN));
        assert!(is_range(conv(ScalarKind::I32, "2147483648")));
        assert_eq!(conv(ScalarKind::I64, "9223372036854775807")?, ScalarValue::I64(i64::MAX));
        assert!(is_range(conv(ScalarKind::I64, "-9223372036854775809")));
        Ok(())
    }

    #[test]
    fn test_platform_width() -> CResult<()> {
        let max = usize::MAX.to_string();
        assert_eq!(conv(ScalarKind::Usize, &max)?, ScalarValue::Usize(usize::MAX));
        let over = (usize::MAX as u128 + 1).to_string();
        assert!(is_range(conv(ScalarKind::Usize, &over)), "{over} should overflow a usize");

        let min = isize::MIN.to_string();
        assert_eq!(conv(ScalarKind::Isize, &min)?, ScalarValue::Isize(isize::MIN));
        let under = (isize::MIN as i128 - 1).to_string();
        assert!(is_range(conv(ScalarKind::Isize, &under)));
        Ok(())
    }

    #[test]
    fn test_integer_syntax() {
        for (kind, raw) in [(ScalarKind::U8, "$"), (ScalarKind::U16, "1a"), (ScalarKind::U32, "-1"), (ScalarKind::I32, " 12"), (ScalarKind::I64, "")] {
            assert!(matches!(conv(kind, raw), Err(ConvertError::Syntax { .. })), "'{raw}' as {kind} should be a syntax error");
        }
    }

    #[test]
    fn test_real() -> CResult<()> {
        assert_eq!(conv(ScalarKind::F32, "3.4028235e+38")?, ScalarValue::F32(f32::MAX));
        assert!(is_range(conv(ScalarKind::F32, "3.5e+38")), "3.5e38 should overflow an f32");
        assert_eq!(conv(ScalarKind::F64, "3.5e+38")?, ScalarValue::F64(3.5e38));
        assert_eq!(conv(ScalarKind::F64, "1.7976931348623157e+308")?, ScalarValue::F64(f64::MAX));
        assert!(is_range(conv(ScalarKind::F64, "2.7976931348623157e+308")));
        assert_eq!(conv(ScalarKind::F64, "-12.5")?, ScalarValue::F64(-12.5));
        assert_eq!(conv(ScalarKind::F64, "-inf")?, ScalarValue::F64(f64::NEG_INFINITY));
        assert!(matches!(conv(ScalarKind::F64, "1.2.3"), Err(ConvertError::Syntax { .. })));
        Ok(())
    }

    #[test]
    fn test_text_verbatim() -> CResult<()> {
        assert_eq!(conv(ScalarKind::Text, " AMY  ")?, ScalarValue::Text(" AMY  ".to_string()));
        let settings = DecodeSettings::default().do_trim_text(true);
        let v = convert(ScalarKind::Text, b" AMY  ", Override::None, &settings)?;
        assert_eq!(v, ScalarValue::Text("AMY".to_string()));
        Ok(())
    }

    #[test]
    fn test_trim_numbers() -> CResult<()> {
        assert!(conv(ScalarKind::U16, "  42").is_err());
        let settings = DecodeSettings::default().do_trim_numbers(true);
        let v = convert(ScalarKind::U16, b"  42", Override::None, &settings)?;
        assert_eq!(v, ScalarValue::U16(42));
        Ok(())
    }

    #[test]
    fn test_byte_override() -> CResult<()> {
        let settings = DecodeSettings::default();
        assert_eq!(convert(ScalarKind::U8, b"A", Override::Byte, &settings)?, ScalarValue::U8(65));
        assert_eq!(convert(ScalarKind::U8, b"7", Override::Byte, &settings)?, ScalarValue::U8(b'7'));
        // without the override the same byte is a decimal literal
        assert!(conv(ScalarKind::U8, "A").is_err());
        assert_eq!(conv(ScalarKind::U8, "7")?, ScalarValue::U8(7));
        assert_eq!(convert(ScalarKind::U8, b"", Override::Byte, &settings), Err(ConvertError::Empty { target: "byte" }));
        Ok(())
    }

    #[test]
    fn test_rune_override() -> CResult<()> {
        let settings = DecodeSettings::default();
        assert_eq!(convert(ScalarKind::I32, "é".as_bytes(), Override::Rune, &settings)?, ScalarValue::I32('é' as i32));
        assert_eq!(convert(ScalarKind::U32, "€x".as_bytes(), Override::Rune, &settings)?, ScalarValue::U32('€' as u32));
        assert_eq!(convert(ScalarKind::Char, b"a2", Override::Rune, &settings)?, ScalarValue::Char('a'));
        assert_eq!(conv(ScalarKind::Char, "?1")?, ScalarValue::Char('?'));

        // first byte of a two byte character only
        let truncated = &"é".as_bytes()[..1];
        assert!(matches!(convert(ScalarKind::I32, truncated, Override::Rune, &settings), Err(ConvertError::InvalidRune { .. })));
        assert!(matches!(convert(ScalarKind::I32, &[0xff, b'a'], Override::Rune, &settings), Err(ConvertError::InvalidRune { .. })));
        Ok(())
    }

    #[test]
    fn test_unsupported_override() {
        let settings = DecodeSettings::default();
        let e = convert(ScalarKind::Text, b"abc", Override::Byte, &settings).unwrap_err();
        assert_eq!(e, ConvertError::UnsupportedOverride { type_override: Override::Byte, target: "String" });

        let e = convert(ScalarKind::U8, b"a", Override::Rune, &settings).unwrap_err();
        assert_eq!(e, ConvertError::UnsupportedOverride { type_override: Override::Rune, target: "u8" });
    }
}
