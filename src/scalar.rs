//! Scalar leaf conversion.
//!
//! A [`ScalarConverterChain`] turns the text of a scalar node into a [`Value`] of the
//! requested leaf type. User converters are consulted first, in registration order. Then
//! null-like scalars yield the target's default, and finally the built-in converters run.
//! The first converter whose [`ScalarConverter::can_handle`] accepts the target wins; its
//! result is final even if it is an error.

use std::fmt::Debug;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use crate::descriptor::{ScalarKind, TypeDescriptor, TypeRegistry};
use crate::error::Error;
use crate::naming::NamingConvention;
use crate::node::{ScalarStyle, is_null_text};
use crate::options::Options;
use crate::tags;
use crate::value::Value;

/// The scalar being converted.
#[derive(Clone, Copy, Debug)]
pub struct ScalarInput<'a> {
    pub text: &'a str,
    pub style: ScalarStyle,
    pub tag: Option<&'a str>,
}

impl<'a> ScalarInput<'a> {
    /// Plain, untagged scalar.
    pub fn plain(text: &'a str) -> Self {
        Self {
            text,
            style: ScalarStyle::Plain,
            tag: None,
        }
    }

    pub fn is_null_like(&self) -> bool {
        tags::is_null_tag(self.tag)
            || (!self.style.is_quoted() && self.tag.is_none() && is_null_text(self.text))
    }
}

/// Settings of the running deserializer that conversions may depend on.
#[derive(Clone, Copy)]
pub struct ConvertContext<'a> {
    pub options: &'a Options,
    pub naming: &'a dyn NamingConvention,
    pub types: &'a TypeRegistry,
}

/// One link of the conversion chain.
pub trait ScalarConverter: Debug + Send + Sync {
    /// Whether this converter is responsible for `target`. Only scalar and enum
    /// descriptors are ever offered.
    fn can_handle(&self, target: &TypeDescriptor) -> bool;

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error>;
}

#[derive(Clone, Debug, Default)]
pub struct ScalarConverterChain {
    custom: Vec<Arc<dyn ScalarConverter>>,
}

static BUILT_IN: &[&dyn ScalarConverter] = &[
    &StringConverter,
    &BoolConverter,
    &IntConverter,
    &FloatConverter,
    &CharConverter,
    &EnumConverter,
    &BytesConverter,
    &TimestampConverter,
    &DateConverter,
];

impl ScalarConverterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user converter. User converters run in registration order, all of them
    /// before the built-ins.
    pub fn push(&mut self, converter: Arc<dyn ScalarConverter>) {
        self.custom.push(converter);
    }

    pub fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        if let Some(converter) = self.custom.iter().find(|c| c.can_handle(target)) {
            return converter.convert(scalar, target, ctx);
        }
        if scalar.is_null_like() {
            return Ok(target.default_value(ctx.types));
        }
        match BUILT_IN.iter().find(|c| c.can_handle(target)) {
            Some(converter) => converter.convert(scalar, target, ctx),
            None => Err(Error::scalar_conversion(scalar.text, target)),
        }
    }
}

fn kind_of(target: &TypeDescriptor) -> Option<&ScalarKind> {
    match target {
        TypeDescriptor::Scalar(kind) => Some(kind),
        _ => None,
    }
}

#[derive(Debug)]
struct StringConverter;

impl ScalarConverter for StringConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target) == Some(&ScalarKind::String)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        if tags::is_binary_tag(scalar.tag) {
            let bytes = decode_base64(scalar.text)
                .ok_or_else(|| Error::scalar_conversion(scalar.text, target))?;
            return String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|_| Error::scalar_conversion(scalar.text, target));
        }
        if !tags::can_parse_into_string(scalar.tag) {
            return Err(Error::scalar_conversion(scalar.text, target));
        }
        Ok(Value::String(scalar.text.to_owned()))
    }
}

#[derive(Debug)]
struct BoolConverter;

impl ScalarConverter for BoolConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target) == Some(&ScalarKind::Bool)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        if tags::is_str_tag(scalar.tag) {
            return Err(Error::scalar_conversion(scalar.text, target));
        }
        let parsed = if ctx.options.strict_booleans {
            parse_strict_bool(scalar.text)
        } else {
            parse_yaml11_bool(scalar.text)
        };
        parsed
            .map(Value::Bool)
            .ok_or_else(|| Error::scalar_conversion(scalar.text, target))
    }
}

#[derive(Debug)]
struct IntConverter;

impl ScalarConverter for IntConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target).is_some_and(ScalarKind::is_integer)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        let octal = ctx.options.legacy_octal_numbers;
        let text = scalar.text;
        let fail = || Error::scalar_conversion(text, target);
        if tags::is_str_tag(scalar.tag) {
            return Err(fail());
        }
        let int = |n: Option<i64>| n.map(Value::Int).ok_or_else(fail);
        let uint = |n: Option<u64>| n.map(Value::UInt).ok_or_else(fail);
        let value = match kind_of(target) {
            Some(ScalarKind::I8) => int(parse_int_signed::<i8>(text, octal).map(i64::from))?,
            Some(ScalarKind::I16) => int(parse_int_signed::<i16>(text, octal).map(i64::from))?,
            Some(ScalarKind::I32) => int(parse_int_signed::<i32>(text, octal).map(i64::from))?,
            Some(ScalarKind::I64) => int(parse_int_signed::<i64>(text, octal))?,
            Some(ScalarKind::U8) => uint(parse_int_unsigned::<u8>(text, octal).map(u64::from))?,
            Some(ScalarKind::U16) => uint(parse_int_unsigned::<u16>(text, octal).map(u64::from))?,
            Some(ScalarKind::U32) => uint(parse_int_unsigned::<u32>(text, octal).map(u64::from))?,
            Some(ScalarKind::U64) => uint(parse_int_unsigned::<u64>(text, octal))?,
            _ => return Err(fail()),
        };
        Ok(value)
    }
}

#[derive(Debug)]
struct FloatConverter;

impl ScalarConverter for FloatConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target).is_some_and(ScalarKind::is_float)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        if tags::is_str_tag(scalar.tag) {
            return Err(Error::scalar_conversion(scalar.text, target));
        }
        let value = parse_yaml12_f64(scalar.text)
            .ok_or_else(|| Error::scalar_conversion(scalar.text, target))?;
        if kind_of(target) == Some(&ScalarKind::F32) {
            let narrowed = value as f32;
            if narrowed.is_infinite() && value.is_finite() {
                return Err(Error::scalar_conversion(scalar.text, target));
            }
            return Ok(Value::Float(f64::from(narrowed)));
        }
        Ok(Value::Float(value))
    }
}

#[derive(Debug)]
struct CharConverter;

impl ScalarConverter for CharConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target) == Some(&ScalarKind::Char)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        let mut chars = scalar.text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::Char(c)),
            _ => Err(Error::scalar_conversion(scalar.text, target)),
        }
    }
}

/// Matches the scalar against the declared variants: first exactly against each
/// variant's name under the naming convention, then ignoring ASCII case.
#[derive(Debug)]
struct EnumConverter;

impl ScalarConverter for EnumConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        matches!(target, TypeDescriptor::Enum(_))
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        let TypeDescriptor::Enum(name) = target else {
            return Err(Error::scalar_conversion(scalar.text, target));
        };
        let descriptor = ctx
            .types
            .enumeration(name)
            .ok_or_else(|| Error::unknown_type(name))?;
        let text = scalar.text.trim();
        let converted: Vec<String> = descriptor
            .variants
            .iter()
            .map(|v| ctx.naming.apply(v))
            .collect();
        let index = converted
            .iter()
            .position(|c| c == text)
            .or_else(|| converted.iter().position(|c| c.eq_ignore_ascii_case(text)))
            .ok_or_else(|| Error::scalar_conversion(scalar.text, target))?;
        Ok(Value::Enum {
            type_name: name.to_string(),
            variant: descriptor.variants[index].to_string(),
        })
    }
}

#[derive(Debug)]
struct BytesConverter;

impl ScalarConverter for BytesConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target) == Some(&ScalarKind::Bytes)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        decode_base64(scalar.text)
            .map(Value::Bytes)
            .ok_or_else(|| Error::scalar_conversion(scalar.text, target))
    }
}

#[derive(Debug)]
struct TimestampConverter;

impl ScalarConverter for TimestampConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target) == Some(&ScalarKind::Timestamp)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        parse_timestamp(scalar.text)
            .map(Value::Timestamp)
            .ok_or_else(|| Error::scalar_conversion(scalar.text, target))
    }
}

#[derive(Debug)]
struct DateConverter;

impl ScalarConverter for DateConverter {
    fn can_handle(&self, target: &TypeDescriptor) -> bool {
        kind_of(target) == Some(&ScalarKind::Date)
    }

    fn convert(
        &self,
        scalar: &ScalarInput<'_>,
        target: &TypeDescriptor,
        _ctx: &ConvertContext<'_>,
    ) -> Result<Value, Error> {
        NaiveDate::parse_from_str(scalar.text.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| Error::scalar_conversion(scalar.text, target))
    }
}

/// Parse a YAML 1.1 boolean (handles the "Norway problem" by being explicit about it).
///
/// Accepted TRUE literals (case-insensitive): "y", "yes", "true", "on"
/// Accepted FALSE literals (case-insensitive): "n", "no", "false", "off"
pub(crate) fn parse_yaml11_bool(s: &str) -> Option<bool> {
    let t = s.trim();
    if ["true", "yes", "y", "on"].iter().any(|l| t.eq_ignore_ascii_case(l)) {
        Some(true)
    } else if ["false", "no", "n", "off"].iter().any(|l| t.eq_ignore_ascii_case(l)) {
        Some(false)
    } else {
        None
    }
}

fn parse_strict_bool(s: &str) -> Option<bool> {
    let t = s.trim();
    if t.eq_ignore_ascii_case("true") {
        Some(true)
    } else if t.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn digit_value(b: u8) -> Option<u32> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u32),
        b'a'..=b'f' => Some(10 + (b - b'a') as u32),
        b'A'..=b'F' => Some(10 + (b - b'A') as u32),
        _ => None,
    }
}

/// Magnitude of `digits` in `radix`, skipping `_` separators. At least one digit required.
fn parse_digits_u128(digits: &str, radix: u32) -> Option<u128> {
    let mut val: u128 = 0;
    let mut saw = false;
    for b in digits.as_bytes() {
        if *b == b'_' {
            continue;
        }
        let d = digit_value(*b).filter(|d| *d < radix)?;
        val = val.checked_mul(radix as u128)?.checked_add(d as u128)?;
        saw = true;
    }
    saw.then_some(val)
}

/// Split an optional sign and radix prefix (`0x`, `0o`, `0b`, and `00` when legacy octal is
/// enabled) off an integer literal.
fn split_int_literal(s: &str, legacy_octal: bool) -> (bool, u32, &str) {
    let t = s.trim();
    let (neg, rest) = match t.strip_prefix('+') {
        Some(r) => (false, r),
        None => match t.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, t),
        },
    };

    let hex = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"));
    let (radix, digits) = if let Some(r) = hex {
        (16u32, r)
    } else if let Some(r) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        (8u32, r)
    } else if let Some(r) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        (2u32, r)
    } else if legacy_octal && rest.starts_with("00") {
        (8u32, &rest[2..])
    } else {
        (10u32, rest)
    };
    (neg, radix, digits)
}

pub(crate) fn parse_int_signed<T>(s: &str, legacy_octal: bool) -> Option<T>
where
    T: TryFrom<i128>,
{
    let (neg, radix, digits) = split_int_literal(s, legacy_octal);
    let mag = parse_digits_u128(digits, radix)?;
    let val: i128 = if neg {
        // i128::MIN has no positive counterpart; go through the negated magnitude.
        if mag == i128::MIN.unsigned_abs() {
            i128::MIN
        } else {
            i128::try_from(mag).ok()?.checked_neg()?
        }
    } else {
        i128::try_from(mag).ok()?
    };
    T::try_from(val).ok()
}

pub(crate) fn parse_int_unsigned<T>(s: &str, legacy_octal: bool) -> Option<T>
where
    T: TryFrom<u128>,
{
    let (neg, radix, digits) = split_int_literal(s, legacy_octal);
    let mag = parse_digits_u128(digits, radix)?;
    if neg && mag != 0 {
        return None;
    }
    T::try_from(mag).ok()
}

pub(crate) fn parse_yaml12_f64(s: &str) -> Option<f64> {
    let t = s.trim();
    let lower = t.to_ascii_lowercase();
    match lower.as_str() {
        ".nan" | "+.nan" | "-.nan" => Some(f64::NAN),
        ".inf" | "+.inf" => Some(f64::INFINITY),
        "-.inf" => Some(f64::NEG_INFINITY),
        // Rust would accept these spellings, YAML does not.
        "nan" | "inf" | "+inf" | "-inf" | "infinity" | "+infinity" | "-infinity" => None,
        _ => {
            if t.contains('_') {
                t.replace('_', "").parse::<f64>().ok()
            } else {
                t.parse::<f64>().ok()
            }
        }
    }
}

/// Base64 payloads are often folded over several lines; whitespace is not significant.
fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD.decode(compact.as_bytes()).ok()
}

/// RFC 3339, the YAML space-separated form, a naive date-time (taken as UTC), or a bare
/// date (midnight UTC).
fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let t = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(t) {
        return Some(ts);
    }
    let normalized = t.replacen(' ', "T", 1);
    if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(ts);
    }
    let utc = FixedOffset::east_opt(0)?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f") {
        return utc.from_local_datetime(&naive).single();
    }
    let date = NaiveDate::parse_from_str(t, "%Y-%m-%d").ok()?;
    utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}
