//! YANG scalar value kinds and their canonical text encodings

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::error::{Result, YdkError};

/// Resolves an enumeration name to its numeric value.
///
/// Generated model classes supply one per enumeration type.
pub type EnumLookup<'a> = dyn Fn(&str) -> Option<i32> + 'a;

/// YANG built-in type of a leaf, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Empty,
    Identityref,
    Str,
    Boolean,
    Enumeration,
    Bits,
    Decimal64,
    Binary,
}

impl YType {
    /// Parse a YANG built-in type name
    pub fn from_yang_name(s: &str) -> Option<Self> {
        let ytype = match s {
            "uint8" => YType::Uint8,
            "uint16" => YType::Uint16,
            "uint32" => YType::Uint32,
            "uint64" => YType::Uint64,
            "int8" => YType::Int8,
            "int16" => YType::Int16,
            "int32" => YType::Int32,
            "int64" => YType::Int64,
            "empty" => YType::Empty,
            "identityref" => YType::Identityref,
            "string" => YType::Str,
            "boolean" => YType::Boolean,
            "enumeration" => YType::Enumeration,
            "bits" => YType::Bits,
            "decimal64" => YType::Decimal64,
            "binary" => YType::Binary,
            _ => return None,
        };
        Some(ytype)
    }

    /// YANG built-in type name
    pub fn yang_name(self) -> &'static str {
        match self {
            YType::Uint8 => "uint8",
            YType::Uint16 => "uint16",
            YType::Uint32 => "uint32",
            YType::Uint64 => "uint64",
            YType::Int8 => "int8",
            YType::Int16 => "int16",
            YType::Int32 => "int32",
            YType::Int64 => "int64",
            YType::Empty => "empty",
            YType::Identityref => "identityref",
            YType::Str => "string",
            YType::Boolean => "boolean",
            YType::Enumeration => "enumeration",
            YType::Bits => "bits",
            YType::Decimal64 => "decimal64",
            YType::Binary => "binary",
        }
    }
}

impl fmt::Display for YType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.yang_name())
    }
}

/// Marker value of the YANG `empty` type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Empty;

/// Identity reference, kept as an opaque tag such as `"ietf-interfaces:ethernetCsmacd"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    tag: String,
}

impl Identity {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

/// Decimal64 value stored as its exact input text.
///
/// No floating point conversion takes place, so the text read back is
/// byte-for-byte the text given to [`Decimal64::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal64 {
    value: String,
}

impl Decimal64 {
    /// Create from the decimal64 lexical form `[-+]?digits[.digits]`
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !is_decimal_lexical(&value) {
            return Err(YdkError::TypeConversion(format!(
                "'{}' is not a valid decimal64 value",
                value
            )));
        }
        Ok(Self { value })
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for Decimal64 {
    type Err = YdkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Decimal64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

fn is_decimal_lexical(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.is_none_or(all_digits)
}

/// Enumeration member: numeric value plus symbolic name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub value: i32,
    pub name: String,
}

impl EnumValue {
    pub fn new(value: i32, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Named bit set of the YANG `bits` type.
///
/// Reading an absent bit through `bits["name"]` yields `false` without
/// inserting it; writing through `bits["name"] = true` inserts on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bits {
    bitmap: BTreeMap<String, bool>,
}

impl Bits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> bool {
        self.bitmap.get(name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.bitmap.insert(name.into(), value);
    }

    /// Mutable access to one bit, inserting it as `false` if absent
    pub fn entry(&mut self, name: &str) -> &mut bool {
        self.bitmap.entry(name.to_string()).or_insert(false)
    }

    pub fn bitmap(&self) -> &BTreeMap<String, bool> {
        &self.bitmap
    }

    /// Merge another bit set into this one, the other side winning
    pub fn merge(&mut self, other: &Bits) {
        for (name, value) in &other.bitmap {
            self.bitmap.insert(name.clone(), *value);
        }
    }
}

impl Index<&str> for Bits {
    type Output = bool;

    fn index(&self, name: &str) -> &bool {
        self.bitmap.get(name).unwrap_or(&false)
    }
}

impl IndexMut<&str> for Bits {
    fn index_mut(&mut self, name: &str) -> &mut bool {
        self.entry(name)
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .bitmap
            .iter()
            .filter(|(_, set)| **set)
            .map(|(name, _)| name.as_str())
            .collect();
        f.write_str(&names.join(" "))
    }
}

impl<S: Into<String>> FromIterator<S> for Bits {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut bits = Bits::new();
        for name in iter {
            bits.set(name, true);
        }
        bits
    }
}

/// A typed scalar value; the variant is the value's [`YType`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Decimal64(Decimal64),
    Bits(Bits),
    Identityref(Identity),
    Str(String),
    Boolean(bool),
    Enumeration(EnumValue),
    Empty(Empty),
    Binary(Vec<u8>),
}

impl ScalarValue {
    /// The type tag of this value
    pub fn ytype(&self) -> YType {
        match self {
            ScalarValue::Uint8(_) => YType::Uint8,
            ScalarValue::Uint16(_) => YType::Uint16,
            ScalarValue::Uint32(_) => YType::Uint32,
            ScalarValue::Uint64(_) => YType::Uint64,
            ScalarValue::Int8(_) => YType::Int8,
            ScalarValue::Int16(_) => YType::Int16,
            ScalarValue::Int32(_) => YType::Int32,
            ScalarValue::Int64(_) => YType::Int64,
            ScalarValue::Decimal64(_) => YType::Decimal64,
            ScalarValue::Bits(_) => YType::Bits,
            ScalarValue::Identityref(_) => YType::Identityref,
            ScalarValue::Str(_) => YType::Str,
            ScalarValue::Boolean(_) => YType::Boolean,
            ScalarValue::Enumeration(_) => YType::Enumeration,
            ScalarValue::Empty(_) => YType::Empty,
            ScalarValue::Binary(_) => YType::Binary,
        }
    }

    /// Decode the canonical text encoding of a value of type `ytype`.
    ///
    /// Enumerations need `enum_lookup` to recover the numeric value.
    pub fn decode(ytype: YType, text: &str, enum_lookup: Option<&EnumLookup<'_>>) -> Result<Self> {
        let value = match ytype {
            YType::Uint8 => ScalarValue::Uint8(parse_number(text, ytype)?),
            YType::Uint16 => ScalarValue::Uint16(parse_number(text, ytype)?),
            YType::Uint32 => ScalarValue::Uint32(parse_number(text, ytype)?),
            YType::Uint64 => ScalarValue::Uint64(parse_number(text, ytype)?),
            YType::Int8 => ScalarValue::Int8(parse_number(text, ytype)?),
            YType::Int16 => ScalarValue::Int16(parse_number(text, ytype)?),
            YType::Int32 => ScalarValue::Int32(parse_number(text, ytype)?),
            YType::Int64 => ScalarValue::Int64(parse_number(text, ytype)?),
            YType::Decimal64 => ScalarValue::Decimal64(Decimal64::new(text.trim())?),
            YType::Bits => ScalarValue::Bits(text.split_whitespace().collect()),
            YType::Identityref => ScalarValue::Identityref(Identity::new(text.trim())),
            YType::Str => ScalarValue::Str(text.to_string()),
            YType::Boolean => match text.trim() {
                "true" => ScalarValue::Boolean(true),
                "false" => ScalarValue::Boolean(false),
                other => {
                    return Err(YdkError::TypeConversion(format!(
                        "cannot parse '{}' as boolean",
                        other
                    )));
                }
            },
            YType::Enumeration => {
                let name = text.trim();
                let value = enum_lookup.and_then(|lookup| lookup(name)).ok_or_else(|| {
                    YdkError::TypeConversion(format!("enumeration value not found: {}", name))
                })?;
                ScalarValue::Enumeration(EnumValue::new(value, name))
            }
            YType::Empty => {
                if !text.trim().is_empty() {
                    return Err(YdkError::TypeConversion(format!(
                        "empty leaf cannot carry text '{}'",
                        text
                    )));
                }
                ScalarValue::Empty(Empty)
            }
            YType::Binary => {
                let bytes = BASE64
                    .decode(text.trim())
                    .map_err(|e| YdkError::TypeConversion(format!("base64 decode: {}", e)))?;
                ScalarValue::Binary(bytes)
            }
        };
        Ok(value)
    }
}

fn parse_number<T: FromStr>(text: &str, ytype: YType) -> Result<T> {
    text.trim().parse().map_err(|_| {
        YdkError::TypeConversion(format!("cannot parse '{}' as {}", text, ytype))
    })
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Uint8(v) => write!(f, "{}", v),
            ScalarValue::Uint16(v) => write!(f, "{}", v),
            ScalarValue::Uint32(v) => write!(f, "{}", v),
            ScalarValue::Uint64(v) => write!(f, "{}", v),
            ScalarValue::Int8(v) => write!(f, "{}", v),
            ScalarValue::Int16(v) => write!(f, "{}", v),
            ScalarValue::Int32(v) => write!(f, "{}", v),
            ScalarValue::Int64(v) => write!(f, "{}", v),
            ScalarValue::Decimal64(v) => v.fmt(f),
            ScalarValue::Bits(v) => v.fmt(f),
            ScalarValue::Identityref(v) => v.fmt(f),
            ScalarValue::Str(v) => f.write_str(v),
            ScalarValue::Boolean(v) => write!(f, "{}", v),
            ScalarValue::Enumeration(v) => v.fmt(f),
            ScalarValue::Empty(_) => Ok(()),
            ScalarValue::Binary(v) => f.write_str(&BASE64.encode(v)),
        }
    }
}

macro_rules! scalar_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for ScalarValue {
                fn from(value: $source) -> Self {
                    ScalarValue::$variant(value)
                }
            }
        )*
    };
}

scalar_from! {
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    Decimal64 => Decimal64,
    Bits => Bits,
    Identity => Identityref,
    String => Str,
    bool => Boolean,
    EnumValue => Enumeration,
    Empty => Empty,
    Vec<u8> => Binary,
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Str(value.to_string())
    }
}
