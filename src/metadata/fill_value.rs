//! Fill-value metadata: the scalar JSON encoding in spec §4.3 and its materialisation into
//! the opaque, `itemsize`-length byte pattern used to fill uninitialised chunk regions
//! (spec §9 "Fill-value polymorphism over dtype").

use base64::Engine;
use half::f16;
use serde::{Deserialize, Serialize};

use super::data_type::{DTypeKind, DataType};
use super::MetadataError;

/// The three special JSON string encodings for non-finite floats (spec §4.3).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NonFinite {
    /// `"NaN"`.
    NaN,
    /// `"Infinity"`.
    PosInfinity,
    /// `"-Infinity"`.
    NegInfinity,
}

impl NonFinite {
    fn as_str(self) -> &'static str {
        match self {
            Self::NaN => "NaN",
            Self::PosInfinity => "Infinity",
            Self::NegInfinity => "-Infinity",
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Self::NaN => f64::NAN,
            Self::PosInfinity => f64::INFINITY,
            Self::NegInfinity => f64::NEG_INFINITY,
        }
    }
}

/// A fill-value scalar as it appears in JSON metadata (spec §3/§4.3).
///
/// `fill_value: null` ("no fill value") is represented by the *absence* of this type
/// (`Option<FillValueMetadata>` at the call site), not by a variant here.
#[derive(Clone, PartialEq, Debug)]
pub enum FillValueMetadata {
    /// A boolean scalar.
    Bool(bool),
    /// A signed integer scalar.
    Int(i64),
    /// An unsigned integer scalar.
    UInt(u64),
    /// A finite float scalar.
    Float(f64),
    /// A non-finite float, using one of the three special string encodings.
    NonFinite(NonFinite),
    /// Raw bytes, base64-encoded in JSON; used for fixed-string/raw-bytes dtypes.
    Bytes(Vec<u8>),
    /// A structured fill value: one entry per field, in field order.
    Structured(Vec<FillValueMetadata>),
}

impl Serialize for FillValueMetadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::NonFinite(nf) => serializer.serialize_str(nf.as_str()),
            Self::Bytes(bytes) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Self::Structured(fields) => fields.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FillValueMetadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json_value(&value).map_err(serde::de::Error::custom)
    }
}

impl FillValueMetadata {
    /// Parse from a generic JSON value (used both by serde and by the metadata decoder).
    ///
    /// # Errors
    /// Returns [`MetadataError::InvalidFillValue`] if `value` is not one of the documented
    /// fill-value encodings.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, MetadataError> {
        match value {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Self::UInt(u))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(MetadataError::InvalidFillValue(value.to_string()))
                }
            }
            serde_json::Value::String(s) => match s.as_str() {
                "NaN" => Ok(Self::NonFinite(NonFinite::NaN)),
                "Infinity" => Ok(Self::NonFinite(NonFinite::PosInfinity)),
                "-Infinity" => Ok(Self::NonFinite(NonFinite::NegInfinity)),
                _ => base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map(Self::Bytes)
                    .map_err(|_| MetadataError::InvalidFillValue(value.to_string())),
            },
            serde_json::Value::Array(items) => items
                .iter()
                .map(Self::from_json_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Structured),
            _ => Err(MetadataError::InvalidFillValue(value.to_string())),
        }
    }

    /// Materialise this fill value into an opaque byte pattern of `dtype.itemsize()` bytes,
    /// the representation the array engine actually fills uninitialised regions with.
    ///
    /// # Errors
    /// Returns [`MetadataError::FillValueDTypeMismatch`] if the fill value's shape (scalar
    /// vs. structured) does not match `dtype`, or if a numeric value cannot be represented
    /// at `dtype`'s item size.
    pub fn materialize(&self, dtype: &DataType) -> Result<Vec<u8>, MetadataError> {
        match dtype {
            DataType::Structured(fields) => {
                let Self::Structured(values) = self else {
                    return Err(MetadataError::FillValueDTypeMismatch);
                };
                if values.len() != fields.len() {
                    return Err(MetadataError::FillValueDTypeMismatch);
                }
                let mut bytes = Vec::with_capacity(dtype.itemsize());
                for (field, value) in fields.iter().zip(values.iter()) {
                    bytes.extend(value.materialize(&field.dtype)?);
                }
                Ok(bytes)
            }
            DataType::Simple(simple) => {
                use super::data_type::ByteOrder;
                let big_endian = matches!(simple.byte_order, ByteOrder::Big);
                match simple.kind {
                    DTypeKind::Bool => {
                        let Self::Bool(b) = self else {
                            return Err(MetadataError::FillValueDTypeMismatch);
                        };
                        Ok(vec![u8::from(*b)])
                    }
                    DTypeKind::Int => {
                        let v = match self {
                            Self::Int(i) => *i,
                            Self::UInt(u) => i64::try_from(*u).map_err(|_| MetadataError::FillValueDTypeMismatch)?,
                            _ => return Err(MetadataError::FillValueDTypeMismatch),
                        };
                        int_bytes(v, simple.itemsize, big_endian)
                    }
                    DTypeKind::UInt => {
                        let v = match self {
                            Self::UInt(u) => *u,
                            Self::Int(i) if *i >= 0 => *i as u64,
                            _ => return Err(MetadataError::FillValueDTypeMismatch),
                        };
                        uint_bytes(v, simple.itemsize, big_endian)
                    }
                    DTypeKind::Float => {
                        let v = match self {
                            Self::Float(f) => *f,
                            Self::Int(i) => *i as f64,
                            Self::UInt(u) => *u as f64,
                            Self::NonFinite(nf) => nf.to_f64(),
                            _ => return Err(MetadataError::FillValueDTypeMismatch),
                        };
                        float_bytes(v, simple.itemsize, big_endian)
                    }
                    DTypeKind::FixedString | DTypeKind::RawBytes => {
                        let Self::Bytes(bytes) = self else {
                            return Err(MetadataError::FillValueDTypeMismatch);
                        };
                        let mut out = bytes.clone();
                        out.resize(simple.itemsize, 0);
                        Ok(out)
                    }
                }
            }
        }
    }
}

fn int_bytes(v: i64, itemsize: usize, big_endian: bool) -> Result<Vec<u8>, MetadataError> {
    let full = v.to_be_bytes();
    let truncated = &full[full.len() - itemsize.min(full.len())..];
    if itemsize > full.len() {
        return Err(MetadataError::FillValueDTypeMismatch);
    }
    let mut bytes = truncated.to_vec();
    if !big_endian {
        bytes.reverse();
    }
    Ok(bytes)
}

fn uint_bytes(v: u64, itemsize: usize, big_endian: bool) -> Result<Vec<u8>, MetadataError> {
    let full = v.to_be_bytes();
    if itemsize > full.len() {
        return Err(MetadataError::FillValueDTypeMismatch);
    }
    let truncated = &full[full.len() - itemsize..];
    let mut bytes = truncated.to_vec();
    if !big_endian {
        bytes.reverse();
    }
    Ok(bytes)
}

fn float_bytes(v: f64, itemsize: usize, big_endian: bool) -> Result<Vec<u8>, MetadataError> {
    let mut bytes = match itemsize {
        2 => f16::from_f64(v).to_be_bytes().to_vec(),
        4 => (v as f32).to_be_bytes().to_vec(),
        8 => v.to_be_bytes().to_vec(),
        _ => return Err(MetadataError::FillValueDTypeMismatch),
    };
    if !big_endian {
        bytes.reverse();
    }
    Ok(bytes)
}
