//! Array element type descriptions (spec §3 "dtype").
//!
//! A dtype is either *simple* — a string naming a primitive type, byte order, and item
//! size, e.g. `"<f8"` (little-endian 8-byte float) or `"|S10"` (10-byte fixed string) — or
//! *structured* — an ordered sequence of named fields, each itself a dtype.

use serde::{Deserialize, Serialize};

use super::MetadataError;

/// The byte order of a multi-byte simple dtype.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ByteOrder {
    /// Little-endian (`<`).
    Little,
    /// Big-endian (`>`).
    Big,
    /// Not applicable to single-byte kinds (`|`).
    NotApplicable,
}

impl ByteOrder {
    fn as_char(self) -> char {
        match self {
            Self::Little => '<',
            Self::Big => '>',
            Self::NotApplicable => '|',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Little),
            '>' => Some(Self::Big),
            '|' | '=' => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// The primitive kind of a simple dtype.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum DTypeKind {
    /// A boolean, always 1 byte.
    Bool,
    /// A signed integer.
    Int,
    /// An unsigned integer.
    UInt,
    /// An IEEE-754 float (2, 4, or 8 bytes).
    Float,
    /// A fixed-length byte string.
    FixedString,
    /// Fixed-length raw (opaque) bytes.
    RawBytes,
}

impl DTypeKind {
    fn as_char(self) -> char {
        match self {
            Self::Bool => 'b',
            Self::Int => 'i',
            Self::UInt => 'u',
            Self::Float => 'f',
            Self::FixedString => 'S',
            Self::RawBytes => 'V',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'b' => Some(Self::Bool),
            'i' => Some(Self::Int),
            'u' => Some(Self::UInt),
            'f' => Some(Self::Float),
            'S' => Some(Self::FixedString),
            'V' => Some(Self::RawBytes),
            _ => None,
        }
    }
}

/// A primitive dtype: byte order, kind, and item size in bytes.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct SimpleDType {
    /// The byte order of multi-byte elements.
    pub byte_order: ByteOrder,
    /// The primitive kind.
    pub kind: DTypeKind,
    /// The size in bytes of one element.
    pub itemsize: usize,
}

impl SimpleDType {
    /// Render to the compact numpy-style string used in array descriptors, e.g. `"<f8"`.
    #[must_use]
    pub fn to_dtype_string(self) -> String {
        format!("{}{}{}", self.byte_order.as_char(), self.kind.as_char(), self.itemsize)
    }

    /// Parse a compact numpy-style dtype string such as `"<f8"` or `"|S10"`.
    ///
    /// # Errors
    /// Returns [`MetadataError::InvalidDType`] if the string is malformed.
    pub fn from_dtype_string(s: &str) -> Result<Self, MetadataError> {
        let mut chars = s.chars();
        let first = chars.next().ok_or_else(|| MetadataError::InvalidDType(s.to_string()))?;
        let (byte_order, kind_char, rest) = if let Some(byte_order) = ByteOrder::from_char(first) {
            let kind_char = chars.next().ok_or_else(|| MetadataError::InvalidDType(s.to_string()))?;
            (byte_order, kind_char, chars.as_str())
        } else {
            (ByteOrder::NotApplicable, first, chars.as_str())
        };
        let kind = DTypeKind::from_char(kind_char).ok_or_else(|| MetadataError::InvalidDType(s.to_string()))?;
        let itemsize: usize = rest.parse().map_err(|_| MetadataError::InvalidDType(s.to_string()))?;
        Ok(Self {
            byte_order,
            kind,
            itemsize,
        })
    }
}

/// A named field of a structured dtype.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StructuredField {
    /// The field name.
    pub name: String,
    /// The field's dtype.
    pub dtype: DataType,
}

/// An array element type: simple or structured (spec §3 "dtype").
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DataType {
    /// A primitive scalar type.
    Simple(SimpleDType),
    /// An ordered sequence of named, possibly nested, fields.
    Structured(Vec<StructuredField>),
}

impl DataType {
    /// The size in bytes of one element: the primitive's item size, or the sum of a
    /// structured dtype's fields (recursively).
    #[must_use]
    pub fn itemsize(&self) -> usize {
        match self {
            Self::Simple(simple) => simple.itemsize,
            Self::Structured(fields) => fields.iter().map(|f| f.dtype.itemsize()).sum(),
        }
    }

    /// Returns true if this is `DataType::Simple(..)` with `kind == Float`.
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Self::Simple(SimpleDType {
                kind: DTypeKind::Float,
                ..
            })
        )
    }

    /// Returns true if a value of this dtype can be widened to `other` without loss of
    /// representable range: the dtypes are equal, or both are numeric (`Int`/`UInt`/`Float`)
    /// simple dtypes with `self`'s item size no larger than `other`'s, and `self` is not a
    /// float being narrowed to a non-float.
    #[must_use]
    pub fn is_castable_to(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Simple(a), Self::Simple(b)) => {
                if a == b {
                    return true;
                }
                let numeric = matches!(a.kind, DTypeKind::Int | DTypeKind::UInt | DTypeKind::Float)
                    && matches!(b.kind, DTypeKind::Int | DTypeKind::UInt | DTypeKind::Float);
                numeric && a.itemsize <= b.itemsize && (a.kind != DTypeKind::Float || b.kind == DTypeKind::Float)
            }
            (Self::Structured(_), Self::Structured(_)) => self == other,
            _ => false,
        }
    }
}

impl std::fmt::Display for SimpleDType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_dtype_string())
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple(simple) => write!(f, "{simple}"),
            Self::Structured(fields) => {
                write!(f, "[")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:{}", field.name, field.dtype)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// The `[name, subdtype]` pair JSON encoding of one structured field, as in spec §4.3.
#[derive(Serialize, Deserialize)]
struct StructuredFieldTuple(String, DataType);

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Simple(simple) => serializer.serialize_str(&simple.to_dtype_string()),
            Self::Structured(fields) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(fields.len()))?;
                for field in fields {
                    seq.serialize_element(&StructuredFieldTuple(field.name.clone(), field.dtype.clone()))?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => {
                SimpleDType::from_dtype_string(&s).map(Self::Simple).map_err(serde::de::Error::custom)
            }
            serde_json::Value::Array(items) => {
                let mut fields = Vec::with_capacity(items.len());
                for item in items {
                    let StructuredFieldTuple(name, dtype) =
                        serde_json::from_value(item).map_err(serde::de::Error::custom)?;
                    fields.push(StructuredField { name, dtype });
                }
                Ok(Self::Structured(fields))
            }
            other => Err(serde::de::Error::custom(format!("invalid dtype: {other}"))),
        }
    }
}
