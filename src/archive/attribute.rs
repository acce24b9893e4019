//! Typed attribute values and their binary encoding.

use byteorder::{ByteOrder, LittleEndian};

use crate::util::{Error, Result};

/// Value of a single attribute.
///
/// Encoded as one tag byte followed by the payload; numeric arrays are
/// little-endian.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    String(String),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Bytes(Vec<u8>),
}

impl Attribute {
    const TAG_STRING: u8 = 0;
    const TAG_INTS: u8 = 1;
    const TAG_FLOATS: u8 = 2;
    const TAG_DOUBLES: u8 = 3;
    const TAG_BYTES: u8 = 4;

    /// Name of the value type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Ints(_) => "ints",
            Self::Floats(_) => "floats",
            Self::Doubles(_) => "doubles",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Serialize to the on-disk form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::String(s) => {
                buf.push(Self::TAG_STRING);
                buf.extend_from_slice(s.as_bytes());
            }
            Self::Ints(v) => {
                buf.push(Self::TAG_INTS);
                for &x in v {
                    buf.extend_from_slice(&x.to_le_bytes());
                }
            }
            Self::Floats(v) => {
                buf.push(Self::TAG_FLOATS);
                for &x in v {
                    buf.extend_from_slice(&x.to_le_bytes());
                }
            }
            Self::Doubles(v) => {
                buf.push(Self::TAG_DOUBLES);
                for &x in v {
                    buf.extend_from_slice(&x.to_le_bytes());
                }
            }
            Self::Bytes(v) => {
                buf.push(Self::TAG_BYTES);
                buf.extend_from_slice(v);
            }
        }
        buf
    }

    /// Parse the on-disk form.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (&tag, payload) = data
            .split_first()
            .ok_or_else(|| Error::invalid("empty attribute value"))?;

        fn check_stride(payload: &[u8], stride: usize) -> Result<()> {
            if payload.len() % stride != 0 {
                return Err(Error::invalid(format!(
                    "attribute payload of {} bytes is not a multiple of {}",
                    payload.len(),
                    stride
                )));
            }
            Ok(())
        }

        match tag {
            Self::TAG_STRING => Ok(Self::String(String::from_utf8(payload.to_vec())?)),
            Self::TAG_INTS => {
                check_stride(payload, 4)?;
                let mut v = vec![0i32; payload.len() / 4];
                LittleEndian::read_i32_into(payload, &mut v);
                Ok(Self::Ints(v))
            }
            Self::TAG_FLOATS => {
                check_stride(payload, 4)?;
                let mut v = vec![0f32; payload.len() / 4];
                LittleEndian::read_f32_into(payload, &mut v);
                Ok(Self::Floats(v))
            }
            Self::TAG_DOUBLES => {
                check_stride(payload, 8)?;
                let mut v = vec![0f64; payload.len() / 8];
                LittleEndian::read_f64_into(payload, &mut v);
                Ok(Self::Doubles(v))
            }
            Self::TAG_BYTES => Ok(Self::Bytes(payload.to_vec())),
            other => Err(Error::invalid(format!("unknown attribute tag {}", other))),
        }
    }

    /// Borrow as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as integers.
    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Self::Ints(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as floats.
    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Floats(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as doubles.
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            Self::Doubles(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Attribute {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Attribute {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
