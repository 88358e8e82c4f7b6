//! Primitive type implementations (bool, integers, floats).

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};

use super::{FromWireValue, ToWireValue};

fn parse_text<T: std::str::FromStr>(kind: &str, bytes: &[u8]) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))?;
    s.trim()
        .parse()
        .map_err(|e| Error::Decode(format!("invalid {kind}: {e}")))
}

fn write_len_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as i32).to_be_bytes());
    buf.extend_from_slice(data);
}

// === Boolean ===

impl FromWireValue<'_> for bool {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BOOL {
            return Err(Error::Decode(format!("cannot decode oid {} as bool", oid)));
        }
        match bytes {
            b"t" | b"true" | b"TRUE" | b"T" | b"1" => Ok(true),
            b"f" | b"false" | b"FALSE" | b"F" | b"0" => Ok(false),
            _ => Err(Error::Decode(format!(
                "invalid boolean: {:?}",
                String::from_utf8_lossy(bytes)
            ))),
        }
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BOOL {
            return Err(Error::Decode(format!("cannot decode oid {} as bool", oid)));
        }
        if bytes.len() != 1 {
            return Err(Error::Decode(format!(
                "invalid boolean length: {}",
                bytes.len()
            )));
        }
        Ok(bytes[0] != 0)
    }
}

impl ToWireValue for bool {
    fn natural_oid(&self) -> Oid {
        oid::BOOL
    }

    fn wire_format(&self, _target_oid: Oid) -> FormatCode {
        FormatCode::Binary
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::BOOL => {
                write_len_prefixed(buf, &[u8::from(*self)]);
                Ok(())
            }
            _ => Err(Error::type_mismatch(self.natural_oid(), target_oid)),
        }
    }
}

// === Integer types ===

macro_rules! impl_int_to_wire {
    ($T:ty, $natural:expr) => {
        impl ToWireValue for $T {
            fn natural_oid(&self) -> Oid {
                $natural
            }

            fn wire_format(&self, target_oid: Oid) -> FormatCode {
                match target_oid {
                    oid::NUMERIC => FormatCode::Text,
                    _ => FormatCode::Binary,
                }
            }

            fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
                match target_oid {
                    oid::INT2 => {
                        let value = i16::try_from(*self).map_err(|_| {
                            Error::Decode(format!("value {} out of range for INT2", self))
                        })?;
                        write_len_prefixed(buf, &value.to_be_bytes());
                    }
                    oid::INT4 => {
                        let value = i32::try_from(*self).map_err(|_| {
                            Error::Decode(format!("value {} out of range for INT4", self))
                        })?;
                        write_len_prefixed(buf, &value.to_be_bytes());
                    }
                    oid::INT8 => {
                        write_len_prefixed(buf, &i64::from(*self).to_be_bytes());
                    }
                    oid::OID => {
                        let value = u32::try_from(*self).map_err(|_| {
                            Error::Decode(format!("value {} out of range for OID", self))
                        })?;
                        write_len_prefixed(buf, &value.to_be_bytes());
                    }
                    oid::NUMERIC => {
                        write_len_prefixed(buf, self.to_string().as_bytes());
                    }
                    _ => return Err(Error::type_mismatch(self.natural_oid(), target_oid)),
                }
                Ok(())
            }
        }
    };
}

impl_int_to_wire!(i16, oid::INT2);
impl_int_to_wire!(i32, oid::INT4);
impl_int_to_wire!(i64, oid::INT8);

impl FromWireValue<'_> for i16 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::INT2 {
            return Err(Error::Decode(format!("cannot decode oid {} as i16", oid)));
        }
        parse_text("i16", bytes)
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::INT2 {
            return Err(Error::Decode(format!("cannot decode oid {} as i16", oid)));
        }
        let arr: [u8; 2] = bytes
            .try_into()
            .map_err(|_| Error::Decode(format!("invalid i16 length: {}", bytes.len())))?;
        Ok(i16::from_be_bytes(arr))
    }
}

impl FromWireValue<'_> for i32 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::INT2 | oid::INT4) {
            return Err(Error::Decode(format!("cannot decode oid {} as i32", oid)));
        }
        parse_text("i32", bytes)
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::INT2 => i16::from_binary(oid, bytes).map(i32::from),
            oid::INT4 => {
                let arr: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| Error::Decode(format!("invalid i32 length: {}", bytes.len())))?;
                Ok(i32::from_be_bytes(arr))
            }
            _ => Err(Error::Decode(format!("cannot decode oid {} as i32", oid))),
        }
    }
}

impl FromWireValue<'_> for i64 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::INT2 | oid::INT4 | oid::INT8) {
            return Err(Error::Decode(format!("cannot decode oid {} as i64", oid)));
        }
        parse_text("i64", bytes)
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::INT2 => i16::from_binary(oid, bytes).map(i64::from),
            oid::INT4 => i32::from_binary(oid, bytes).map(i64::from),
            oid::INT8 => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| Error::Decode(format!("invalid i64 length: {}", bytes.len())))?;
                Ok(i64::from_be_bytes(arr))
            }
            _ => Err(Error::Decode(format!("cannot decode oid {} as i64", oid))),
        }
    }
}

// === Floating point types ===

impl FromWireValue<'_> for f32 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::FLOAT4 | oid::NUMERIC) {
            return Err(Error::Decode(format!("cannot decode oid {} as f32", oid)));
        }
        parse_text("f32", bytes)
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::FLOAT4 {
            return Err(Error::Decode(format!("cannot decode oid {} as f32", oid)));
        }
        let arr: [u8; 4] = bytes
            .try_into()
            .map_err(|_| Error::Decode(format!("invalid f32 length: {}", bytes.len())))?;
        Ok(f32::from_be_bytes(arr))
    }
}

impl FromWireValue<'_> for f64 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::FLOAT4 | oid::FLOAT8 | oid::NUMERIC) {
            return Err(Error::Decode(format!("cannot decode oid {} as f64", oid)));
        }
        parse_text("f64", bytes)
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::FLOAT4 => f32::from_binary(oid, bytes).map(f64::from),
            oid::FLOAT8 => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| Error::Decode(format!("invalid f64 length: {}", bytes.len())))?;
                Ok(f64::from_be_bytes(arr))
            }
            _ => Err(Error::Decode(format!("cannot decode oid {} as f64", oid))),
        }
    }
}

impl ToWireValue for f32 {
    fn natural_oid(&self) -> Oid {
        oid::FLOAT4
    }

    fn wire_format(&self, target_oid: Oid) -> FormatCode {
        match target_oid {
            oid::NUMERIC => FormatCode::Text,
            _ => FormatCode::Binary,
        }
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::FLOAT4 => write_len_prefixed(buf, &self.to_be_bytes()),
            oid::FLOAT8 => write_len_prefixed(buf, &f64::from(*self).to_be_bytes()),
            oid::NUMERIC => write_len_prefixed(buf, self.to_string().as_bytes()),
            _ => return Err(Error::type_mismatch(self.natural_oid(), target_oid)),
        }
        Ok(())
    }
}

impl ToWireValue for f64 {
    fn natural_oid(&self) -> Oid {
        oid::FLOAT8
    }

    fn wire_format(&self, target_oid: Oid) -> FormatCode {
        match target_oid {
            oid::NUMERIC => FormatCode::Text,
            _ => FormatCode::Binary,
        }
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::FLOAT8 => write_len_prefixed(buf, &self.to_be_bytes()),
            oid::NUMERIC => write_len_prefixed(buf, self.to_string().as_bytes()),
            _ => return Err(Error::type_mismatch(self.natural_oid(), target_oid)),
        }
        Ok(())
    }
}
