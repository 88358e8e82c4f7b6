//! Byte string (bytea) implementations.

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};

use super::{FromWireValue, ToWireValue};

impl<'a> FromWireValue<'a> for &'a [u8] {
    fn from_text(_oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        // Text format for bytea is hex-encoded; callers wanting the decoded
        // form should scan into Vec<u8> instead.
        Ok(bytes)
    }

    fn from_binary(_oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        Ok(bytes)
    }
}

impl FromWireValue<'_> for Vec<u8> {
    fn from_text(_oid: Oid, bytes: &[u8]) -> Result<Self> {
        // Text format for bytea is hex-encoded: \xDEADBEEF
        if let Some(hex) = bytes.strip_prefix(b"\\x") {
            decode_hex(hex)
        } else {
            Ok(bytes.to_vec())
        }
    }

    fn from_binary(_oid: Oid, bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

impl ToWireValue for [u8] {
    fn natural_oid(&self) -> Oid {
        oid::BYTEA
    }

    fn wire_format(&self, _target_oid: Oid) -> FormatCode {
        FormatCode::Binary
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::BYTEA {
            return Err(Error::type_mismatch(self.natural_oid(), target_oid));
        }
        buf.extend_from_slice(&(self.len() as i32).to_be_bytes());
        buf.extend_from_slice(self);
        Ok(())
    }
}

impl ToWireValue for Vec<u8> {
    fn natural_oid(&self) -> Oid {
        oid::BYTEA
    }

    fn wire_format(&self, target_oid: Oid) -> FormatCode {
        self.as_slice().wire_format(target_oid)
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.as_slice().encode(target_oid, buf)
    }
}

/// Decode hex string to bytes
fn decode_hex(hex: &[u8]) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(Error::Decode("invalid hex length".into()));
    }

    let mut result = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        result.push((high << 4) | low);
    }
    Ok(result)
}

fn hex_digit(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(Error::Decode(format!("invalid hex digit: {}", b as char))),
    }
}
