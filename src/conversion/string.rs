//! String type implementations.
//!
//! Strings always encode in text format. The server parses the text input
//! according to the declared parameter type, so a string may be bound to
//! any target OID.

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};

use super::{FromWireValue, ToWireValue};

fn utf8<'a>(bytes: &'a [u8]) -> Result<&'a str> {
    simdutf8::compat::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
}

impl<'a> FromWireValue<'a> for &'a str {
    fn from_text(_oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        utf8(bytes)
    }

    fn from_binary(_oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        utf8(bytes)
    }
}

impl FromWireValue<'_> for String {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        <&str>::from_text(oid, bytes).map(str::to_string)
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        <&str>::from_binary(oid, bytes).map(str::to_string)
    }
}

impl ToWireValue for str {
    fn natural_oid(&self) -> Oid {
        oid::TEXT
    }

    fn wire_format(&self, _target_oid: Oid) -> FormatCode {
        FormatCode::Text
    }

    fn encode(&self, _target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&(self.len() as i32).to_be_bytes());
        buf.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl ToWireValue for String {
    fn natural_oid(&self) -> Oid {
        oid::TEXT
    }

    fn wire_format(&self, target_oid: Oid) -> FormatCode {
        self.as_str().wire_format(target_oid)
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.as_str().encode(target_oid, buf)
    }
}
