//! Type encoding and decoding for PostgreSQL wire protocol.
//!
//! This module provides traits and implementations for converting between
//! Rust types and PostgreSQL wire format values.

mod bytes;
mod primitives;
mod row;
mod string;

#[cfg(feature = "with-chrono")]
mod chrono;

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};

pub use row::FromRow;

/// Trait for decoding PostgreSQL values into Rust types.
///
/// This trait provides methods for decoding values from different formats:
/// - `from_null()` - Handle NULL values
/// - `from_text()` - Decode from text format
/// - `from_binary()` - Decode from binary format
///
/// The OID parameter lets implementations check the PostgreSQL type and
/// reject incompatible columns with clear error messages.
pub trait FromWireValue<'a>: Sized {
    /// Decode from NULL value.
    ///
    /// Default implementation returns an error. Override for types that can
    /// represent NULL (like `Option<T>`).
    fn from_null() -> Result<Self> {
        Err(Error::Decode("unexpected NULL value".into()))
    }

    /// Decode from text format bytes.
    ///
    /// Text format values are UTF-8 encoded string representations.
    fn from_text(oid: Oid, bytes: &'a [u8]) -> Result<Self>;

    /// Decode from binary format bytes.
    ///
    /// Binary format uses PostgreSQL's internal representation. Integers are
    /// big-endian, floats are IEEE 754, etc.
    fn from_binary(oid: Oid, bytes: &'a [u8]) -> Result<Self>;
}

/// Trait for encoding Rust values as PostgreSQL parameters.
///
/// Values are rendered as UTF-8 text by default; the numeric, boolean,
/// bytea and date/time types use the binary format (network byte order,
/// IEEE-754, PostgreSQL's documented layouts). `wire_format` reports which
/// of the two `encode` will produce for a given target OID; the Bind
/// message carries that format code alongside the value.
///
/// `encode` writes the length-prefixed value:
/// - 4-byte big-endian length followed by the data, or
/// - length -1 for NULL (no data follows).
pub trait ToWireValue {
    /// The OID this value naturally encodes to.
    fn natural_oid(&self) -> Oid;

    /// The format `encode` uses for the given target OID.
    fn wire_format(&self, target_oid: Oid) -> FormatCode;

    /// Encode this value for the given target OID.
    ///
    /// Narrowing conversions (e.g. an i64 bound to an INT4 parameter) are
    /// range-checked and fail rather than truncate.
    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()>;
}

/// Trait for encoding a parameter list.
pub trait ToParams {
    /// Number of parameters.
    fn param_count(&self) -> usize;

    /// Per-parameter format codes for the given declared OIDs.
    fn formats(&self, target_oids: &[Oid]) -> Vec<FormatCode>;

    /// Encode all parameters using the declared OIDs.
    ///
    /// `target_oids` must have the same length as `param_count()`.
    fn encode(&self, target_oids: &[Oid], buf: &mut Vec<u8>) -> Result<()>;
}

pub(crate) fn target_oid(target_oids: &[Oid], index: usize) -> Result<Oid> {
    target_oids.get(index).copied().ok_or_else(|| {
        Error::Usage(format!(
            "parameter {} has no declared type (statement declares {})",
            index + 1,
            target_oids.len()
        ))
    })
}

/// Decode `value` (a nullable wire value) for a column of the given OID and
/// format.
pub fn decode_wire_value<'a, T: FromWireValue<'a>>(
    oid: Oid,
    format: FormatCode,
    value: Option<&'a [u8]>,
) -> Result<T> {
    match value {
        None => T::from_null(),
        Some(bytes) => match format {
            FormatCode::Text => T::from_text(oid, bytes),
            FormatCode::Binary => T::from_binary(oid, bytes),
        },
    }
}

// === Option<T> - NULL handling ===

impl<'a, T: FromWireValue<'a>> FromWireValue<'a> for Option<T> {
    fn from_null() -> Result<Self> {
        Ok(None)
    }

    fn from_text(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        T::from_text(oid, bytes).map(Some)
    }

    fn from_binary(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        T::from_binary(oid, bytes).map(Some)
    }
}

impl<T: ToWireValue> ToWireValue for Option<T> {
    fn natural_oid(&self) -> Oid {
        match self {
            Some(value) => value.natural_oid(),
            None => oid::UNKNOWN,
        }
    }

    fn wire_format(&self, target_oid: Oid) -> FormatCode {
        match self {
            Some(value) => value.wire_format(target_oid),
            None => FormatCode::Text,
        }
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(value) => value.encode(target_oid, buf),
            None => {
                // NULL is represented as -1 length
                buf.extend_from_slice(&(-1_i32).to_be_bytes());
                Ok(())
            }
        }
    }
}

// === Reference support ===

impl<T: ToWireValue + ?Sized> ToWireValue for &T {
    fn natural_oid(&self) -> Oid {
        (*self).natural_oid()
    }

    fn wire_format(&self, target_oid: Oid) -> FormatCode {
        (*self).wire_format(target_oid)
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        (*self).encode(target_oid, buf)
    }
}

// === ToParams for tuples ===

impl ToParams for () {
    fn param_count(&self) -> usize {
        0
    }

    fn formats(&self, _target_oids: &[Oid]) -> Vec<FormatCode> {
        Vec::new()
    }

    fn encode(&self, _target_oids: &[Oid], _buf: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

macro_rules! impl_to_params_tuple {
    ($count:literal: $($idx:tt => $T:ident),+) => {
        impl<$($T: ToWireValue),+> ToParams for ($($T,)+) {
            fn param_count(&self) -> usize {
                $count
            }

            fn formats(&self, target_oids: &[Oid]) -> Vec<FormatCode> {
                let mut formats = Vec::with_capacity($count);
                $(
                    formats.push(
                        self.$idx
                            .wire_format(target_oids.get($idx).copied().unwrap_or(oid::UNKNOWN)),
                    );
                )+
                formats
            }

            fn encode(&self, target_oids: &[Oid], buf: &mut Vec<u8>) -> Result<()> {
                $(
                    self.$idx.encode(target_oid(target_oids, $idx)?, buf)?;
                )+
                Ok(())
            }
        }
    };
}

impl_to_params_tuple!(1: 0 => A);
impl_to_params_tuple!(2: 0 => A, 1 => B);
impl_to_params_tuple!(3: 0 => A, 1 => B, 2 => C);
impl_to_params_tuple!(4: 0 => A, 1 => B, 2 => C, 3 => D);
impl_to_params_tuple!(5: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_to_params_tuple!(6: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_to_params_tuple!(7: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
impl_to_params_tuple!(8: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);

// === ToParams for dynamic slices ===

impl ToParams for &[&dyn ToWireValue] {
    fn param_count(&self) -> usize {
        self.len()
    }

    fn formats(&self, target_oids: &[Oid]) -> Vec<FormatCode> {
        self.iter()
            .enumerate()
            .map(|(index, value)| {
                value.wire_format(target_oids.get(index).copied().unwrap_or(oid::UNKNOWN))
            })
            .collect()
    }

    fn encode(&self, target_oids: &[Oid], buf: &mut Vec<u8>) -> Result<()> {
        for (index, value) in self.iter().enumerate() {
            value.encode(target_oid(target_oids, index)?, buf)?;
        }
        Ok(())
    }
}
