//! Row decoding into tuples of scan targets.

use crate::error::{Error, Result};
use crate::rows::Column;

use super::{FromWireValue, decode_wire_value};

/// Trait for decoding a buffered result row into a Rust type.
///
/// Implemented for tuples of [`FromWireValue`] types; each element decodes
/// the corresponding column using its declared type OID and format code.
/// NULL fields require elements that can represent NULL (`Option<T>`).
pub trait FromRow<'a>: Sized {
    /// Decode a row given its column metadata and field values.
    fn from_row(columns: &'a [Column], values: &'a [Option<Vec<u8>>]) -> Result<Self>;
}

/// Implementation for the empty tuple, for statements that return no data.
impl FromRow<'_> for () {
    fn from_row(_columns: &[Column], _values: &[Option<Vec<u8>>]) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_from_row_tuple {
    ($count:literal: $($idx:tt => $T:ident),+) => {
        impl<'a, $($T: FromWireValue<'a>),+> FromRow<'a> for ($($T,)+) {
            fn from_row(columns: &'a [Column], values: &'a [Option<Vec<u8>>]) -> Result<Self> {
                if columns.len() < $count || values.len() < $count {
                    return Err(Error::Usage(format!(
                        "row has {} columns, scan target expects {}",
                        values.len(),
                        $count
                    )));
                }
                Ok(($(
                    decode_wire_value(
                        columns[$idx].type_oid(),
                        columns[$idx].format(),
                        values[$idx].as_deref(),
                    )?,
                )+))
            }
        }
    };
}

impl_from_row_tuple!(1: 0 => A);
impl_from_row_tuple!(2: 0 => A, 1 => B);
impl_from_row_tuple!(3: 0 => A, 1 => B, 2 => C);
impl_from_row_tuple!(4: 0 => A, 1 => B, 2 => C, 3 => D);
impl_from_row_tuple!(5: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_from_row_tuple!(6: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_from_row_tuple!(7: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
impl_from_row_tuple!(8: 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{FormatCode, oid};

    fn text_column(name: &str, type_oid: u32) -> Column {
        Column::new(name.to_string(), 0, 0, type_oid, -1, -1, FormatCode::Text)
    }

    #[test]
    fn tuple_scan() {
        let columns = vec![text_column("id", oid::INT4), text_column("name", oid::TEXT)];
        let values = vec![Some(b"7".to_vec()), Some(b"alice".to_vec())];

        let (id, name): (i32, String) = FromRow::from_row(&columns, &values).unwrap();
        assert_eq!(id, 7);
        assert_eq!(name, "alice");
    }

    #[test]
    fn null_requires_option_target() {
        let columns = vec![text_column("name", oid::TEXT)];
        let values = vec![None];

        let (name,): (Option<String>,) = FromRow::from_row(&columns, &values).unwrap();
        assert_eq!(name, None);

        let plain: Result<(String,)> = FromRow::from_row(&columns, &values);
        assert!(plain.is_err());
    }

    #[test]
    fn too_few_columns_is_a_usage_error() {
        let columns = vec![text_column("id", oid::INT4)];
        let values = vec![Some(b"7".to_vec())];

        let pair: Result<(i32, i32)> = FromRow::from_row(&columns, &values);
        assert!(pair.is_err());
    }
}
