//! Date/time implementations backed by chrono.
//!
//! Binary formats follow PostgreSQL's documented layouts: DATE is days
//! since 2000-01-01, TIME is microseconds since midnight, TIMESTAMP and
//! TIMESTAMPTZ are microseconds since 2000-01-01 00:00:00 (UTC for the
//! latter).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};

use super::{FromWireValue, ToWireValue};

const PG_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(date) => date,
    None => panic!("invalid PostgreSQL epoch"),
};

fn pg_epoch_datetime() -> NaiveDateTime {
    PG_EPOCH.and_time(NaiveTime::MIN)
}

fn write_len_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as i32).to_be_bytes());
    buf.extend_from_slice(data);
}

fn text(bytes: &[u8]) -> Result<&str> {
    simdutf8::compat::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
}

impl FromWireValue<'_> for NaiveDate {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::DATE {
            return Err(Error::Decode(format!("cannot decode oid {} as date", oid)));
        }
        NaiveDate::parse_from_str(text(bytes)?, "%Y-%m-%d")
            .map_err(|e| Error::Decode(format!("invalid date: {e}")))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::DATE {
            return Err(Error::Decode(format!("cannot decode oid {} as date", oid)));
        }
        let arr: [u8; 4] = bytes
            .try_into()
            .map_err(|_| Error::Decode(format!("invalid date length: {}", bytes.len())))?;
        let days = i32::from_be_bytes(arr);
        PG_EPOCH
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| Error::Decode(format!("date out of range: {days} days")))
    }
}

impl ToWireValue for NaiveDate {
    fn natural_oid(&self) -> Oid {
        oid::DATE
    }

    fn wire_format(&self, _target_oid: Oid) -> FormatCode {
        FormatCode::Binary
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::DATE {
            return Err(Error::type_mismatch(self.natural_oid(), target_oid));
        }
        let days = self.signed_duration_since(PG_EPOCH).num_days();
        let days = i32::try_from(days)
            .map_err(|_| Error::Decode(format!("date out of range: {self}")))?;
        write_len_prefixed(buf, &days.to_be_bytes());
        Ok(())
    }
}

impl FromWireValue<'_> for NaiveTime {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIME {
            return Err(Error::Decode(format!("cannot decode oid {} as time", oid)));
        }
        NaiveTime::parse_from_str(text(bytes)?, "%H:%M:%S%.f")
            .map_err(|e| Error::Decode(format!("invalid time: {e}")))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIME {
            return Err(Error::Decode(format!("cannot decode oid {} as time", oid)));
        }
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::Decode(format!("invalid time length: {}", bytes.len())))?;
        let micros = i64::from_be_bytes(arr);
        if !(0..=86_400_000_000).contains(&micros) {
            return Err(Error::Decode(format!("time out of range: {micros} us")));
        }
        let (time, _) = NaiveTime::MIN.overflowing_add_signed(Duration::microseconds(micros));
        Ok(time)
    }
}

impl ToWireValue for NaiveTime {
    fn natural_oid(&self) -> Oid {
        oid::TIME
    }

    fn wire_format(&self, _target_oid: Oid) -> FormatCode {
        FormatCode::Binary
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::TIME {
            return Err(Error::type_mismatch(self.natural_oid(), target_oid));
        }
        let micros = self
            .signed_duration_since(NaiveTime::MIN)
            .num_microseconds()
            .ok_or_else(|| Error::Decode(format!("time out of range: {self}")))?;
        write_len_prefixed(buf, &micros.to_be_bytes());
        Ok(())
    }
}

impl FromWireValue<'_> for NaiveDateTime {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMP {
            return Err(Error::Decode(format!(
                "cannot decode oid {} as timestamp",
                oid
            )));
        }
        NaiveDateTime::parse_from_str(text(bytes)?, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|e| Error::Decode(format!("invalid timestamp: {e}")))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMP {
            return Err(Error::Decode(format!(
                "cannot decode oid {} as timestamp",
                oid
            )));
        }
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::Decode(format!("invalid timestamp length: {}", bytes.len())))?;
        let micros = i64::from_be_bytes(arr);
        pg_epoch_datetime()
            .checked_add_signed(Duration::microseconds(micros))
            .ok_or_else(|| Error::Decode(format!("timestamp out of range: {micros} us")))
    }
}

impl ToWireValue for NaiveDateTime {
    fn natural_oid(&self) -> Oid {
        oid::TIMESTAMP
    }

    fn wire_format(&self, _target_oid: Oid) -> FormatCode {
        FormatCode::Binary
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if !matches!(target_oid, oid::TIMESTAMP | oid::TIMESTAMPTZ) {
            return Err(Error::type_mismatch(self.natural_oid(), target_oid));
        }
        let micros = self
            .signed_duration_since(pg_epoch_datetime())
            .num_microseconds()
            .ok_or_else(|| Error::Decode(format!("timestamp out of range: {self}")))?;
        write_len_prefixed(buf, &micros.to_be_bytes());
        Ok(())
    }
}

impl FromWireValue<'_> for DateTime<Utc> {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMPTZ {
            return Err(Error::Decode(format!(
                "cannot decode oid {} as timestamptz",
                oid
            )));
        }
        DateTime::parse_from_str(text(bytes)?, "%Y-%m-%d %H:%M:%S%.f%#z")
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Decode(format!("invalid timestamptz: {e}")))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMPTZ {
            return Err(Error::Decode(format!(
                "cannot decode oid {} as timestamptz",
                oid
            )));
        }
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::Decode(format!("invalid timestamptz length: {}", bytes.len())))?;
        let micros = i64::from_be_bytes(arr);
        pg_epoch_datetime()
            .checked_add_signed(Duration::microseconds(micros))
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
            .ok_or_else(|| Error::Decode(format!("timestamptz out of range: {micros} us")))
    }
}

impl ToWireValue for DateTime<Utc> {
    fn natural_oid(&self) -> Oid {
        oid::TIMESTAMPTZ
    }

    fn wire_format(&self, _target_oid: Oid) -> FormatCode {
        FormatCode::Binary
    }

    fn encode(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if !matches!(target_oid, oid::TIMESTAMP | oid::TIMESTAMPTZ) {
            return Err(Error::type_mismatch(self.natural_oid(), target_oid));
        }
        self.naive_utc().encode(oid::TIMESTAMP, buf)
    }
}
