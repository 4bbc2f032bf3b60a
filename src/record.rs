//! Flat key/value records, the wire shape of envelopes, contents and messages.
//!
//! Binary fields travel as standard base64 strings. Timestamps are seconds
//! since the UNIX epoch; readers accept integers and floats.

use crate::{Error, ID};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// A JSON object as parsed from or written to the wire.
pub type Record = serde_json::Map<String, Value>;

/// Seconds since the UNIX epoch.
pub type Timestamp = u64;

/// Current time in seconds.
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>, Error> {
    Ok(STANDARD.decode(text)?)
}

/// Reads an optional string field; a present non-string value is an error.
pub fn get_str<'a>(record: &'a Record, key: &str) -> Result<Option<&'a str>, Error> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(Error::invalid(key, "a string")),
    }
}

pub fn require_str<'a>(record: &'a Record, key: &str) -> Result<&'a str, Error> {
    get_str(record, key)?.ok_or_else(|| Error::missing(key))
}

pub fn get_id(record: &Record, key: &str) -> Result<Option<ID>, Error> {
    get_str(record, key)?.map(str::parse::<ID>).transpose()
}

pub fn require_id(record: &Record, key: &str) -> Result<ID, Error> {
    get_id(record, key)?.ok_or_else(|| Error::missing(key))
}

/// Reads a non-negative integer. Floats are truncated toward zero.
pub fn get_u64(record: &Record, key: &str) -> Result<Option<u64>, Error> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return Ok(Some(v));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 && f < u64::MAX as f64 => {
                    Ok(Some(f.trunc() as u64))
                }
                _ => Err(Error::invalid(key, "a non-negative integer")),
            }
        }
        Some(Value::String(s)) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::invalid(key, "a non-negative integer")),
        Some(_) => Err(Error::invalid(key, "a non-negative integer")),
    }
}

pub fn get_u32(record: &Record, key: &str) -> Result<Option<u32>, Error> {
    match get_u64(record, key)? {
        None => Ok(None),
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| Error::invalid(key, "a 32-bit integer")),
    }
}

pub fn get_time(record: &Record, key: &str) -> Result<Option<Timestamp>, Error> {
    get_u64(record, key)
}

/// Reads a base64 field into raw bytes.
pub fn get_bytes(record: &Record, key: &str) -> Result<Option<Vec<u8>>, Error> {
    get_str(record, key)?.map(decode_base64).transpose()
}

pub fn get_record<'a>(record: &'a Record, key: &str) -> Result<Option<&'a Record>, Error> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(Error::invalid(key, "an object")),
    }
}

/// Sets `key` to `value`, or removes it entirely when `value` is `None`.
pub fn put<V: Into<Value>>(record: &mut Record, key: &str, value: Option<V>) {
    match value {
        Some(v) => {
            record.insert(key.to_string(), v.into());
        }
        None => {
            record.remove(key);
        }
    }
}

pub fn put_bytes(record: &mut Record, key: &str, value: Option<&[u8]>) {
    put(record, key, value.map(encode_base64));
}

/// Parses raw JSON bytes into a record.
pub fn parse_json(bytes: &[u8]) -> Result<Record, Error> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Format("expected a JSON object".to_string())),
    }
}
