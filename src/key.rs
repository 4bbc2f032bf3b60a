use crate::Error;
use crate::record::{self, Record};
use std::fmt;
use zeroize::Zeroize;

/// Symmetric key material ("password") used to encrypt one message's content.
///
/// The protocol never interprets the key: `algorithm` names the cipher and
/// `data` is the raw secret. Any other fields (an IV, a key id) are carried in
/// `extra` untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    algorithm: String,
    data: Vec<u8>,
    extra: Record,
}

impl SymmetricKey {
    pub fn new(algorithm: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            data,
            extra: Record::new(),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn extra(&self) -> &Record {
        &self.extra
    }

    pub fn parse(record: &Record) -> Result<Self, Error> {
        let algorithm = record::require_str(record, "algorithm")?.to_string();
        let data = record::get_bytes(record, "data")?.ok_or_else(|| Error::missing("data"))?;
        let mut extra = record.clone();
        extra.remove("algorithm");
        extra.remove("data");
        Ok(Self {
            algorithm,
            data,
            extra,
        })
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.extra.clone();
        record::put(&mut record, "algorithm", Some(self.algorithm.as_str()));
        record::put_bytes(&mut record, "data", Some(self.data.as_slice()));
        record
    }
}

// Key bytes stay out of logs.
impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("algorithm", &self.algorithm)
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .finish()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extra_fields_survive() {
        let record = json!({"algorithm": "AES", "data": "AAECAw==", "iv": "BAUGBw=="});
        let key = SymmetricKey::parse(record.as_object().unwrap()).unwrap();
        assert_eq!(key.algorithm(), "AES");
        assert_eq!(key.data(), &[0, 1, 2, 3]);
        assert_eq!(key.extra()["iv"], json!("BAUGBw=="));
        assert_eq!(&key.to_record(), record.as_object().unwrap());
    }

    #[test]
    fn debug_hides_secret() {
        let key = SymmetricKey::new("AES", vec![7; 32]);
        let text = format!("{key:?}");
        assert!(text.contains("[32 bytes]"));
        assert!(!text.contains("7, 7"));
    }

    #[test]
    fn data_is_required() {
        let record = json!({"algorithm": "AES"});
        assert!(SymmetricKey::parse(record.as_object().unwrap()).is_err());
    }
}
