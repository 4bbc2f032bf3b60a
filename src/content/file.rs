use crate::record::{self, Record};
use crate::{Error, SymmetricKey};

/// Payload of file, image, audio and video contents.
///
/// `data` is transient: it lives in memory until the file is uploaded and
/// replaced by `url`, and is never written to a record. `password` is filled
/// in on the receiving side so the downloaded bytes can be decrypted later.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileContent {
    pub url: Option<String>,
    pub filename: Option<String>,
    pub data: Option<Vec<u8>>,
    pub password: Option<SymmetricKey>,
    /// Image preview, serialized.
    pub thumbnail: Option<Vec<u8>>,
    /// Video preview, serialized.
    pub snapshot: Option<Vec<u8>>,
}

impl FileContent {
    pub fn new(filename: Option<String>, data: Option<Vec<u8>>) -> Self {
        Self {
            filename,
            data,
            ..Default::default()
        }
    }

    /// True when the bytes only exist remotely.
    pub fn is_remote_only(&self) -> bool {
        self.data.is_none() && self.url.is_some()
    }

    pub(crate) fn parse(record: &mut Record) -> Result<Self, Error> {
        let file = Self {
            url: record::get_str(record, "URL")?.map(str::to_string),
            filename: record::get_str(record, "filename")?.map(str::to_string),
            data: None,
            password: record::get_record(record, "password")?
                .map(SymmetricKey::parse)
                .transpose()?,
            thumbnail: record::get_bytes(record, "thumbnail")?,
            snapshot: record::get_bytes(record, "snapshot")?,
        };
        for key in ["URL", "filename", "password", "thumbnail", "snapshot"] {
            record.remove(key);
        }
        // inline data is never trusted from the wire
        record.remove("data");
        Ok(file)
    }

    pub(crate) fn write_to(&self, record: &mut Record) {
        record::put(record, "URL", self.url.as_deref());
        record::put(record, "filename", self.filename.as_deref());
        record::put(
            record,
            "password",
            self.password.as_ref().map(SymmetricKey::to_record),
        );
        record::put_bytes(record, "thumbnail", self.thumbnail.as_deref());
        record::put_bytes(record, "snapshot", self.snapshot.as_deref());
    }
}
