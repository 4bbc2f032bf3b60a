use crate::record::{self, Record};
use crate::{Envelope, Error, ID, Registry, ReliableMessageDelegate, SecureMessage};
use tracing::debug;

/// A secure message signed by its sender.
///
/// `meta` and `visa` are the sender's public credentials, attached to
/// first-contact messages so the receiver can learn the sender. The
/// protocol treats them as opaque records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReliableMessage {
    secure: SecureMessage,
    signature: String,
    meta: Option<Record>,
    visa: Option<Record>,
}

impl ReliableMessage {
    pub(crate) fn from_parts(secure: SecureMessage, signature: String) -> Self {
        Self {
            secure,
            signature,
            meta: None,
            visa: None,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        self.secure.envelope()
    }

    /// The signed secure message.
    pub fn secure(&self) -> &SecureMessage {
        &self.secure
    }

    pub fn data(&self) -> &str {
        self.secure.data()
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn meta(&self) -> Option<&Record> {
        self.meta.as_ref()
    }

    pub fn set_meta(&mut self, meta: Option<Record>) {
        self.meta = meta;
    }

    pub fn visa(&self) -> Option<&Record> {
        self.visa.as_ref()
    }

    pub fn set_visa(&mut self, visa: Option<Record>) {
        self.visa = visa;
    }

    pub fn parse(record: &Record, registry: &Registry) -> Result<Self, Error> {
        let secure = SecureMessage::parse(record, registry)?;
        Ok(Self {
            secure,
            signature: record::require_str(record, "signature")?.to_string(),
            meta: record::get_record(record, "meta")?.cloned(),
            visa: record::get_record(record, "visa")?.cloned(),
        })
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.secure.to_record();
        record::put(&mut record, "signature", Some(self.signature.as_str()));
        record::put(&mut record, "meta", self.meta.clone());
        record::put(&mut record, "visa", self.visa.clone());
        record
    }

    /// Checks the sender's signature over the encrypted data.
    ///
    /// A mismatch is `Ok(None)`; only malformed transport encodings are
    /// errors.
    pub fn verify<D>(&self, delegate: &D) -> Result<Option<SecureMessage>, Error>
    where
        D: ReliableMessageDelegate + ?Sized,
    {
        let sender = self.envelope().sender();
        let data = delegate.decode_data(self.secure.data(), &self.secure)?;
        let signature = delegate.decode_signature(&self.signature, self)?;

        if delegate.verify_data_signature(&data, &signature, sender, self) {
            debug!(sender = %sender, "signature verified");
            Ok(Some(self.secure.clone()))
        } else {
            debug!(sender = %sender, "signature mismatch");
            Ok(None)
        }
    }

    /// Fans out per member. The signature covers the shared ciphertext, so
    /// every copy keeps it.
    pub fn split(&self, members: &[ID]) -> Vec<ReliableMessage> {
        self.secure
            .split(members)
            .into_iter()
            .map(|secure| self.with_secure(secure))
            .collect()
    }

    pub fn trim(&self, member: &ID) -> ReliableMessage {
        self.with_secure(self.secure.trim(member))
    }

    fn with_secure(&self, secure: SecureMessage) -> Self {
        Self {
            secure,
            signature: self.signature.clone(),
            meta: self.meta.clone(),
            visa: self.visa.clone(),
        }
    }
}
