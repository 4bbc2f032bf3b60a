use crate::record::{self, Record};
use crate::{
    Content, Envelope, Error, ID, InstantMessageDelegate, MessageConfig, Registry, SecureMessage,
    SymmetricKey,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A plaintext message: envelope plus content.
#[derive(Clone, Debug, PartialEq)]
pub struct InstantMessage {
    envelope: Envelope,
    content: Content,
}

impl InstantMessage {
    /// Pairs an envelope with its content. The envelope is kept as given; the
    /// type hint is stamped on encryption.
    pub fn new(envelope: Envelope, content: Content) -> Self {
        Self { envelope, content }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn into_parts(self) -> (Envelope, Content) {
        (self.envelope, self.content)
    }

    pub fn parse(record: &Record, registry: &Registry) -> Result<Self, Error> {
        let envelope = registry.parse_envelope(record)?;
        let content = record::get_record(record, "content")?
            .ok_or_else(|| Error::missing("content"))?;
        Ok(Self {
            envelope,
            content: registry.parse_content(content)?,
        })
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.envelope.to_record();
        record::put(&mut record, "content", Some(self.content.to_record()));
        record
    }

    /// Encrypts the content with `password` and wraps the password for the
    /// receiver, or for every one of `members` when this is a group message.
    pub fn encrypt<D>(
        &self,
        password: &SymmetricKey,
        members: Option<&[ID]>,
        delegate: &D,
    ) -> Result<SecureMessage, Error>
    where
        D: InstantMessageDelegate + ?Sized,
    {
        self.encrypt_with(password, members, delegate, &MessageConfig::default())
    }

    /// Same as [`InstantMessage::encrypt`] with explicit settings.
    ///
    /// Only content serialization and encryption failures are fatal. A
    /// recipient whose key cannot be wrapped is left out with a warning.
    pub fn encrypt_with<D>(
        &self,
        password: &SymmetricKey,
        members: Option<&[ID]>,
        delegate: &D,
        config: &MessageConfig,
    ) -> Result<SecureMessage, Error>
    where
        D: InstantMessageDelegate + ?Sized,
    {
        let content = self.upload_file(password, delegate)?;

        let plaintext = delegate.serialize_content(&content, password, self)?;
        let ciphertext = delegate.encrypt_content(&plaintext, password, self)?;
        let data = delegate.encode_data(&ciphertext, self)?;

        let mut envelope = self.envelope.clone();
        if config.stamp_type_hint && envelope.type_hint().is_none() {
            envelope.set_type_hint(Some(content.content_type().code()));
        }

        let key_data = delegate.serialize_key(password, self)?;
        let secure = match members {
            None => {
                let key = key_data
                    .as_deref()
                    .and_then(|bytes| self.wrap_key(bytes, self.envelope.receiver(), delegate));
                SecureMessage::from_parts(envelope, data, key, None)
            }
            Some(members) => {
                let mut keys = BTreeMap::new();
                if let Some(bytes) = key_data.as_deref() {
                    for member in members {
                        if let Some(key) = self.wrap_key(bytes, member, delegate) {
                            keys.insert(member.clone(), key);
                        }
                    }
                }
                if envelope.group().is_none() {
                    envelope.set_group(Some(self.envelope.receiver().clone()));
                }
                let keys = (!keys.is_empty()).then_some(keys);
                SecureMessage::from_parts(envelope, data, None, keys)
            }
        };

        debug!(
            sender = %self.envelope.sender(),
            receiver = %self.envelope.receiver(),
            content_type = %self.content.content_type(),
            members = members.map(<[ID]>::len),
            "encrypted instant message"
        );
        Ok(secure)
    }

    /// Encrypts and uploads inline file data, replacing it with the URL.
    fn upload_file<D>(&self, password: &SymmetricKey, delegate: &D) -> Result<Content, Error>
    where
        D: InstantMessageDelegate + ?Sized,
    {
        let mut content = self.content.clone();
        if let Some(file) = content.as_file_mut() {
            if let Some(data) = file.data.take() {
                let encrypted = delegate.encrypt_content(&data, password, self)?;
                match delegate.upload_file_data(&encrypted, self)? {
                    Some(url) => {
                        debug!(url = %url, size = data.len(), "uploaded file data");
                        file.url = Some(url);
                    }
                    None => file.data = Some(data),
                }
            }
        }
        Ok(content)
    }

    fn wrap_key<D>(&self, key: &[u8], receiver: &ID, delegate: &D) -> Option<String>
    where
        D: InstantMessageDelegate + ?Sized,
    {
        let wrapped = match delegate.encrypt_key(key, receiver, self) {
            Ok(Some(wrapped)) => wrapped,
            Ok(None) => {
                warn!(receiver = %receiver, "public key unavailable, receiver skipped");
                return None;
            }
            Err(err) => {
                warn!(receiver = %receiver, error = %err, "key wrap failed, receiver skipped");
                return None;
            }
        };
        match delegate.encode_key(&wrapped, self) {
            Ok(encoded) => Some(encoded),
            Err(err) => {
                warn!(receiver = %receiver, error = %err, "key encoding failed, receiver skipped");
                None
            }
        }
    }
}
