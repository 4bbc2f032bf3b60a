use crate::record::{self, Record};
use crate::{
    ContentBody, Envelope, Error, ID, InstantMessage, MessageConfig, Registry, ReliableMessage,
    SecureMessageDelegate,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// An encrypted message.
///
/// `data`, `key` and every entry of `keys` are held in their transport
/// encoding, exactly as they appear on the wire; the delegate decodes them
/// when a transition needs the raw bytes. `key` (one recipient) and `keys`
/// (group members) never coexist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecureMessage {
    envelope: Envelope,
    data: String,
    key: Option<String>,
    keys: Option<BTreeMap<ID, String>>,
}

impl SecureMessage {
    pub fn new(
        envelope: Envelope,
        data: String,
        key: Option<String>,
        keys: Option<BTreeMap<ID, String>>,
    ) -> Result<Self, Error> {
        if key.is_some() && keys.is_some() {
            return Err(Error::Format(
                "'key' and 'keys' are mutually exclusive".to_string(),
            ));
        }
        Ok(Self::from_parts(envelope, data, key, keys))
    }

    pub(crate) fn from_parts(
        envelope: Envelope,
        data: String,
        key: Option<String>,
        keys: Option<BTreeMap<ID, String>>,
    ) -> Self {
        Self {
            envelope,
            data,
            key,
            keys,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn keys(&self) -> Option<&BTreeMap<ID, String>> {
        self.keys.as_ref()
    }

    pub fn parse(record: &Record, registry: &Registry) -> Result<Self, Error> {
        let envelope = registry.parse_envelope(record)?;
        let data = record::require_str(record, "data")?.to_string();
        let key = record::get_str(record, "key")?.map(str::to_string);
        let keys = match record::get_record(record, "keys")? {
            None => None,
            Some(map) => {
                let mut keys = BTreeMap::new();
                for (member, value) in map {
                    let Value::String(wrapped) = value else {
                        return Err(Error::invalid("keys", "a map of strings"));
                    };
                    keys.insert(member.parse::<ID>()?, wrapped.clone());
                }
                Some(keys)
            }
        };
        Self::new(envelope, data, key, keys)
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.envelope.to_record();
        self.write_to(&mut record);
        record
    }

    pub(crate) fn write_to(&self, record: &mut Record) {
        record::put(record, "data", Some(self.data.as_str()));
        record::put(record, "key", self.key.as_deref());
        let keys = self.keys.as_ref().map(|keys| {
            keys.iter()
                .map(|(member, key)| (member.to_string(), Value::from(key.as_str())))
                .collect::<Record>()
        });
        record::put(record, "keys", keys);
    }

    /// Decrypts the content with default settings.
    pub fn decrypt<D>(
        &self,
        for_member: Option<&ID>,
        delegate: &D,
        registry: &Registry,
    ) -> Result<InstantMessage, Error>
    where
        D: SecureMessageDelegate + ?Sized,
    {
        self.decrypt_with(for_member, delegate, registry, &MessageConfig::default())
    }

    /// Decrypts the content for the receiver, or for `for_member` when this
    /// message was addressed to a group.
    ///
    /// A missing wrapped key is not fatal by itself: the delegate is asked to
    /// resolve the key from elsewhere and only its failure yields
    /// [`Error::NoKey`].
    pub fn decrypt_with<D>(
        &self,
        for_member: Option<&ID>,
        delegate: &D,
        registry: &Registry,
        config: &MessageConfig,
    ) -> Result<InstantMessage, Error>
    where
        D: SecureMessageDelegate + ?Sized,
    {
        let envelope = match for_member {
            None => self.envelope.clone(),
            Some(member) if member == self.envelope.receiver() => {
                if self.envelope.group().is_none() {
                    return Err(Error::Format(format!(
                        "member {member} cannot decrypt as the group itself"
                    )));
                }
                self.envelope.clone()
            }
            Some(member) => self.envelope.for_member(member),
        };
        let sender = envelope.sender();
        let decryptor = envelope.receiver();
        let conversation = envelope.group().unwrap_or(decryptor);

        let wrapped = match (&self.key, &self.keys) {
            (Some(key), _) => Some(key.as_str()),
            (None, Some(keys)) => keys.get(decryptor).map(String::as_str),
            (None, None) => None,
        };
        let key_data = match wrapped {
            Some(encoded) => {
                let bytes = delegate.decode_key(encoded, self)?;
                Some(delegate.decrypt_key(&bytes, sender, decryptor, self)?)
            }
            None => None,
        };
        let password = delegate
            .deserialize_key(key_data.as_deref(), sender, conversation, self)?
            .ok_or_else(|| Error::NoKey {
                sender: sender.to_string(),
                receiver: decryptor.to_string(),
            })?;

        let ciphertext = delegate.decode_data(&self.data, self)?;
        let plaintext = delegate.decrypt_content(&ciphertext, &password, self)?;
        let mut content = delegate.deserialize_content(&plaintext, &password, self, registry)?;

        if config.attach_file_password {
            if let ContentBody::File(file) = content.body_mut() {
                if file.is_remote_only() {
                    file.password = Some(password.clone());
                }
            }
        }

        debug!(
            sender = %sender,
            receiver = %decryptor,
            group = ?envelope.group().map(ID::as_str),
            content_type = %content.content_type(),
            "decrypted secure message"
        );
        Ok(InstantMessage::new(envelope, content))
    }

    /// Signs the encrypted data with the sender's private key.
    pub fn sign<D>(&self, delegate: &D) -> Result<ReliableMessage, Error>
    where
        D: SecureMessageDelegate + ?Sized,
    {
        let sender = self.envelope.sender();
        let data = delegate.decode_data(&self.data, self)?;
        let signature = delegate
            .sign_data(&data, sender, self)?
            .ok_or_else(|| Error::SignatureUnavailable(sender.to_string()))?;
        let signature = delegate.encode_signature(&signature, self)?;

        debug!(sender = %sender, receiver = %self.envelope.receiver(), "signed secure message");
        Ok(ReliableMessage::from_parts(self.clone(), signature))
    }

    /// Fans a group message out into one copy per member.
    ///
    /// Each copy is addressed to its member, remembers the group, and carries
    /// that member's wrapped key (or none).
    pub fn split(&self, members: &[ID]) -> Vec<SecureMessage> {
        members
            .iter()
            .map(|member| {
                let key = self.keys.as_ref().and_then(|keys| keys.get(member)).cloned();
                self.copy_for(member, key)
            })
            .collect()
    }

    /// Narrows a group message down to one member's copy.
    ///
    /// Without a `keys` map an existing `key` is kept, so trimming an already
    /// trimmed message is a no-op apart from the receiver.
    pub fn trim(&self, member: &ID) -> SecureMessage {
        let key = match &self.keys {
            Some(keys) => keys.get(member).cloned(),
            None => self.key.clone(),
        };
        self.copy_for(member, key)
    }

    fn copy_for(&self, member: &ID, key: Option<String>) -> SecureMessage {
        Self {
            envelope: self.envelope.for_member(member),
            data: self.data.clone(),
            key,
            keys: None,
        }
    }
}
