//! Capability boundary between the message core and the outside world.
//!
//! The core never touches a cipher, a key store or a network socket. Every
//! transition takes one of these delegates by reference and calls into it for
//! serialization, encryption, signing and transport encoding. Encoding and
//! serialization have JSON/base64 defaults; the cryptographic calls are left
//! to the implementor.
//!
//! Every call also receives the message being transformed, for context only.

use crate::record::{self, decode_base64, encode_base64};
use crate::{
    Content, Error, ID, InstantMessage, Registry, ReliableMessage, SecureMessage, SymmetricKey,
};

/// Calls made while encrypting an instant message.
pub trait InstantMessageDelegate {
    /// Uploads already-encrypted file bytes out of band.
    ///
    /// Returns the download URL, or `None` to keep the data in memory.
    fn upload_file_data(
        &self,
        _data: &[u8],
        _msg: &InstantMessage,
    ) -> Result<Option<String>, Error> {
        Ok(None)
    }

    fn serialize_content(
        &self,
        content: &Content,
        _password: &SymmetricKey,
        _msg: &InstantMessage,
    ) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(&content.to_record())?)
    }

    fn encrypt_content(
        &self,
        data: &[u8],
        password: &SymmetricKey,
        msg: &InstantMessage,
    ) -> Result<Vec<u8>, Error>;

    fn encode_data(&self, data: &[u8], _msg: &InstantMessage) -> Result<String, Error> {
        Ok(encode_base64(data))
    }

    /// `None` means the key is reused or broadcast and is not sent at all.
    fn serialize_key(
        &self,
        password: &SymmetricKey,
        _msg: &InstantMessage,
    ) -> Result<Option<Vec<u8>>, Error> {
        Ok(Some(serde_json::to_vec(&password.to_record())?))
    }

    /// Wraps the serialized key for `receiver`.
    ///
    /// `None` means the receiver's public key is unavailable; that receiver is
    /// left out of the message.
    fn encrypt_key(
        &self,
        data: &[u8],
        receiver: &ID,
        msg: &InstantMessage,
    ) -> Result<Option<Vec<u8>>, Error>;

    fn encode_key(&self, data: &[u8], _msg: &InstantMessage) -> Result<String, Error> {
        Ok(encode_base64(data))
    }
}

/// Calls made while decrypting or signing a secure message.
pub trait SecureMessageDelegate {
    fn decode_key(&self, key: &str, _msg: &SecureMessage) -> Result<Vec<u8>, Error> {
        decode_base64(key)
    }

    /// Unwraps a key with the private key of `receiver`.
    fn decrypt_key(
        &self,
        key: &[u8],
        sender: &ID,
        receiver: &ID,
        msg: &SecureMessage,
    ) -> Result<Vec<u8>, Error>;

    /// Turns key bytes into a symmetric key.
    ///
    /// `key` is `None` when the message carried no wrapped key for this
    /// receiver; the delegate may then look up a reused key for the
    /// `sender` → `receiver` conversation (`receiver` is the group for group
    /// messages). `None` means no key could be resolved.
    fn deserialize_key(
        &self,
        key: Option<&[u8]>,
        _sender: &ID,
        _receiver: &ID,
        _msg: &SecureMessage,
    ) -> Result<Option<SymmetricKey>, Error> {
        match key {
            None => Ok(None),
            Some(bytes) => SymmetricKey::parse(&record::parse_json(bytes)?).map(Some),
        }
    }

    fn decode_data(&self, data: &str, _msg: &SecureMessage) -> Result<Vec<u8>, Error> {
        decode_base64(data)
    }

    fn decrypt_content(
        &self,
        data: &[u8],
        password: &SymmetricKey,
        msg: &SecureMessage,
    ) -> Result<Vec<u8>, Error>;

    fn deserialize_content(
        &self,
        data: &[u8],
        _password: &SymmetricKey,
        _msg: &SecureMessage,
        registry: &Registry,
    ) -> Result<Content, Error> {
        registry.parse_content(&record::parse_json(data)?)
    }

    /// Signs the encrypted content bytes with the sender's private key.
    ///
    /// `None` means the sender's signing key is unavailable.
    fn sign_data(
        &self,
        data: &[u8],
        sender: &ID,
        msg: &SecureMessage,
    ) -> Result<Option<Vec<u8>>, Error>;

    fn encode_signature(&self, signature: &[u8], _msg: &SecureMessage) -> Result<String, Error> {
        Ok(encode_base64(signature))
    }
}

/// Calls made while verifying a reliable message.
pub trait ReliableMessageDelegate: SecureMessageDelegate {
    fn decode_signature(
        &self,
        signature: &str,
        _msg: &ReliableMessage,
    ) -> Result<Vec<u8>, Error> {
        decode_base64(signature)
    }

    /// Never fails: `false` is a mismatch or an unknown sender key.
    fn verify_data_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        sender: &ID,
        msg: &ReliableMessage,
    ) -> bool;
}
