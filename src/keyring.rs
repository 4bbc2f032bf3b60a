//! An in-memory reference delegate.
//!
//! Contents are sealed with AES-256-GCM-SIV under the message password. The
//! password is wrapped per recipient with an ephemeral X25519 agreement, HKDF
//! and AES-256-GCM-SIV. Senders sign the encrypted data with Ed25519.
//!
//! Wrapped key layout: `ephemeral public (32) || nonce (12) || ciphertext`.
//! Sealed content layout: `nonce (12) || ciphertext`.

use crate::record::{self, Record};
use crate::{
    Error, ID, InstantMessage, InstantMessageDelegate, ReliableMessage, ReliableMessageDelegate,
    SecureMessage, SecureMessageDelegate, SymmetricKey,
};
use aes_gcm_siv::aead::Aead;
use aes_gcm_siv::{Aes256GcmSiv, KeyInit, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use hkdf::Hkdf;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// Algorithm name carried by passwords this keyring creates and accepts.
pub const PASSWORD_ALGORITHM: &str = "AES-256-GCM-SIV";

const NONCE_SIZE: usize = 12;
const KEY_WRAP_INFO: &[u8] = b"DIMP-Key-Wrap-v1";

fn random_bytes<const N: usize>() -> Result<[u8; N], Error> {
    let mut bytes = [0u8; N];
    OsRng.try_fill_bytes(&mut bytes).map_err(|_| Error::Random)?;
    Ok(bytes)
}

fn cipher(key: &[u8]) -> Result<Aes256GcmSiv, Error> {
    Aes256GcmSiv::new_from_slice(key)
        .map_err(|_| Error::Crypto(format!("expected a 32-byte key, got {} bytes", key.len())))
}

fn seal(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let nonce = random_bytes::<NONCE_SIZE>()?;
    let mut ciphertext = cipher(key)?.encrypt(Nonce::from_slice(&nonce), plaintext)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.append(&mut ciphertext);
    Ok(sealed)
}

fn open(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, Error> {
    if sealed.len() < NONCE_SIZE {
        return Err(Error::Crypto("sealed data too short".to_string()));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    Ok(cipher(key)?.decrypt(Nonce::from_slice(nonce), ciphertext)?)
}

fn wrap_key(shared_secret: &[u8; 32]) -> Result<[u8; 32], Error> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; 32];
    hkdf.expand(KEY_WRAP_INFO, &mut okm)
        .map_err(|_| Error::Crypto("HKDF expansion failed".to_string()))?;
    Ok(okm)
}

fn array32(bytes: &[u8], what: &str) -> Result<[u8; 32], Error> {
    bytes
        .try_into()
        .map_err(|_| Error::Format(format!("{what} must be 32 bytes")))
}

/// A private identity: an Ed25519 signing key and an X25519 agreement key,
/// both derived from one seed.
pub struct Identity {
    signing_key: SigningKey,
    dh_key: StaticSecret,
}

impl Identity {
    pub fn generate() -> Result<Self, Error> {
        let mut seed = random_bytes::<32>()?;
        let identity = Self::from_seed(&seed);
        seed.zeroize();
        Ok(identity)
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
            dh_key: StaticSecret::from(*seed),
        }
    }

    /// The public half, for publishing to contacts.
    pub fn visa(&self) -> Visa {
        Visa {
            verifying_key: self.signing_key.verifying_key(),
            dh_public: PublicKey::from(&self.dh_key),
        }
    }

    fn sign(&self, data: &[u8]) -> Signature {
        self.signing_key.sign(data)
    }

    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Vec<u8>, Error> {
        if wrapped.len() < 32 {
            return Err(Error::Crypto("wrapped key too short".to_string()));
        }
        let (ephemeral, sealed) = wrapped.split_at(32);
        let ephemeral = PublicKey::from(array32(ephemeral, "ephemeral key")?);
        let shared = self.dh_key.diffie_hellman(&ephemeral);
        let mut key = wrap_key(shared.as_bytes())?;
        let result = open(&key, sealed);
        key.zeroize();
        result
    }
}

/// Public credentials of an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visa {
    verifying_key: VerifyingKey,
    dh_public: PublicKey,
}

impl Visa {
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn dh_public(&self) -> &PublicKey {
        &self.dh_public
    }

    pub fn parse(record: &Record) -> Result<Self, Error> {
        let key = record::get_bytes(record, "key")?.ok_or_else(|| Error::missing("key"))?;
        let dh = record::get_bytes(record, "dh")?.ok_or_else(|| Error::missing("dh"))?;
        let verifying_key = VerifyingKey::from_bytes(&array32(&key, "key")?)
            .map_err(|err| Error::Format(err.to_string()))?;
        Ok(Self {
            verifying_key,
            dh_public: PublicKey::from(array32(&dh, "dh")?),
        })
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        let key = self.verifying_key.as_bytes();
        record::put_bytes(&mut record, "key", Some(key.as_slice()));
        record::put_bytes(&mut record, "dh", Some(self.dh_public.as_bytes().as_slice()));
        record
    }

    fn wrap(&self, key: &[u8]) -> Result<Vec<u8>, Error> {
        let ephemeral = StaticSecret::from(random_bytes::<32>()?);
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&self.dh_public);
        let mut wrapping_key = wrap_key(shared.as_bytes())?;
        let sealed = seal(&wrapping_key, key);
        wrapping_key.zeroize();

        let sealed = sealed?;
        let mut wrapped = Vec::with_capacity(32 + sealed.len());
        wrapped.extend_from_slice(ephemeral_public.as_bytes());
        wrapped.extend_from_slice(&sealed);
        Ok(wrapped)
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.verifying_key.verify_strict(data, &signature).is_ok()
    }
}

/// Holds local identities, contacts' visas and reused session keys, and
/// implements every delegate trait with them.
#[derive(Default)]
pub struct Keyring {
    identities: HashMap<ID, Identity>,
    contacts: HashMap<ID, Visa>,
    broadcast: HashSet<ID>,
    // (sender, receiver or group) -> password
    session_keys: Mutex<HashMap<(ID, ID), SymmetricKey>>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates and stores a fresh identity for `id`.
    pub fn create_identity(&mut self, id: ID) -> Result<Visa, Error> {
        let identity = Identity::generate()?;
        let visa = identity.visa();
        self.identities.insert(id, identity);
        Ok(visa)
    }

    pub fn add_identity(&mut self, id: ID, identity: Identity) {
        self.identities.insert(id, identity);
    }

    pub fn add_contact(&mut self, id: ID, visa: Visa) {
        self.contacts.insert(id, visa);
    }

    /// Messages to `receiver` travel without wrapped keys; receivers resolve
    /// the password from their own session key store.
    pub fn add_broadcast(&mut self, receiver: ID) {
        self.broadcast.insert(receiver);
    }

    pub fn visa(&self, id: &ID) -> Option<Visa> {
        self.identities
            .get(id)
            .map(Identity::visa)
            .or_else(|| self.contacts.get(id).copied())
    }

    /// Stores the password used between `sender` and `receiver` (a group for
    /// group messages).
    pub fn remember_key(&self, sender: ID, receiver: ID, password: SymmetricKey) {
        self.session_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((sender, receiver), password);
    }

    fn session_key(&self, sender: &ID, receiver: &ID) -> Option<SymmetricKey> {
        self.session_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(sender.clone(), receiver.clone()))
            .cloned()
    }

    /// A random password for one message.
    pub fn generate_password() -> Result<SymmetricKey, Error> {
        Ok(SymmetricKey::new(
            PASSWORD_ALGORITHM,
            random_bytes::<32>()?.to_vec(),
        ))
    }

    fn check_algorithm(password: &SymmetricKey) -> Result<(), Error> {
        if password.algorithm() != PASSWORD_ALGORITHM {
            return Err(Error::Crypto(format!(
                "unsupported password algorithm {}",
                password.algorithm()
            )));
        }
        Ok(())
    }
}

impl InstantMessageDelegate for Keyring {
    fn encrypt_content(
        &self,
        data: &[u8],
        password: &SymmetricKey,
        _msg: &InstantMessage,
    ) -> Result<Vec<u8>, Error> {
        Self::check_algorithm(password)?;
        seal(password.data(), data)
    }

    fn serialize_key(
        &self,
        password: &SymmetricKey,
        msg: &InstantMessage,
    ) -> Result<Option<Vec<u8>>, Error> {
        if self.broadcast.contains(msg.envelope().receiver()) {
            return Ok(None);
        }
        Ok(Some(serde_json::to_vec(&password.to_record())?))
    }

    fn encrypt_key(
        &self,
        data: &[u8],
        receiver: &ID,
        _msg: &InstantMessage,
    ) -> Result<Option<Vec<u8>>, Error> {
        match self.visa(receiver) {
            Some(visa) => visa.wrap(data).map(Some),
            None => Ok(None),
        }
    }
}

impl SecureMessageDelegate for Keyring {
    fn decrypt_key(
        &self,
        key: &[u8],
        _sender: &ID,
        receiver: &ID,
        _msg: &SecureMessage,
    ) -> Result<Vec<u8>, Error> {
        self.identities
            .get(receiver)
            .ok_or_else(|| Error::Crypto(format!("no private key for {receiver}")))?
            .unwrap_key(key)
    }

    fn deserialize_key(
        &self,
        key: Option<&[u8]>,
        sender: &ID,
        receiver: &ID,
        _msg: &SecureMessage,
    ) -> Result<Option<SymmetricKey>, Error> {
        match key {
            Some(bytes) => {
                let password = SymmetricKey::parse(&record::parse_json(bytes)?)?;
                self.remember_key(sender.clone(), receiver.clone(), password.clone());
                Ok(Some(password))
            }
            None => Ok(self.session_key(sender, receiver)),
        }
    }

    fn decrypt_content(
        &self,
        data: &[u8],
        password: &SymmetricKey,
        _msg: &SecureMessage,
    ) -> Result<Vec<u8>, Error> {
        Self::check_algorithm(password)?;
        open(password.data(), data)
    }

    fn sign_data(
        &self,
        data: &[u8],
        sender: &ID,
        _msg: &SecureMessage,
    ) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .identities
            .get(sender)
            .map(|identity| identity.sign(data).to_bytes().to_vec()))
    }
}

impl ReliableMessageDelegate for Keyring {
    fn verify_data_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        sender: &ID,
        _msg: &ReliableMessage,
    ) -> bool {
        // An attached visa is never trusted here; the caller vets it and
        // registers it with `add_contact` first.
        self.visa(sender)
            .is_some_and(|visa| visa.verify(data, signature))
    }
}
