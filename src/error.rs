/// Errors that can occur while parsing or transforming messages.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("Format error: {0}")]
    Format(String),

    /// A delegate failed to serialize, encrypt, decrypt or encode.
    #[error("Delegate failure: {0}")]
    Delegate(String),

    /// A cryptographic primitive failed.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// The sender's signing key could not produce a signature.
    #[error("Signature unavailable for {0}")]
    SignatureUnavailable(String),

    /// No symmetric key could be resolved to decrypt the content.
    #[error("No session key for message from {sender} to {receiver}")]
    NoKey { sender: String, receiver: String },

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,

    /// Serialization or deserialization failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),
}

impl Error {
    pub(crate) fn missing(field: &str) -> Self {
        Self::Format(format!("missing field '{field}'"))
    }

    pub(crate) fn invalid(field: &str, expected: &str) -> Self {
        Self::Format(format!("field '{field}' is not {expected}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(value: base64::DecodeError) -> Self {
        Self::Format(value.to_string())
    }
}

#[cfg(feature = "keyring")]
impl From<aes_gcm_siv::Error> for Error {
    fn from(value: aes_gcm_siv::Error) -> Self {
        Self::Crypto(value.to_string())
    }
}
