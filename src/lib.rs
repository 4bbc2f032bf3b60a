//! Decentralized instant messaging protocol core.
//!
//! Messages move through three states. An [`InstantMessage`] is plaintext, a
//! [`SecureMessage`] carries encrypted content with wrapped keys, and a
//! [`ReliableMessage`] adds the sender's signature. All cryptography is
//! reached through the delegate traits; [`Keyring`] is a complete in-memory
//! delegate.

mod id;
pub use id::ID;

pub mod record;
pub use record::{Record, Timestamp};

mod envelope;
pub use envelope::Envelope;

mod key;
pub use key::SymmetricKey;

mod content;
pub use content::*;

mod delegate;
pub use delegate::*;

mod message;
pub use message::*;

mod registry;
pub use registry::*;

mod error;
pub use error::Error;

mod config;
pub use config::MessageConfig;

#[cfg(feature = "keyring")]
mod keyring;
#[cfg(feature = "keyring")]
pub use keyring::*;
