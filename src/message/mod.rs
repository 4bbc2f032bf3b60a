//! The three message states and the transitions between them.
//!
//! ```text
//!  InstantMessage --encrypt--> SecureMessage --sign--> ReliableMessage
//!  InstantMessage <--decrypt-- SecureMessage <--verify-- ReliableMessage
//! ```
//!
//! Every transition borrows its input and returns a new value. Group
//! messages fan out with `split` and fan in with `trim`.

mod instant;
pub use instant::*;
mod reliable;
pub use reliable::*;
mod secure;
pub use secure::*;

use crate::record::Record;
use crate::{Envelope, Error};

/// Which state a message record is in, judged by its fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Instant,
    Secure,
    Reliable,
}

impl MessageKind {
    /// `content` marks an instant message, `signature` a reliable one and
    /// `data` alone a secure one.
    pub fn detect(record: &Record) -> Result<Self, Error> {
        if record.contains_key("content") {
            Ok(Self::Instant)
        } else if record.contains_key("signature") {
            Ok(Self::Reliable)
        } else if record.contains_key("data") {
            Ok(Self::Secure)
        } else {
            Err(Error::Format(
                "record is neither an instant, secure nor reliable message".to_string(),
            ))
        }
    }
}

/// A message in any state.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Instant(InstantMessage),
    Secure(SecureMessage),
    Reliable(ReliableMessage),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Instant(_) => MessageKind::Instant,
            Self::Secure(_) => MessageKind::Secure,
            Self::Reliable(_) => MessageKind::Reliable,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            Self::Instant(msg) => msg.envelope(),
            Self::Secure(msg) => msg.envelope(),
            Self::Reliable(msg) => msg.envelope(),
        }
    }

    pub fn to_record(&self) -> Record {
        match self {
            Self::Instant(msg) => msg.to_record(),
            Self::Secure(msg) => msg.to_record(),
            Self::Reliable(msg) => msg.to_record(),
        }
    }
}

impl From<InstantMessage> for Message {
    fn from(value: InstantMessage) -> Self {
        Self::Instant(value)
    }
}

impl From<SecureMessage> for Message {
    fn from(value: SecureMessage) -> Self {
        Self::Secure(value)
    }
}

impl From<ReliableMessage> for Message {
    fn from(value: ReliableMessage) -> Self {
        Self::Reliable(value)
    }
}

#[cfg(test)]
mod tests;
