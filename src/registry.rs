//! Parsers for contents, envelopes and messages.
//!
//! A [`Registry`] is assembled once with a [`RegistryBuilder`] while the
//! process starts up and is read-only afterwards, so it can be shared between
//! threads without locking. Content parsers are keyed by the exact type code;
//! codes without a parser go to the fallback, which by default keeps every
//! field as an unknown content.

use crate::record::{self, Record};
use crate::{
    Command, Content, ContentBody, ContentHeader, ContentType, Envelope, Error, FileContent,
    HistoryCommand, InstantMessage, Message, MessageKind, MoneyContent, PageContent,
    ReliableMessage, SecureMessage,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

/// Builds a content body from the record left after the header is stripped.
/// Parsers remove the fields they consume; whatever remains is kept as extra
/// fields of the content.
pub type ContentParser = fn(&ContentHeader, &mut Record, &Registry) -> Result<ContentBody, Error>;
pub type EnvelopeParser = fn(&Record) -> Result<Envelope, Error>;
pub type InstantParser = fn(&Record, &Registry) -> Result<InstantMessage, Error>;
pub type SecureParser = fn(&Record, &Registry) -> Result<SecureMessage, Error>;
pub type ReliableParser = fn(&Record, &Registry) -> Result<ReliableMessage, Error>;

/// Read-only parser tables.
#[derive(Clone)]
pub struct Registry {
    contents: HashMap<u32, ContentParser>,
    fallback: ContentParser,
    envelope: EnvelopeParser,
    instant: InstantParser,
    secure: SecureParser,
    reliable: ReliableParser,
}

impl Default for Registry {
    fn default() -> Self {
        RegistryBuilder::new().build()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// True if `content_type` has its own parser.
    pub fn is_registered(&self, content_type: ContentType) -> bool {
        self.contents.contains_key(&content_type.code())
    }

    /// Parses a content record. Unknown type codes never fail; they go to the
    /// fallback parser.
    pub fn parse_content(&self, record: &Record) -> Result<Content, Error> {
        let (header, mut rest) = Content::parse_header(record)?;
        let parser = match self.contents.get(&header.content_type.code()) {
            Some(parser) => *parser,
            None => {
                trace!(content_type = %header.content_type, "no parser registered, using fallback");
                self.fallback
            }
        };
        let body = parser(&header, &mut rest, self)?;
        Ok(Content::assemble(header, body, rest))
    }

    pub fn parse_envelope(&self, record: &Record) -> Result<Envelope, Error> {
        (self.envelope)(record)
    }

    pub fn parse_instant(&self, record: &Record) -> Result<InstantMessage, Error> {
        (self.instant)(record, self)
    }

    pub fn parse_secure(&self, record: &Record) -> Result<SecureMessage, Error> {
        (self.secure)(record, self)
    }

    pub fn parse_reliable(&self, record: &Record) -> Result<ReliableMessage, Error> {
        (self.reliable)(record, self)
    }

    /// Parses a message in whichever state its fields indicate.
    pub fn parse_message(&self, record: &Record) -> Result<Message, Error> {
        let msg = match MessageKind::detect(record)? {
            MessageKind::Instant => Message::Instant(self.parse_instant(record)?),
            MessageKind::Secure => Message::Secure(self.parse_secure(record)?),
            MessageKind::Reliable => Message::Reliable(self.parse_reliable(record)?),
        };
        Ok(msg)
    }

    /// Parses raw JSON bytes as a message.
    pub fn parse_json(&self, bytes: &[u8]) -> Result<Message, Error> {
        self.parse_message(&record::parse_json(bytes)?)
    }
}

/// Collects parsers before freezing them into a [`Registry`].
pub struct RegistryBuilder {
    registry: Registry,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Starts from the built-in parsers.
    pub fn new() -> Self {
        let mut contents: HashMap<u32, ContentParser> = HashMap::new();
        contents.insert(ContentType::TEXT.code(), parse_text);
        for file_type in [
            ContentType::FILE,
            ContentType::IMAGE,
            ContentType::AUDIO,
            ContentType::VIDEO,
        ] {
            contents.insert(file_type.code(), parse_file);
        }
        contents.insert(ContentType::PAGE.code(), parse_page);
        contents.insert(ContentType::MONEY.code(), parse_money);
        contents.insert(ContentType::TRANSFER.code(), parse_money);
        contents.insert(ContentType::COMMAND.code(), parse_command);
        contents.insert(ContentType::HISTORY.code(), parse_history);
        contents.insert(ContentType::ARRAY.code(), parse_array);
        contents.insert(ContentType::FORWARD.code(), parse_forward);

        Self {
            registry: Registry {
                contents,
                fallback: parse_unknown,
                envelope: Envelope::parse,
                instant: InstantMessage::parse,
                secure: SecureMessage::parse,
                reliable: ReliableMessage::parse,
            },
        }
    }

    /// Registers or replaces the parser for one content type code.
    pub fn content(mut self, content_type: ContentType, parser: ContentParser) -> Self {
        self.registry.contents.insert(content_type.code(), parser);
        self
    }

    /// Replaces the parser used for unregistered content types.
    pub fn fallback(mut self, parser: ContentParser) -> Self {
        self.registry.fallback = parser;
        self
    }

    pub fn envelope(mut self, parser: EnvelopeParser) -> Self {
        self.registry.envelope = parser;
        self
    }

    pub fn instant(mut self, parser: InstantParser) -> Self {
        self.registry.instant = parser;
        self
    }

    pub fn secure(mut self, parser: SecureParser) -> Self {
        self.registry.secure = parser;
        self
    }

    pub fn reliable(mut self, parser: ReliableParser) -> Self {
        self.registry.reliable = parser;
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}

fn parse_text(_: &ContentHeader, record: &mut Record, _: &Registry) -> Result<ContentBody, Error> {
    let text = record::require_str(record, "text")?.to_string();
    record.remove("text");
    Ok(ContentBody::Text(text))
}

fn parse_file(_: &ContentHeader, record: &mut Record, _: &Registry) -> Result<ContentBody, Error> {
    FileContent::parse(record).map(ContentBody::File)
}

fn parse_page(_: &ContentHeader, record: &mut Record, _: &Registry) -> Result<ContentBody, Error> {
    PageContent::parse(record).map(ContentBody::Page)
}

fn parse_money(_: &ContentHeader, record: &mut Record, _: &Registry) -> Result<ContentBody, Error> {
    MoneyContent::parse(record).map(ContentBody::Money)
}

fn parse_command(
    _: &ContentHeader,
    record: &mut Record,
    _: &Registry,
) -> Result<ContentBody, Error> {
    Command::parse(record).map(ContentBody::Command)
}

fn parse_history(
    header: &ContentHeader,
    record: &mut Record,
    _: &Registry,
) -> Result<ContentBody, Error> {
    if header.time.is_none() {
        return Err(Error::missing("time"));
    }
    HistoryCommand::parse(record).map(ContentBody::History)
}

fn parse_array(
    _: &ContentHeader,
    record: &mut Record,
    registry: &Registry,
) -> Result<ContentBody, Error> {
    let Some(Value::Array(items)) = record.remove("contents") else {
        return Err(Error::missing("contents"));
    };
    let contents = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => registry.parse_content(map),
            _ => Err(Error::invalid("contents", "a list of content records")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ContentBody::Array(contents))
}

fn parse_forward(
    _: &ContentHeader,
    record: &mut Record,
    registry: &Registry,
) -> Result<ContentBody, Error> {
    let msg = record::get_record(record, "forward")?.ok_or_else(|| Error::missing("forward"))?;
    let msg = registry.parse_reliable(msg)?;
    record.remove("forward");
    Ok(ContentBody::Forward(Box::new(msg)))
}

fn parse_unknown(_: &ContentHeader, _: &mut Record, _: &Registry) -> Result<ContentBody, Error> {
    Ok(ContentBody::Unknown)
}
