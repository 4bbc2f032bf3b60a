//! Typed message payloads.
//!
//! Every content shares a small header (`type`, `sn`, `time`, `group`) and a
//! variant body. Fields a variant does not understand are kept in `extra` so
//! that a content can be forwarded or re-serialized without losing data.

mod command;
pub use command::*;
mod file;
pub use file::*;
mod kind;
pub use kind::*;
mod page;
pub use page::*;

use crate::record::{self, Record, Timestamp};
use crate::{Error, ID, ReliableMessage};
use serde_json::Value;

/// Used when the random source keeps yielding zero.
const FALLBACK_SERIAL_NUMBER: u64 = 9527;

/// Mints a non-zero serial number. Zero is reserved for "absent".
pub fn serial_number() -> u64 {
    for _ in 0..4 {
        let sn = rand::random::<u64>();
        if sn != 0 {
            return sn;
        }
    }
    FALLBACK_SERIAL_NUMBER
}

/// Variant-specific part of a content.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentBody {
    Text(String),
    /// File, image, audio or video.
    File(FileContent),
    Page(PageContent),
    /// Money or transfer.
    Money(MoneyContent),
    Command(Command),
    History(HistoryCommand),
    Array(Vec<Content>),
    /// A complete reliable message carried through an intermediary.
    Forward(Box<ReliableMessage>),
    /// Unrecognized type: every field lives in `extra`.
    Unknown,
}

impl ContentBody {
    fn write_to(&self, record: &mut Record) {
        match self {
            Self::Text(text) => record::put(record, "text", Some(text.as_str())),
            Self::File(file) => file.write_to(record),
            Self::Page(page) => page.write_to(record),
            Self::Money(money) => money.write_to(record),
            Self::Command(command) => command.write_to(record),
            Self::History(history) => history.write_to(record),
            Self::Array(contents) => {
                let list = contents
                    .iter()
                    .map(|c| Value::Object(c.to_record()))
                    .collect::<Vec<_>>();
                record::put(record, "contents", Some(list));
            }
            Self::Forward(msg) => record::put(record, "forward", Some(msg.to_record())),
            Self::Unknown => {}
        }
    }
}

/// A typed message payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Content {
    content_type: ContentType,
    sn: u64,
    time: Option<Timestamp>,
    group: Option<ID>,
    body: ContentBody,
    extra: Record,
    // header values as received, where they differ from the canonical form
    verbatim: Record,
}

impl Content {
    /// Creates a content with a fresh serial number stamped with the current time.
    pub fn new(content_type: ContentType, body: ContentBody) -> Self {
        Self {
            content_type,
            sn: serial_number(),
            time: Some(record::now()),
            group: None,
            body,
            extra: Record::new(),
            verbatim: Record::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ContentType::TEXT, ContentBody::Text(text.into()))
    }

    pub fn file(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let file = FileContent::new(Some(filename.into()), Some(data));
        Self::new(ContentType::FILE, ContentBody::File(file))
    }

    pub fn image(filename: impl Into<String>, data: Vec<u8>, thumbnail: Option<Vec<u8>>) -> Self {
        let mut file = FileContent::new(Some(filename.into()), Some(data));
        file.thumbnail = thumbnail;
        Self::new(ContentType::IMAGE, ContentBody::File(file))
    }

    pub fn audio(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let file = FileContent::new(Some(filename.into()), Some(data));
        Self::new(ContentType::AUDIO, ContentBody::File(file))
    }

    pub fn video(filename: impl Into<String>, data: Vec<u8>, snapshot: Option<Vec<u8>>) -> Self {
        let mut file = FileContent::new(Some(filename.into()), Some(data));
        file.snapshot = snapshot;
        Self::new(ContentType::VIDEO, ContentBody::File(file))
    }

    pub fn page(url: impl Into<String>, title: Option<String>, desc: Option<String>) -> Self {
        let page = PageContent {
            url: url.into(),
            title,
            desc,
            icon: None,
        };
        Self::new(ContentType::PAGE, ContentBody::Page(page))
    }

    /// Fails when `amount` is NaN or infinite, which JSON cannot carry.
    pub fn money(currency: impl Into<String>, amount: f64) -> Result<Self, Error> {
        let money = MoneyContent::new(currency, amount)?;
        Ok(Self::new(ContentType::MONEY, ContentBody::Money(money)))
    }

    pub fn transfer(currency: impl Into<String>, amount: f64) -> Result<Self, Error> {
        let money = MoneyContent::new(currency, amount)?;
        Ok(Self::new(ContentType::TRANSFER, ContentBody::Money(money)))
    }

    pub fn command(name: impl Into<String>) -> Self {
        let command = Command { name: name.into() };
        Self::new(ContentType::COMMAND, ContentBody::Command(command))
    }

    /// History entries always carry a time; it defaults to now.
    pub fn history(command: HistoryCommand, time: Option<Timestamp>) -> Self {
        let mut content = Self::new(ContentType::HISTORY, ContentBody::History(command));
        if time.is_some() {
            content.time = time;
        }
        content
    }

    pub fn array(contents: Vec<Content>) -> Self {
        Self::new(ContentType::ARRAY, ContentBody::Array(contents))
    }

    pub fn forward(msg: ReliableMessage) -> Self {
        Self::new(ContentType::FORWARD, ContentBody::Forward(Box::new(msg)))
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn serial_number(&self) -> u64 {
        self.sn
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    pub fn group(&self) -> Option<&ID> {
        self.group.as_ref()
    }

    pub fn set_group(&mut self, group: Option<ID>) {
        self.group = group;
    }

    pub fn body(&self) -> &ContentBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut ContentBody {
        &mut self.body
    }

    /// Fields outside the header and the variant body, such as command
    /// parameters or everything of an unknown content.
    pub fn extra(&self) -> &Record {
        &self.extra
    }

    /// Sets a free-form field. Header keys are refused.
    pub fn set_extra(&mut self, key: &str, value: Value) -> Result<(), Error> {
        if HEADER_KEYS.contains(&key) {
            return Err(Error::Format(format!("'{key}' is a header field")));
        }
        self.extra.insert(key.to_string(), value);
        Ok(())
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            ContentBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileContent> {
        match &self.body {
            ContentBody::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileContent> {
        match &mut self.body {
            ContentBody::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match &self.body {
            ContentBody::Command(command) => Some(command),
            _ => None,
        }
    }

    pub fn as_history(&self) -> Option<&HistoryCommand> {
        match &self.body {
            ContentBody::History(history) => Some(history),
            _ => None,
        }
    }

    pub fn as_forward(&self) -> Option<&ReliableMessage> {
        match &self.body {
            ContentBody::Forward(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.extra.clone();
        self.body.write_to(&mut record);
        record::put(&mut record, "type", Some(self.content_type.code()));
        record::put(&mut record, "sn", Some(self.sn));
        record::put(&mut record, "time", self.time);
        record::put(&mut record, "group", self.group.as_ref().map(ID::as_str));
        for (key, value) in &self.verbatim {
            record.insert(key.clone(), value.clone());
        }
        record
    }

    /// Reads the header of a content record and strips it, leaving the
    /// variant fields for the body parser.
    pub(crate) fn parse_header(record: &Record) -> Result<(ContentHeader, Record), Error> {
        let content_type = record::get_u32(record, "type")?.ok_or_else(|| Error::missing("type"))?;
        let sn = match record::get_u64(record, "sn")? {
            None | Some(0) => return Err(Error::missing("sn")),
            Some(sn) => sn,
        };
        let time = record::get_time(record, "time")?;

        // A float time or a numeric string sn is accepted but written back
        // exactly as it came.
        let canonical = [
            ("type", Some(Value::from(content_type))),
            ("sn", Some(Value::from(sn))),
            ("time", time.map(Value::from)),
        ];
        let mut verbatim = Record::new();
        for (key, value) in canonical {
            if let Some(raw) = record.get(key) {
                if Some(raw) != value.as_ref() {
                    verbatim.insert(key.to_string(), raw.clone());
                }
            }
        }

        let header = ContentHeader {
            content_type: ContentType(content_type),
            sn,
            time,
            group: record::get_id(record, "group")?,
            verbatim,
        };
        let mut rest = record.clone();
        for key in HEADER_KEYS {
            rest.remove(key);
        }
        Ok((header, rest))
    }

    pub(crate) fn assemble(header: ContentHeader, body: ContentBody, extra: Record) -> Self {
        Self {
            content_type: header.content_type,
            sn: header.sn,
            time: header.time,
            group: header.group,
            body,
            extra,
            verbatim: header.verbatim,
        }
    }
}

const HEADER_KEYS: [&str; 4] = ["type", "sn", "time", "group"];

/// Common fields read before the variant body.
#[derive(Clone, Debug)]
pub struct ContentHeader {
    pub content_type: ContentType,
    pub sn: u64,
    pub time: Option<Timestamp>,
    pub group: Option<ID>,
    verbatim: Record,
}
