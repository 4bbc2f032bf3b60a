use crate::record::{self, Record, Timestamp};
use crate::{Error, ID};

/// Routing header shared by every message state.
///
/// `sender` and `receiver` are fixed at construction. `group` is present when
/// the message belongs to a group conversation and `receiver` has been replaced
/// by a concrete member; `type_hint` mirrors the content type so relays can
/// route without decrypting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    sender: ID,
    receiver: ID,
    time: Option<Timestamp>,
    group: Option<ID>,
    type_hint: Option<u32>,
}

impl Envelope {
    /// Creates an envelope, stamping the current time when `time` is omitted.
    pub fn create(sender: ID, receiver: ID, time: Option<Timestamp>) -> Self {
        Self {
            sender,
            receiver,
            time: Some(time.unwrap_or_else(record::now)),
            group: None,
            type_hint: None,
        }
    }

    /// Reads an envelope from a message record.
    ///
    /// A missing `time` stays absent so that replays can tell "unknown" from
    /// "now".
    pub fn parse(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            sender: record::require_id(record, "sender")?,
            receiver: record::require_id(record, "receiver")?,
            time: record::get_time(record, "time")?,
            group: record::get_id(record, "group")?,
            type_hint: record::get_u32(record, "type")?,
        })
    }

    pub fn sender(&self) -> &ID {
        &self.sender
    }

    pub fn receiver(&self) -> &ID {
        &self.receiver
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    pub fn group(&self) -> Option<&ID> {
        self.group.as_ref()
    }

    /// Sets or removes the group. `None` drops the field from the record.
    pub fn set_group(&mut self, group: Option<ID>) {
        self.group = group;
    }

    pub fn type_hint(&self) -> Option<u32> {
        self.type_hint
    }

    pub fn set_type_hint(&mut self, type_hint: Option<u32>) {
        self.type_hint = type_hint;
    }

    /// Copy addressed to `member` on behalf of the group this envelope was
    /// sent to. The group is recovered from `group` or, failing that, from the
    /// current receiver.
    pub(crate) fn for_member(&self, member: &ID) -> Self {
        let group = self.group.clone().unwrap_or_else(|| self.receiver.clone());
        Self {
            sender: self.sender.clone(),
            receiver: member.clone(),
            time: self.time,
            group: Some(group),
            type_hint: self.type_hint,
        }
    }

    /// Writes the envelope fields into `record`.
    pub fn write_to(&self, record: &mut Record) {
        record::put(record, "sender", Some(self.sender.as_str()));
        record::put(record, "receiver", Some(self.receiver.as_str()));
        record::put(record, "time", self.time);
        record::put(record, "group", self.group.as_ref().map(ID::as_str));
        record::put(record, "type", self.type_hint);
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        self.write_to(&mut record);
        record
    }
}
