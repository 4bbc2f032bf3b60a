use crate::record::{self, Record};
use crate::{Error, ID};

/// Names of entity and group lifecycle events recorded by history commands.
pub mod history {
    pub const REGISTER: &str = "register";

    pub const FOUND: &str = "found";
    pub const ABDICATE: &str = "abdicate";

    pub const INVITE: &str = "invite";
    pub const EXPEL: &str = "expel";
    pub const JOIN: &str = "join";
    pub const QUIT: &str = "quit";
    pub const QUERY: &str = "query";
    pub const RESET: &str = "reset";

    pub const HIRE: &str = "hire";
    pub const FIRE: &str = "fire";
    pub const RESIGN: &str = "resign";
}

/// A machine-directed instruction. Extra parameters live in the content's
/// extra fields next to `command`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub name: String,
}

impl Command {
    pub(crate) fn parse(record: &mut Record) -> Result<Self, Error> {
        let name = record::require_str(record, "command")?.to_string();
        record.remove("command");
        Ok(Self { name })
    }

    pub(crate) fn write_to(&self, record: &mut Record) {
        record::put(record, "command", Some(self.name.as_str()));
    }
}

/// A lifecycle event log entry. The event time is the content's `time`,
/// which is mandatory for this variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryCommand {
    pub name: String,
    pub member: Option<ID>,
    pub members: Vec<ID>,
}

impl HistoryCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            member: None,
            members: Vec::new(),
        }
    }

    pub(crate) fn parse(record: &mut Record) -> Result<Self, Error> {
        let name = record::require_str(record, "command")?.to_string();
        let member = record::get_id(record, "member")?;
        let members = match record.get("members") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<ID>>(value.clone())
                .map_err(|_| Error::invalid("members", "a list of IDs"))?,
        };
        for key in ["command", "member", "members"] {
            record.remove(key);
        }
        Ok(Self {
            name,
            member,
            members,
        })
    }

    pub(crate) fn write_to(&self, record: &mut Record) {
        record::put(record, "command", Some(self.name.as_str()));
        record::put(record, "member", self.member.as_ref().map(ID::as_str));
        if !self.members.is_empty() {
            let members = self
                .members
                .iter()
                .map(|id| serde_json::Value::from(id.as_str()))
                .collect::<Vec<_>>();
            record::put(record, "members", Some(members));
        }
    }
}
